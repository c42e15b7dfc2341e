//! Composable token recognizers.
//!
//! A [`Term`] recognizes one token at the scanner's current position. The
//! declarations parser is built by combining terms; alternation goes through
//! [`OneOfTerm`], which tries its alternatives strictly left to right and
//! commits to the first match (ordered choice, not longest match — keyword
//! versus identifier precedence depends on this).
//!
//! The default [`Term::test`] performs a full trial match and rolls the
//! scanner back, discarding any diagnostics the trial reported. Keyword and
//! punctuation terms override it with a direct prefix check; both paths must
//! observe the same look-ahead behavior.

use crate::reporting::{format_expected, ParseMessage, ScanMessage};
use crate::source::ByteRange;
use crate::surface::scanner::Scanner;
use crate::symbol::Symbol;

pub const KEYWORDS: &[&str] = &[
    "as", "define", "enum", "exception", "false", "interface", "module", "record", "returns",
    "service", "table", "tag", "throws", "true", "union", "using", "variant", "webservice",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|keyword| word == *keyword)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A token produced by a successful term match.
#[derive(Debug, Copy, Clone)]
pub struct Token {
    pub range: ByteRange,
    /// The token's text. For string literals and annotations this is the
    /// cooked content, not the raw source slice (the range still covers the
    /// raw text).
    pub text: Symbol,
    /// Description of the term that produced this token.
    pub term: &'static str,
    /// False for best-effort tokens produced while recovering from malformed
    /// input.
    pub valid: bool,
}

pub trait Term: Sync {
    /// The name used in "expected X" diagnostics.
    fn expected(&self) -> String;

    /// Try to match at the scanner's current position, consuming on success.
    /// Recovery diagnostics are reported through the scanner.
    fn try_match(&self, scanner: &mut Scanner<'_>) -> Option<Token>;

    /// Look ahead without consuming.
    ///
    /// The default does a full trial match and restores the scanner state
    /// (position and messages) afterwards.
    fn test(&self, scanner: &mut Scanner<'_>) -> bool {
        let saved = scanner.snapshot();
        let matched = self.try_match(scanner).is_some();
        scanner.restore(saved);
        matched
    }
}

/// Identifiers: `[A-Za-z_][A-Za-z0-9_]*`.
pub struct IdentifierTerm {
    /// Also match malformed words (for example digit-led ones), producing an
    /// invalid token so parsing can keep flowing.
    pub allow_invalid: bool,
    /// Report a diagnostic when an invalid word is matched.
    pub report_invalid: bool,
}

impl IdentifierTerm {
    pub const fn new() -> IdentifierTerm {
        IdentifierTerm {
            allow_invalid: false,
            report_invalid: false,
        }
    }

    pub const fn resilient() -> IdentifierTerm {
        IdentifierTerm {
            allow_invalid: true,
            report_invalid: true,
        }
    }
}

impl Term for IdentifierTerm {
    fn expected(&self) -> String {
        "a name".to_owned()
    }

    fn try_match(&self, scanner: &mut Scanner<'_>) -> Option<Token> {
        let start = scanner.position();
        match scanner.peek() {
            Some(c) if is_ident_start(c) => {
                scanner.eat_while(is_ident_continue);
                let range = scanner.range_from(start);
                Some(Token {
                    range,
                    text: Symbol::intern(scanner.remainder_of(range)),
                    term: "name",
                    valid: true,
                })
            }
            Some(c) if self.allow_invalid && is_ident_continue(c) => {
                scanner.eat_while(is_ident_continue);
                let range = scanner.range_from(start);
                let text = Symbol::intern(scanner.remainder_of(range));
                if self.report_invalid {
                    let range = scanner.file_range(range);
                    scanner.report(ParseMessage::InvalidIdentifier { range, text });
                }
                Some(Token {
                    range,
                    text,
                    term: "name",
                    valid: false,
                })
            }
            _ => None,
        }
    }
}

/// An exact keyword, bounded by a non-identifier character.
pub struct KeywordTerm {
    pub word: &'static str,
}

impl KeywordTerm {
    pub const fn new(word: &'static str) -> KeywordTerm {
        KeywordTerm { word }
    }

    fn matches(&self, scanner: &Scanner<'_>) -> bool {
        scanner.test_string(self.word)
            && !scanner.remainder()[self.word.len()..]
                .chars()
                .next()
                .is_some_and(is_ident_continue)
    }
}

impl Term for KeywordTerm {
    fn expected(&self) -> String {
        format!("`{}`", self.word)
    }

    fn try_match(&self, scanner: &mut Scanner<'_>) -> Option<Token> {
        if !self.matches(scanner) {
            return None;
        }
        let start = scanner.position();
        scanner.eat_string(self.word);
        Some(Token {
            range: scanner.range_from(start),
            text: Symbol::intern_static(self.word),
            term: self.word,
            valid: true,
        })
    }

    // Specialized look-ahead: no token construction, no rollback needed.
    fn test(&self, scanner: &mut Scanner<'_>) -> bool {
        self.matches(scanner)
    }
}

/// An exact punctuation string.
pub struct PunctuationTerm {
    pub text: &'static str,
}

impl PunctuationTerm {
    pub const fn new(text: &'static str) -> PunctuationTerm {
        PunctuationTerm { text }
    }
}

impl Term for PunctuationTerm {
    fn expected(&self) -> String {
        format!("`{}`", self.text)
    }

    fn try_match(&self, scanner: &mut Scanner<'_>) -> Option<Token> {
        let start = scanner.position();
        if scanner.eat_string(self.text) {
            Some(Token {
                range: scanner.range_from(start),
                text: Symbol::intern_static(self.text),
                term: self.text,
                valid: true,
            })
        } else {
            None
        }
    }

    // Specialized look-ahead: a plain prefix check.
    fn test(&self, scanner: &mut Scanner<'_>) -> bool {
        scanner.test_string(self.text)
    }
}

/// Decimal or hex numbers, with an optional leading minus and decimal
/// fraction.
pub struct NumberTerm;

impl Term for NumberTerm {
    fn expected(&self) -> String {
        "a number".to_owned()
    }

    fn try_match(&self, scanner: &mut Scanner<'_>) -> Option<Token> {
        let start = scanner.position();
        let saved = scanner.snapshot();
        scanner.eat_char('-');

        let digits = if scanner.eat_string("0x") || scanner.eat_string("0X") {
            scanner.eat_while(|c| c.is_ascii_hexdigit())
        } else {
            let whole = scanner.eat_while(|c| c.is_ascii_digit());
            if whole.start() != whole.end() && scanner.test_char('.') {
                // A fraction needs digits after the point; `1.x` is a
                // projection, not a number.
                let fraction = scanner.snapshot();
                scanner.eat_char('.');
                let frac = scanner.eat_while(|c| c.is_ascii_digit());
                if frac.start() == frac.end() {
                    scanner.restore(fraction);
                }
            }
            whole
        };

        if digits.start() == digits.end() {
            scanner.restore(saved);
            return None;
        }

        // A trailing identifier character makes the whole word a malformed
        // number: consume it so parsing can continue past it.
        let mut valid = true;
        if scanner.peek().is_some_and(is_ident_continue) {
            scanner.eat_while(is_ident_continue);
            valid = false;
        }

        let range = scanner.range_from(start);
        let text = Symbol::intern(scanner.remainder_of(range));
        if !valid {
            let range = scanner.file_range(range);
            scanner.report(ParseMessage::InvalidNumber { range, text });
        }
        Some(Token {
            range,
            text,
            term: "number",
            valid,
        })
    }
}

/// String literals with C-style escapes.
///
/// An unterminated string is reported once and still yields a best-effort
/// token covering the rest of the input, so parsing proceeds to end of file.
pub struct StringLiteralTerm;

impl Term for StringLiteralTerm {
    fn expected(&self) -> String {
        "a string literal".to_owned()
    }

    fn try_match(&self, scanner: &mut Scanner<'_>) -> Option<Token> {
        let start = scanner.position();
        if !scanner.eat_char('"') {
            return None;
        }

        let mut cooked = String::new();
        loop {
            match scanner.bump() {
                Some('"') => {
                    return Some(Token {
                        range: scanner.range_from(start),
                        text: Symbol::intern(&cooked),
                        term: "string literal",
                        valid: true,
                    });
                }
                Some('\\') => {
                    let escape_start = scanner.position() - 1;
                    match scanner.bump() {
                        Some('n') => cooked.push('\n'),
                        Some('r') => cooked.push('\r'),
                        Some('t') => cooked.push('\t'),
                        Some('0') => cooked.push('\0'),
                        Some('\\') => cooked.push('\\'),
                        Some('"') => cooked.push('"'),
                        Some('\'') => cooked.push('\''),
                        Some(other) => {
                            let range = scanner.file_range_from(escape_start);
                            scanner.report(ScanMessage::InvalidEscape {
                                range,
                                found: other,
                            });
                            cooked.push(other);
                        }
                        None => break,
                    }
                }
                Some(c) => cooked.push(c),
                None => break,
            }
        }

        let range = scanner.file_range(ByteRange::new(start, start + 1));
        scanner.report(ScanMessage::UnterminatedString { range });
        Some(Token {
            range: scanner.range_from(start),
            text: Symbol::intern(&cooked),
            term: "string literal",
            valid: false,
        })
    }
}

/// A `# ...` doc comment line. Consecutive lines are merged by the parser.
pub struct LineAnnotationTerm;

impl Term for LineAnnotationTerm {
    fn expected(&self) -> String {
        "an annotation".to_owned()
    }

    fn try_match(&self, scanner: &mut Scanner<'_>) -> Option<Token> {
        let start = scanner.position();
        if !scanner.eat_char('#') {
            return None;
        }
        let content = scanner.eat_while(|c| c != '\n');
        let text = scanner.remainder_of(content);
        let text = text.strip_prefix(' ').unwrap_or(text);
        Some(Token {
            range: scanner.range_from(start),
            text: Symbol::intern(text),
            term: "annotation",
            valid: true,
        })
    }
}

/// A `<# ... #>` doc comment, collapsed to a single trimmed line.
pub struct BlockAnnotationTerm;

impl Term for BlockAnnotationTerm {
    fn expected(&self) -> String {
        "an annotation".to_owned()
    }

    fn try_match(&self, scanner: &mut Scanner<'_>) -> Option<Token> {
        let start = scanner.position();
        if !scanner.eat_string("<#") {
            return None;
        }

        let content_start = scanner.position();
        let mut valid = true;
        loop {
            if scanner.test_string("#>") {
                break;
            }
            if scanner.bump().is_none() {
                let first_open = scanner.file_range(ByteRange::new(start, start + 2));
                scanner.report(ScanMessage::UnterminatedBlockComment { first_open });
                valid = false;
                break;
            }
        }
        let content = scanner.range_from(content_start);
        scanner.eat_string("#>");

        let text = itertools::join(
            scanner
                .remainder_of(content)
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
            " ",
        );
        Some(Token {
            range: scanner.range_from(start),
            text: Symbol::intern(&text),
            term: "annotation",
            valid,
        })
    }
}

/// A URI path segment: unreserved characters and percent escapes.
pub struct UriPartTerm;

impl UriPartTerm {
    fn is_uri_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '%')
    }
}

impl Term for UriPartTerm {
    fn expected(&self) -> String {
        "a path segment".to_owned()
    }

    fn try_match(&self, scanner: &mut Scanner<'_>) -> Option<Token> {
        let range = scanner.eat_while(Self::is_uri_char);
        if range.start() == range.end() {
            return None;
        }
        Some(Token {
            range,
            text: Symbol::intern(scanner.remainder_of(range)),
            term: "path segment",
            valid: true,
        })
    }
}

/// An HTTP reason phrase: letters, digits, spaces and hyphens, up to the
/// terminating punctuation.
pub struct ReasonPhraseTerm;

impl Term for ReasonPhraseTerm {
    fn expected(&self) -> String {
        "a reason phrase".to_owned()
    }

    fn try_match(&self, scanner: &mut Scanner<'_>) -> Option<Token> {
        if !scanner.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        let range =
            scanner.eat_while(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-');
        let text = scanner.remainder_of(range).trim_end();
        Some(Token {
            range: ByteRange::new(range.start(), range.start() + text.len() as u32),
            text: Symbol::intern(text),
            term: "reason phrase",
            valid: true,
        })
    }
}

/// Ordered choice over a fixed list of terms: alternatives are tried left to
/// right and the first match wins.
pub struct OneOfTerm {
    pub alternatives: &'static [&'static dyn Term],
}

impl OneOfTerm {
    pub const fn new(alternatives: &'static [&'static dyn Term]) -> OneOfTerm {
        OneOfTerm { alternatives }
    }
}

impl Term for OneOfTerm {
    fn expected(&self) -> String {
        let names: Vec<String> = self.alternatives.iter().map(|term| term.expected()).collect();
        format_expected(&names).unwrap_or_default()
    }

    fn try_match(&self, scanner: &mut Scanner<'_>) -> Option<Token> {
        self.alternatives
            .iter()
            .find_map(|term| term.try_match(scanner))
    }

    fn test(&self, scanner: &mut Scanner<'_>) -> bool {
        self.alternatives.iter().any(|term| term.test(scanner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileId;

    fn scanner(source: &str) -> Scanner<'_> {
        Scanner::new(FileId::try_from(1).unwrap(), source)
    }

    #[test]
    fn keyword_requires_boundary() {
        let record = KeywordTerm::new("record");
        let mut s = scanner("record Point");
        assert!(record.test(&mut s));
        assert!(record.try_match(&mut s).is_some());

        let mut s = scanner("records");
        assert!(!record.test(&mut s));
        assert!(record.try_match(&mut s).is_none());
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn ordered_choice_is_first_match() {
        // `tag` before the identifier: the keyword wins on `tag`, the
        // identifier wins on `tagged`.
        static TAG: KeywordTerm = KeywordTerm::new("tag");
        static IDENT: IdentifierTerm = IdentifierTerm::new();
        static CHOICE: OneOfTerm = OneOfTerm::new(&[&TAG, &IDENT]);

        let mut s = scanner("tag");
        assert_eq!(CHOICE.try_match(&mut s).unwrap().term, "tag");
        let mut s = scanner("tagged");
        assert_eq!(CHOICE.try_match(&mut s).unwrap().term, "name");
    }

    #[test]
    fn one_of_expected_joins_with_or() {
        static A: KeywordTerm = KeywordTerm::new("enum");
        static B: KeywordTerm = KeywordTerm::new("record");
        static C: KeywordTerm = KeywordTerm::new("variant");
        static CHOICE: OneOfTerm = OneOfTerm::new(&[&A, &B, &C]);
        assert_eq!(CHOICE.expected(), "`enum`, `record` or `variant`");
    }

    #[test]
    fn generic_test_restores_state() {
        let number = NumberTerm;
        let mut s = scanner("123abc");
        // trial match reports an invalid-number diagnostic, which must be
        // rolled back along with the position
        assert!(number.test(&mut s));
        assert_eq!(s.position(), 0);
        assert!(s.messages.is_empty());
    }

    #[test]
    fn numbers() {
        let number = NumberTerm;

        let mut s = scanner("-42;");
        let token = number.try_match(&mut s).unwrap();
        assert_eq!(token.text.resolve(), "-42");
        assert!(token.valid);

        let mut s = scanner("0xFF ");
        assert_eq!(number.try_match(&mut s).unwrap().text.resolve(), "0xFF");

        let mut s = scanner("3.25,");
        assert_eq!(number.try_match(&mut s).unwrap().text.resolve(), "3.25");

        let mut s = scanner("12monkeys");
        let token = number.try_match(&mut s).unwrap();
        assert!(!token.valid);
        assert_eq!(s.messages.len(), 1);
    }

    #[test]
    fn string_escapes() {
        let string = StringLiteralTerm;
        let mut s = scanner(r#""a\tb\"c""#);
        let token = string.try_match(&mut s).unwrap();
        assert_eq!(token.text.resolve(), "a\tb\"c");
        assert!(token.valid);
        assert!(s.messages.is_empty());
    }

    #[test]
    fn unterminated_string_reports_once_and_yields_token() {
        let string = StringLiteralTerm;
        let mut s = scanner(r#""abc"#);
        let token = string.try_match(&mut s).unwrap();
        assert!(!token.valid);
        assert_eq!(token.text.resolve(), "abc");
        assert_eq!(s.messages.len(), 1);
        assert!(s.is_eof());
    }

    #[test]
    fn invalid_identifier_recovery() {
        let resilient = IdentifierTerm::resilient();
        let mut s = scanner("9lives");
        let token = resilient.try_match(&mut s).unwrap();
        assert!(!token.valid);
        assert_eq!(token.text.resolve(), "9lives");
        assert_eq!(s.messages.len(), 1);

        let strict = IdentifierTerm::new();
        let mut s = scanner("9lives");
        assert!(strict.try_match(&mut s).is_none());
    }

    #[test]
    fn annotations() {
        let line = LineAnnotationTerm;
        let mut s = scanner("# the first line\n# the second\n");
        assert_eq!(
            line.try_match(&mut s).unwrap().text.resolve(),
            "the first line"
        );

        let block = BlockAnnotationTerm;
        let mut s = scanner("<# one\n   two\n#> rest");
        let token = block.try_match(&mut s).unwrap();
        assert_eq!(token.text.resolve(), "one two");
        assert!(token.valid);
    }

    #[test]
    fn unterminated_block_annotation() {
        let block = BlockAnnotationTerm;
        let mut s = scanner("<# never closed");
        let token = block.try_match(&mut s).unwrap();
        assert!(!token.valid);
        assert_eq!(s.messages.len(), 1);
        assert!(s.is_eof());
    }

    #[test]
    fn uri_and_reason_terms() {
        let mut s = scanner("users-v2/{id}");
        let token = UriPartTerm.try_match(&mut s).unwrap();
        assert_eq!(token.text.resolve(), "users-v2");
        assert!(s.test_char('/'));

        let mut s = scanner("Not Found;");
        let token = ReasonPhraseTerm.try_match(&mut s).unwrap();
        assert_eq!(token.text.resolve(), "Not Found");
        assert!(s.test_char(';'));
    }
}
