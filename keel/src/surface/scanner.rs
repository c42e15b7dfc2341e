//! The character scanner underlying the term grammar.
//!
//! The scanner deals only in byte offsets; line and column numbers are
//! computed by the files database when diagnostics are rendered. The current
//! position moves monotonically forward, except through snapshots taken and
//! restored by callers performing trial matches.

use std::ops::Range;

use crate::files::FileId;
use crate::reporting::Message;
use crate::source::{BytePos, ByteRange, FileRange};

pub struct Scanner<'source> {
    file_id: FileId,
    source: &'source str,
    pos: BytePos,
    /// Collected diagnostics. Append-only, except when a trial match is
    /// rolled back through [`Scanner::restore`].
    pub messages: Vec<Message>,
}

/// A saved scanner state. Restoring rolls back both the position and any
/// messages reported since the snapshot was taken.
#[derive(Debug, Copy, Clone)]
pub struct Snapshot {
    pos: BytePos,
    messages: usize,
}

impl<'source> Scanner<'source> {
    pub fn new(file_id: FileId, source: &'source str) -> Scanner<'source> {
        assert!(
            source.len() <= u32::MAX as usize,
            "`source` must be less than 4GiB in length"
        );
        Scanner {
            file_id,
            source,
            pos: 0,
            messages: Vec::new(),
        }
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn position(&self) -> BytePos {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos as usize >= self.source.len()
    }

    pub fn remainder(&self) -> &'source str {
        &self.source[self.pos as usize..]
    }

    /// The source text covered by an already-scanned range.
    pub fn remainder_of(&self, range: ByteRange) -> &'source str {
        &self.source[Range::<usize>::from(range)]
    }

    pub fn peek(&self) -> Option<char> {
        self.remainder().chars().next()
    }

    /// Test whether the next character is `expected`, without consuming.
    pub fn test_char(&self, expected: char) -> bool {
        self.peek() == Some(expected)
    }

    /// Test whether the input at the current position starts with `expected`,
    /// without consuming.
    pub fn test_string(&self, expected: &str) -> bool {
        self.remainder().starts_with(expected)
    }

    /// Consume one character, returning it.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8() as BytePos;
        Some(c)
    }

    /// Consume `expected` if it is next, returning whether it was.
    pub fn eat_char(&mut self, expected: char) -> bool {
        if self.test_char(expected) {
            self.pos += expected.len_utf8() as BytePos;
            true
        } else {
            false
        }
    }

    /// Consume `expected` if the input starts with it.
    pub fn eat_string(&mut self, expected: &str) -> bool {
        if self.test_string(expected) {
            self.pos += expected.len() as BytePos;
            true
        } else {
            false
        }
    }

    /// Consume characters while `predicate` holds, returning the consumed
    /// range.
    pub fn eat_while(&mut self, predicate: impl Fn(char) -> bool) -> ByteRange {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.pos += c.len_utf8() as BytePos;
        }
        ByteRange::new(start, self.pos)
    }

    pub fn skip_whitespace(&mut self) {
        self.eat_while(char::is_whitespace);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pos: self.pos,
            messages: self.messages.len(),
        }
    }

    /// Roll back to a snapshot, discarding any messages reported since.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.pos = snapshot.pos;
        self.messages.truncate(snapshot.messages);
    }

    pub fn range_from(&self, start: BytePos) -> ByteRange {
        ByteRange::new(start, self.pos)
    }

    pub fn file_range(&self, range: ByteRange) -> FileRange {
        FileRange::new(self.file_id, range)
    }

    pub fn file_range_from(&self, start: BytePos) -> FileRange {
        FileRange::new(self.file_id, self.range_from(start))
    }

    /// A zero-width range at the end of input.
    pub fn eof_range(&self) -> FileRange {
        let end = self.source.len() as BytePos;
        FileRange::new(self.file_id, ByteRange::new(end, end))
    }

    pub fn report(&mut self, message: impl Into<Message>) {
        self.messages.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::ScanMessage;

    fn scanner(source: &str) -> Scanner<'_> {
        Scanner::new(FileId::try_from(1).unwrap(), source)
    }

    #[test]
    fn test_does_not_consume() {
        let s = scanner("record Point");
        assert!(s.test_string("record"));
        assert!(s.test_char('r'));
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn eat_advances_monotonically() {
        let mut s = scanner("a  b");
        assert!(s.eat_char('a'));
        s.skip_whitespace();
        assert_eq!(s.position(), 3);
        assert!(s.eat_char('b'));
        assert!(s.is_eof());
    }

    #[test]
    fn restore_rolls_back_position_and_messages() {
        let mut s = scanner("xyz");
        let saved = s.snapshot();
        s.bump();
        s.report(ScanMessage::UnterminatedString {
            range: s.file_range_from(0),
        });
        s.restore(saved);
        assert_eq!(s.position(), 0);
        assert!(s.messages.is_empty());
    }
}
