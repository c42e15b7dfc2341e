//! Recursive-descent parser for schema declarations.
//!
//! The parser consumes [`Term`]s and builds the untyped tree in
//! [`crate::surface`]. A failed required term reports an "expected X"
//! diagnostic and resynchronizes at the next `;` or `}`, so every syntax
//! error in a file is collected in one pass.

use crate::attr::{AttrInstance, AttrSelector, AttributeValue};
use crate::files::FileId;
use crate::reporting::{Message, ParseMessage};
use crate::source::{BytePos, FileRange};
use crate::surface::scanner::Scanner;
use crate::surface::term::{
    is_keyword, BlockAnnotationTerm, IdentifierTerm, KeywordTerm, LineAnnotationTerm, NumberTerm,
    OneOfTerm, PunctuationTerm, ReasonPhraseTerm, StringLiteralTerm, Term, Token, UriPartTerm,
};
use crate::surface::{
    Annotation, DefineForm, Direction, EnumField, EnumForm, Field, Form, Function, Module, Name,
    Param, Resource, Response, ServiceForm, StructForm, StructKind, TableForm, TypeExpr,
    UnionClause, UnionForm, UriSegment, ValueExpr, WebServiceForm,
};
use crate::symbol::Symbol;

// literal and trivia terms

static IDENT: IdentifierTerm = IdentifierTerm::new();
static IDENT_RECOVER: IdentifierTerm = IdentifierTerm::resilient();
static NUMBER: NumberTerm = NumberTerm;
static STRING: StringLiteralTerm = StringLiteralTerm;
static LINE_ANNOTATION: LineAnnotationTerm = LineAnnotationTerm;
static BLOCK_ANNOTATION: BlockAnnotationTerm = BlockAnnotationTerm;
static URI_PART: UriPartTerm = UriPartTerm;
static REASON_PHRASE: ReasonPhraseTerm = ReasonPhraseTerm;

// keywords

static KW_MODULE: KeywordTerm = KeywordTerm::new("module");
static KW_USING: KeywordTerm = KeywordTerm::new("using");
static KW_RECORD: KeywordTerm = KeywordTerm::new("record");
static KW_EXCEPTION: KeywordTerm = KeywordTerm::new("exception");
static KW_VARIANT: KeywordTerm = KeywordTerm::new("variant");
static KW_INTERFACE: KeywordTerm = KeywordTerm::new("interface");
static KW_ENUM: KeywordTerm = KeywordTerm::new("enum");
static KW_DEFINE: KeywordTerm = KeywordTerm::new("define");
static KW_UNION: KeywordTerm = KeywordTerm::new("union");
static KW_TABLE: KeywordTerm = KeywordTerm::new("table");
static KW_SERVICE: KeywordTerm = KeywordTerm::new("service");
static KW_WEBSERVICE: KeywordTerm = KeywordTerm::new("webservice");
static KW_TAG: KeywordTerm = KeywordTerm::new("tag");
static KW_TRUE: KeywordTerm = KeywordTerm::new("true");
static KW_FALSE: KeywordTerm = KeywordTerm::new("false");
static KW_RETURNS: KeywordTerm = KeywordTerm::new("returns");
static KW_THROWS: KeywordTerm = KeywordTerm::new("throws");
static KW_AS: KeywordTerm = KeywordTerm::new("as");
static DIR_C2S: KeywordTerm = KeywordTerm::new("c->s");
static DIR_S2C: KeywordTerm = KeywordTerm::new("s->c");

// punctuation

static LBRACE: PunctuationTerm = PunctuationTerm::new("{");
static RBRACE: PunctuationTerm = PunctuationTerm::new("}");
static LBRACKET: PunctuationTerm = PunctuationTerm::new("[");
static RBRACKET: PunctuationTerm = PunctuationTerm::new("]");
static LPAREN: PunctuationTerm = PunctuationTerm::new("(");
static RPAREN: PunctuationTerm = PunctuationTerm::new(")");
static LANGLE: PunctuationTerm = PunctuationTerm::new("<");
static RANGLE: PunctuationTerm = PunctuationTerm::new(">");
static SEMI: PunctuationTerm = PunctuationTerm::new(";");
static COMMA: PunctuationTerm = PunctuationTerm::new(",");
static COLON: PunctuationTerm = PunctuationTerm::new(":");
static EQUALS: PunctuationTerm = PunctuationTerm::new("=");
static STAR: PunctuationTerm = PunctuationTerm::new("*");
static DOT: PunctuationTerm = PunctuationTerm::new(".");
static QUESTION: PunctuationTerm = PunctuationTerm::new("?");
static FAT_ARROW: PunctuationTerm = PunctuationTerm::new("=>");
static ARROW: PunctuationTerm = PunctuationTerm::new("->");
static SLASH: PunctuationTerm = PunctuationTerm::new("/");

// alternations

/// First keyword of any declaration inside a module body, for "expected"
/// messages.
static DECL_KEYWORD: OneOfTerm = OneOfTerm::new(&[
    &KW_USING,
    &KW_RECORD,
    &KW_EXCEPTION,
    &KW_VARIANT,
    &KW_INTERFACE,
    &KW_ENUM,
    &KW_DEFINE,
    &KW_UNION,
    &KW_TABLE,
    &KW_SERVICE,
    &KW_WEBSERVICE,
]);

static DIRECTION: OneOfTerm = OneOfTerm::new(&[&DIR_C2S, &DIR_S2C]);

pub fn parse_module(file_id: FileId, source: &str) -> (Module, Vec<Message>) {
    let mut parser = Parser {
        scanner: Scanner::new(file_id, source),
        pending_annotation: None,
    };
    let module = parser.module();

    parser.trivia();
    if !parser.scanner.is_eof() {
        let (range, found) = parser.found();
        parser.scanner.report(ParseMessage::Expected {
            range,
            expected: "end of file".to_owned(),
            found,
        });
    }

    (module, parser.scanner.messages)
}

struct Parser<'source> {
    scanner: Scanner<'source>,
    pending_annotation: Option<Annotation>,
}

impl<'source> Parser<'source> {
    // ------------------------------------------------------------------ trivia

    /// Skip whitespace and harvest doc comments into the pending annotation.
    /// Consecutive line annotations merge into one.
    fn trivia(&mut self) {
        loop {
            self.scanner.skip_whitespace();
            if let Some(token) = BLOCK_ANNOTATION.try_match(&mut self.scanner) {
                self.push_annotation(token.text);
            } else if let Some(token) = LINE_ANNOTATION.try_match(&mut self.scanner) {
                self.push_annotation(token.text);
            } else {
                break;
            }
        }
    }

    fn push_annotation(&mut self, text: Symbol) {
        self.pending_annotation = Some(match self.pending_annotation {
            Some(pending) => Symbol::intern(format!("{pending}\n{text}")),
            None => text,
        });
    }

    fn take_annotation(&mut self) -> Option<Annotation> {
        self.pending_annotation.take()
    }

    // ----------------------------------------------------------------- helpers

    fn test(&mut self, term: &dyn Term) -> bool {
        self.trivia();
        term.test(&mut self.scanner)
    }

    fn accept(&mut self, term: &dyn Term) -> Option<Token> {
        self.trivia();
        term.try_match(&mut self.scanner)
    }

    /// Match a required term, reporting "expected X" on failure.
    fn expect(&mut self, term: &dyn Term) -> Option<Token> {
        if let Some(token) = self.accept(term) {
            return Some(token);
        }
        let expected = term.expected();
        if self.scanner.is_eof() {
            let range = self.scanner.eof_range();
            self.scanner
                .report(ParseMessage::UnexpectedEof { range, expected });
        } else {
            let (range, found) = self.found();
            self.scanner.report(ParseMessage::Expected {
                range,
                expected,
                found,
            });
        }
        None
    }

    /// The text at the current position, for "found `…`" labels.
    fn found(&mut self) -> (FileRange, Option<String>) {
        let start = self.scanner.position();
        let saved = self.scanner.snapshot();
        let word = self
            .scanner
            .eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let found = if word.start() == word.end() {
            self.scanner.bump().map(|c| c.to_string())
        } else {
            Some(self.scanner.remainder_of(word).to_owned())
        };
        let range = self.scanner.file_range_from(start);
        self.scanner.restore(saved);
        (range, found)
    }

    /// Resynchronize after a syntax error: skip forward until just past the
    /// next `;`, or to a `}` closing the current body, or to end of file.
    fn recover(&mut self) {
        let mut depth = 0usize;
        loop {
            self.scanner.skip_whitespace();
            match self.scanner.peek() {
                None => return,
                Some(';') if depth == 0 => {
                    self.scanner.bump();
                    return;
                }
                Some('{') => {
                    depth += 1;
                    self.scanner.bump();
                }
                Some('}') => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.scanner.bump();
                }
                Some(_) => {
                    self.scanner.bump();
                }
            }
        }
    }

    fn name_from(&self, token: Token) -> Name {
        Name {
            range: self.scanner.file_range(token.range),
            symbol: token.text,
        }
    }

    /// A placeholder name used to keep building the tree after an error.
    fn missing_name(&self) -> Name {
        Name {
            range: self.scanner.file_range_from(self.scanner.position()),
            symbol: Symbol::intern_static("<error>"),
        }
    }

    fn expect_name(&mut self) -> Name {
        match self.expect(&IDENT_RECOVER) {
            Some(token) => {
                // A keyword as a declared name could never be re-parsed.
                if token.valid && is_keyword(token.text.resolve()) {
                    self.scanner.report(ParseMessage::InvalidIdentifier {
                        range: self.scanner.file_range(token.range),
                        text: token.text,
                    });
                }
                self.name_from(token)
            }
            None => self.missing_name(),
        }
    }

    // ------------------------------------------------------------------ module

    fn module(&mut self) -> Module {
        self.trivia();
        let annotation = self.take_annotation();
        let attributes = self.attributes();
        let start = self.scanner.position();

        self.expect(&KW_MODULE);
        let name = self.expect_name();
        let mut usings = Vec::new();
        let mut forms = Vec::new();

        if self.expect(&LBRACE).is_some() {
            loop {
                self.trivia();
                if self.accept(&RBRACE).is_some() {
                    break;
                }
                if self.scanner.is_eof() {
                    let range = self.scanner.eof_range();
                    self.scanner.report(ParseMessage::UnexpectedEof {
                        range,
                        expected: RBRACE.expected(),
                    });
                    break;
                }
                if self.accept(&KW_USING).is_some() {
                    let using = self.expect_name();
                    usings.push(using);
                    if self.expect(&SEMI).is_none() {
                        self.recover();
                    }
                    continue;
                }
                match self.form() {
                    Some(form) => forms.push(form),
                    None => self.recover(),
                }
            }
        }

        Module {
            range: self.scanner.file_range_from(start),
            name,
            annotation,
            attributes,
            usings,
            forms,
        }
    }

    // -------------------------------------------------------------- attributes

    /// Zero or more `[target name=value ...]` groups.
    fn attributes(&mut self) -> Vec<AttrInstance> {
        let mut instances = Vec::new();
        while self.accept(&LBRACKET).is_some() {

            let selector = if self.accept(&STAR).is_some() {
                AttrSelector::Any
            } else {
                match self.accept(&IDENT) {
                    Some(token) => AttrSelector::Target(token.text),
                    None => {
                        let (range, found) = self.found();
                        self.scanner.report(ParseMessage::Expected {
                            range,
                            expected: "an attribute target or `*`".to_owned(),
                            found,
                        });
                        self.skip_to_bracket_close();
                        continue;
                    }
                }
            };

            loop {
                if self.accept(&RBRACKET).is_some() {
                    break;
                }
                let name = match self.accept(&IDENT) {
                    Some(token) => token,
                    None => {
                        let (range, found) = self.found();
                        self.scanner.report(ParseMessage::Expected {
                            range,
                            expected: "an attribute name or `]`".to_owned(),
                            found,
                        });
                        self.skip_to_bracket_close();
                        break;
                    }
                };
                let name_start = name.range.start();
                let name = self.dotted_name(name.text);

                let value = if self.accept(&EQUALS).is_some() {
                    self.attribute_value()
                } else {
                    // A bare key means true.
                    AttributeValue::Bool(true)
                };

                instances.push(AttrInstance {
                    range: self.scanner.file_range_from(name_start),
                    selector,
                    name,
                    value,
                });
            }
        }
        instances
    }

    /// Attribute keys may be dotted, e.g. `json.enabled`. No trivia is
    /// allowed around the dots.
    fn dotted_name(&mut self, first: Symbol) -> Symbol {
        let mut name = first.resolve().to_owned();
        while self.scanner.test_char('.') {
            let saved = self.scanner.snapshot();
            self.scanner.eat_char('.');
            match IDENT.try_match(&mut self.scanner) {
                Some(part) => {
                    name.push('.');
                    name.push_str(part.text.resolve());
                }
                None => {
                    self.scanner.restore(saved);
                    break;
                }
            }
        }
        Symbol::intern(name)
    }

    fn attribute_value(&mut self) -> AttributeValue {
        self.trivia();
        if self.accept(&KW_TRUE).is_some() {
            return AttributeValue::Bool(true);
        }
        if self.accept(&KW_FALSE).is_some() {
            return AttributeValue::Bool(false);
        }
        if let Some(token) = self.accept(&NUMBER) {
            return match parse_int(token.text.resolve()) {
                Some(value) => AttributeValue::Int(value),
                None => {
                    if token.valid {
                        let range = self.scanner.file_range(token.range);
                        self.scanner.report(ParseMessage::InvalidNumber {
                            range,
                            text: token.text,
                        });
                    }
                    AttributeValue::Int(0)
                }
            };
        }
        if let Some(token) = self.accept(&STRING) {
            return AttributeValue::String(token.text);
        }
        if self.test(&LBRACE) || self.scanner.test_char('[') {
            return self.json_value();
        }
        if let Some(token) = self.accept(&IDENT) {
            return AttributeValue::Ident(token.text);
        }

        let (range, found) = self.found();
        self.scanner.report(ParseMessage::Expected {
            range,
            expected: "an attribute value".to_owned(),
            found,
        });
        AttributeValue::Bool(true)
    }

    /// A raw json value after `=`: the balanced `{…}` or `[…]` slice is
    /// parsed eagerly with serde.
    fn json_value(&mut self) -> AttributeValue {
        let start = self.scanner.position();
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        while let Some(c) = self.scanner.bump() {
            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '{' | '[' => depth += 1,
                '}' | ']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                '"' => in_string = true,
                _ => {}
            }
        }

        let range = self.scanner.range_from(start);
        let text = self.scanner.remainder_of(range);
        match serde_json::from_str(text) {
            Ok(value) => AttributeValue::Json(value),
            Err(_) => {
                let range = self.scanner.file_range(range);
                self.scanner.report(ParseMessage::Expected {
                    range,
                    expected: "a json value".to_owned(),
                    found: None,
                });
                AttributeValue::Json(serde_json::Value::Null)
            }
        }
    }

    fn skip_to_bracket_close(&mut self) {
        while let Some(c) = self.scanner.peek() {
            self.scanner.bump();
            if c == ']' {
                break;
            }
        }
    }

    // ------------------------------------------------------------------- forms

    fn form(&mut self) -> Option<Form> {
        self.trivia();
        let annotation = self.take_annotation();
        let attributes = self.attributes();
        self.trivia();
        let start = self.scanner.position();

        if self.accept(&KW_ENUM).is_some() {
            return Some(Form::Enum(self.enum_form(start, annotation, attributes)));
        }
        if self.accept(&KW_RECORD).is_some() {
            return Some(Form::Struct(self.struct_form(
                start,
                StructKind::Record,
                annotation,
                attributes,
            )));
        }
        if self.accept(&KW_EXCEPTION).is_some() {
            return Some(Form::Struct(self.struct_form(
                start,
                StructKind::Exception,
                annotation,
                attributes,
            )));
        }
        if self.accept(&KW_VARIANT).is_some() {
            return Some(Form::Struct(self.struct_form(
                start,
                StructKind::Variant,
                annotation,
                attributes,
            )));
        }
        if self.accept(&KW_INTERFACE).is_some() {
            return Some(Form::Struct(self.struct_form(
                start,
                StructKind::Interface,
                annotation,
                attributes,
            )));
        }
        if self.accept(&KW_UNION).is_some() {
            return Some(Form::Union(self.union_form(start, annotation, attributes)));
        }
        if self.accept(&KW_DEFINE).is_some() {
            return Some(Form::Define(self.define_form(start, annotation, attributes)));
        }
        if self.accept(&KW_TABLE).is_some() {
            return Some(Form::Table(self.table_form(start, annotation, attributes)));
        }
        if self.accept(&KW_SERVICE).is_some() {
            return Some(Form::Service(self.service_form(start, annotation, attributes)));
        }
        if self.accept(&KW_WEBSERVICE).is_some() {
            return Some(Form::WebService(self.webservice_form(
                start,
                annotation,
                attributes,
            )));
        }

        let (range, found) = self.found();
        self.scanner.report(ParseMessage::Expected {
            range,
            expected: DECL_KEYWORD.expected(),
            found,
        });
        None
    }

    fn enum_form(
        &mut self,
        start: BytePos,
        annotation: Option<Annotation>,
        attributes: Vec<AttrInstance>,
    ) -> EnumForm {
        let name = self.expect_name();
        let base = if self.accept(&COLON).is_some() {
            self.type_expr()
        } else {
            None
        };

        let mut fields = Vec::new();
        if self.expect(&LBRACE).is_some() {
            loop {
                self.trivia();
                if self.accept(&RBRACE).is_some() || self.scanner.is_eof() {
                    break;
                }
                let annotation = self.take_annotation();
                let attributes = self.attributes();
                let field_name = self.expect_name();
                let value = if self.accept(&EQUALS).is_some() {
                    self.expect(&NUMBER).and_then(|token| {
                        let range = self.scanner.file_range(token.range);
                        match parse_int(token.text.resolve()) {
                            Some(value) => Some((range, value)),
                            None => {
                                if token.valid {
                                    self.scanner.report(ParseMessage::InvalidNumber {
                                        range,
                                        text: token.text,
                                    });
                                }
                                None
                            }
                        }
                    })
                } else {
                    None
                };
                fields.push(EnumField {
                    annotation,
                    attributes,
                    name: field_name,
                    value,
                });
                if self.expect(&SEMI).is_none() {
                    self.recover();
                }
            }
        }

        EnumForm {
            range: self.scanner.file_range_from(start),
            annotation,
            attributes,
            name,
            base,
            fields,
        }
    }

    fn struct_form(
        &mut self,
        start: BytePos,
        kind: StructKind,
        annotation: Option<Annotation>,
        attributes: Vec<AttrInstance>,
    ) -> StructForm {
        let mut name = self.expect_name();
        let mut parent = None;
        if self.accept(&DOT).is_some() {
            parent = Some(name);
            name = self.expect_name();
        }

        let generics = self.generic_params();
        let mut inherits = Vec::new();
        if self.accept(&COLON).is_some() {
            loop {
                if let Some(ty) = self.type_expr() {
                    inherits.push(ty);
                }
                if self.accept(&COMMA).is_none() {
                    break;
                }
            }
        }

        let fields = self.field_body();

        StructForm {
            range: self.scanner.file_range_from(start),
            annotation,
            attributes,
            kind,
            name,
            parent,
            generics,
            inherits,
            fields,
        }
    }

    fn field_body(&mut self) -> Vec<Field> {
        let mut fields = Vec::new();
        if self.expect(&LBRACE).is_none() {
            return fields;
        }
        loop {
            self.trivia();
            if self.accept(&RBRACE).is_some() {
                break;
            }
            if self.scanner.is_eof() {
                let range = self.scanner.eof_range();
                self.scanner.report(ParseMessage::UnexpectedEof {
                    range,
                    expected: RBRACE.expected(),
                });
                break;
            }
            match self.field() {
                Some(field) => fields.push(field),
                None => self.recover(),
            }
        }
        fields
    }

    fn field(&mut self) -> Option<Field> {
        let annotation = self.take_annotation();
        let attributes = self.attributes();
        self.trivia();
        let is_tag = self.accept(&KW_TAG).is_some();

        let ty = self.type_expr()?;
        let name = self.expect_name();
        let default = if self.accept(&EQUALS).is_some() {
            self.value_expr()
        } else {
            None
        };
        if self.expect(&SEMI).is_none() {
            self.recover();
        }

        Some(Field {
            annotation,
            attributes,
            is_tag,
            ty,
            name,
            default,
        })
    }

    fn union_form(
        &mut self,
        start: BytePos,
        annotation: Option<Annotation>,
        attributes: Vec<AttrInstance>,
    ) -> UnionForm {
        let name = self.expect_name();
        let generics = self.generic_params();

        let mut clauses = Vec::new();
        if self.expect(&LBRACE).is_some() {
            loop {
                self.trivia();
                if self.accept(&RBRACE).is_some() || self.scanner.is_eof() {
                    break;
                }
                let annotation = self.take_annotation();
                let clause_name = self.expect_name();
                let ty = if self.accept(&COLON).is_some() {
                    self.type_expr()
                } else {
                    None
                };
                clauses.push(UnionClause {
                    annotation,
                    name: clause_name,
                    ty,
                });
                if self.expect(&SEMI).is_none() {
                    self.recover();
                }
            }
        }

        UnionForm {
            range: self.scanner.file_range_from(start),
            annotation,
            attributes,
            name,
            generics,
            clauses,
        }
    }

    fn define_form(
        &mut self,
        start: BytePos,
        annotation: Option<Annotation>,
        attributes: Vec<AttrInstance>,
    ) -> DefineForm {
        let name = self.expect_name();
        let generics = self.generic_params();
        let ty = self.type_expr().unwrap_or_else(|| TypeExpr::Error {
            range: self.scanner.file_range_from(self.scanner.position()),
        });
        if self.expect(&SEMI).is_none() {
            self.recover();
        }

        DefineForm {
            range: self.scanner.file_range_from(start),
            annotation,
            attributes,
            name,
            generics,
            ty,
        }
    }

    fn table_form(
        &mut self,
        start: BytePos,
        annotation: Option<Annotation>,
        attributes: Vec<AttrInstance>,
    ) -> TableForm {
        let name = self.expect_name();
        let fields = self.field_body();

        TableForm {
            range: self.scanner.file_range_from(start),
            annotation,
            attributes,
            name,
            fields,
        }
    }

    fn service_form(
        &mut self,
        start: BytePos,
        annotation: Option<Annotation>,
        attributes: Vec<AttrInstance>,
    ) -> ServiceForm {
        let name = self.expect_name();
        let mut functions = Vec::new();

        if self.expect(&LBRACE).is_some() {
            loop {
                self.trivia();
                if self.accept(&RBRACE).is_some() || self.scanner.is_eof() {
                    break;
                }
                match self.function() {
                    Some(function) => functions.push(function),
                    None => self.recover(),
                }
            }
        }

        ServiceForm {
            range: self.scanner.file_range_from(start),
            annotation,
            attributes,
            name,
            functions,
        }
    }

    fn function(&mut self) -> Option<Function> {
        let annotation = self.take_annotation();
        let direction = match self.expect(&DIRECTION)? {
            token if token.term == DIR_C2S.word => Direction::ClientToServer,
            _ => Direction::ServerToClient,
        };
        let name = self.expect_name();

        let mut args = Vec::new();
        if self.expect(&LPAREN).is_some() {
            args = self.params();
        }

        let mut returns = Vec::new();
        if self.accept(&KW_RETURNS).is_some() && self.expect(&LPAREN).is_some() {
            returns = self.params();
        }

        let mut throws = Vec::new();
        if self.accept(&KW_THROWS).is_some() {
            loop {
                if let Some(ty) = self.type_expr() {
                    throws.push(ty);
                }
                if self.accept(&COMMA).is_none() {
                    break;
                }
            }
        }

        if self.expect(&SEMI).is_none() {
            self.recover();
        }

        Some(Function {
            annotation,
            direction,
            name,
            args,
            returns,
            throws,
        })
    }

    /// Comma-separated `type name` pairs up to the closing paren.
    fn params(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        if self.accept(&RPAREN).is_some() {
            return params;
        }
        loop {
            match self.type_expr() {
                Some(ty) => {
                    let name = self.expect_name();
                    params.push(Param { ty, name });
                }
                None => {
                    self.recover();
                    break;
                }
            }
            if self.accept(&COMMA).is_some() {
                continue;
            }
            self.expect(&RPAREN);
            break;
        }
        params
    }

    fn webservice_form(
        &mut self,
        start: BytePos,
        annotation: Option<Annotation>,
        attributes: Vec<AttrInstance>,
    ) -> WebServiceForm {
        let name = self.expect_name();
        let mut resources = Vec::new();

        if self.expect(&LBRACE).is_some() {
            loop {
                self.trivia();
                if self.accept(&RBRACE).is_some() || self.scanner.is_eof() {
                    break;
                }
                match self.resource() {
                    Some(resource) => resources.push(resource),
                    None => self.recover(),
                }
            }
        }

        WebServiceForm {
            range: self.scanner.file_range_from(start),
            annotation,
            attributes,
            name,
            resources,
        }
    }

    fn resource(&mut self) -> Option<Resource> {
        let annotation = self.take_annotation();
        let attributes = self.attributes();
        let name = self.expect_name();

        self.expect(&FAT_ARROW)?;
        let verb = self.expect_name();
        let path = self.uri_path();

        let content_as = if self.accept(&KW_AS).is_some() {
            self.expect(&IDENT).map(|token| self.name_from(token))
        } else {
            None
        };

        let response = if self.accept(&ARROW).is_some() {
            self.response()
        } else {
            None
        };

        if self.expect(&SEMI).is_none() {
            self.recover();
        }

        Some(Resource {
            annotation,
            attributes,
            name,
            verb,
            path,
            content_as,
            response,
        })
    }

    /// A `/`-led URI template. No trivia is allowed inside the path.
    fn uri_path(&mut self) -> Vec<UriSegment> {
        let mut segments = Vec::new();
        if self.expect(&SLASH).is_none() {
            return segments;
        }
        loop {
            if self.scanner.eat_char('{') {
                let param_start = self.scanner.position();
                let name = match IDENT.try_match(&mut self.scanner) {
                    Some(token) => self.name_from(token),
                    None => {
                        let (range, found) = self.found();
                        self.scanner.report(ParseMessage::Expected {
                            range,
                            expected: "a path parameter name".to_owned(),
                            found,
                        });
                        Name {
                            range: self.scanner.file_range_from(param_start),
                            symbol: Symbol::intern_static("<error>"),
                        }
                    }
                };
                let ty = if self.scanner.eat_char(':') {
                    self.type_expr().unwrap_or_else(|| TypeExpr::Error {
                        range: self.scanner.file_range_from(self.scanner.position()),
                    })
                } else {
                    TypeExpr::Name {
                        range: name.range,
                        name: Symbol::intern_static("string"),
                        args: Vec::new(),
                    }
                };
                if !self.scanner.eat_char('}') {
                    let (range, found) = self.found();
                    self.scanner.report(ParseMessage::Expected {
                        range,
                        expected: "`}`".to_owned(),
                        found,
                    });
                }
                segments.push(UriSegment::Param { name, ty });
            } else if let Some(token) = URI_PART.try_match(&mut self.scanner) {
                segments.push(UriSegment::Literal(
                    self.scanner.file_range(token.range),
                    token.text,
                ));
            }
            if !self.scanner.eat_char('/') {
                break;
            }
        }
        segments
    }

    fn response(&mut self) -> Option<Response> {
        if self.test(&NUMBER) {
            let token = self.accept(&NUMBER)?;
            let range = self.scanner.file_range(token.range);
            let code = parse_int(token.text.resolve()).unwrap_or(0);
            self.scanner.skip_whitespace();
            let phrase = REASON_PHRASE
                .try_match(&mut self.scanner)
                .map(|token| token.text)
                .unwrap_or_else(|| Symbol::intern_static(""));
            return Some(Response::Status {
                range,
                code,
                phrase,
            });
        }
        self.type_expr().map(Response::Type)
    }

    // ------------------------------------------------------------------- types

    fn generic_params(&mut self) -> Vec<Name> {
        let mut params = Vec::new();
        if self.accept(&LANGLE).is_none() {
            return params;
        }
        loop {
            params.push(self.expect_name());
            if self.accept(&COMMA).is_some() {
                continue;
            }
            self.expect(&RANGLE);
            break;
        }
        params
    }

    fn type_expr(&mut self) -> Option<TypeExpr> {
        self.trivia();
        let start = self.scanner.position();

        if self.accept(&QUESTION).is_some() {
            let inner = self.type_expr()?;
            return Some(TypeExpr::Optional {
                range: self.scanner.file_range_from(start),
                inner: Box::new(inner),
            });
        }

        let name = self.expect(&IDENT)?;
        let mut args = Vec::new();
        if self.accept(&LANGLE).is_some() {
            loop {
                match self.type_expr() {
                    Some(arg) => args.push(arg),
                    None => break,
                }
                if self.accept(&COMMA).is_some() {
                    continue;
                }
                self.expect(&RANGLE);
                break;
            }
        }

        Some(TypeExpr::Name {
            range: self.scanner.file_range_from(start),
            name: name.text,
            args,
        })
    }

    // ------------------------------------------------------------------ values

    fn value_expr(&mut self) -> Option<ValueExpr> {
        self.trivia();
        let start = self.scanner.position();

        if self.accept(&KW_TRUE).is_some() {
            return Some(ValueExpr::Bool(self.scanner.file_range_from(start), true));
        }
        if self.accept(&KW_FALSE).is_some() {
            return Some(ValueExpr::Bool(self.scanner.file_range_from(start), false));
        }
        if let Some(token) = self.accept(&NUMBER) {
            let range = self.scanner.file_range(token.range);
            let text = token.text.resolve();
            return Some(if text.contains('.') {
                match text.parse::<f64>() {
                    Ok(value) => ValueExpr::Float(range, value),
                    Err(_) => {
                        if token.valid {
                            self.scanner
                                .report(ParseMessage::InvalidNumber { range, text: token.text });
                        }
                        ValueExpr::Float(range, 0.0)
                    }
                }
            } else {
                match parse_int(text) {
                    Some(value) => ValueExpr::Int(range, value),
                    None => {
                        if token.valid {
                            self.scanner
                                .report(ParseMessage::InvalidNumber { range, text: token.text });
                        }
                        ValueExpr::Int(range, 0)
                    }
                }
            });
        }
        if let Some(token) = self.accept(&STRING) {
            return Some(ValueExpr::String(
                self.scanner.file_range(token.range),
                token.text,
            ));
        }
        if let Some(token) = self.accept(&IDENT) {
            let mut second = None;
            if self.scanner.eat_char('.') {
                second = IDENT.try_match(&mut self.scanner).map(|token| token.text);
            }
            return Some(ValueExpr::Ref(
                self.scanner.file_range_from(start),
                token.text,
                second,
            ));
        }
        if self.accept(&LBRACKET).is_some() {
            let mut items = Vec::new();
            if self.accept(&RBRACKET).is_none() {
                loop {
                    match self.value_expr() {
                        Some(item) => items.push(item),
                        None => break,
                    }
                    if self.accept(&COMMA).is_some() {
                        continue;
                    }
                    self.expect(&RBRACKET);
                    break;
                }
            }
            return Some(ValueExpr::List(self.scanner.file_range_from(start), items));
        }
        if self.accept(&LBRACE).is_some() {
            if self.accept(&RBRACE).is_some() {
                return Some(ValueExpr::EmptyObject(self.scanner.file_range_from(start)));
            }
            let mut pairs = Vec::new();
            loop {
                let key = self.value_expr()?;
                self.expect(&COLON)?;
                let value = self.value_expr()?;
                pairs.push((key, value));
                if self.accept(&COMMA).is_some() {
                    continue;
                }
                self.expect(&RBRACE);
                break;
            }
            return Some(ValueExpr::Dict(self.scanner.file_range_from(start), pairs));
        }

        let (range, found) = self.found();
        self.scanner.report(ParseMessage::Expected {
            range,
            expected: "a value".to_owned(),
            found,
        });
        None
    }
}

/// Parse a decimal or hex integer with an optional leading minus.
fn parse_int(text: &str) -> Option<i64> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        rest.parse::<i64>().ok()?
    };
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttributeValue;

    fn parse(source: &str) -> (Module, Vec<Message>) {
        parse_module(FileId::try_from(1).unwrap(), source)
    }

    fn parse_ok(source: &str) -> Module {
        let (module, messages) = parse(source);
        assert!(messages.is_empty(), "unexpected messages: {messages:?}");
        module
    }

    #[test]
    fn round_trip_sample() {
        let module = parse_ok(
            "module Demo {
                enum Color { Red; Green; Blue; }
                record Point { int X; int Y; }
            }",
        );
        assert_eq!(module.name.symbol.resolve(), "Demo");
        assert_eq!(module.forms.len(), 2);

        match &module.forms[0] {
            Form::Enum(form) => {
                assert_eq!(form.name.symbol.resolve(), "Color");
                let names: Vec<_> = form
                    .fields
                    .iter()
                    .map(|field| field.name.symbol.resolve())
                    .collect();
                assert_eq!(names, ["Red", "Green", "Blue"]);
            }
            other => panic!("expected an enum, got {other:?}"),
        }
        match &module.forms[1] {
            Form::Struct(form) => {
                assert_eq!(form.kind, StructKind::Record);
                assert_eq!(form.fields.len(), 2);
                assert!(!form.fields[0].is_tag);
            }
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn annotations_attach_to_declarations() {
        let module = parse_ok(
            "module Demo {
                # A color.
                # Painted things have one.
                enum Color { Red; }
                <# A point
                   in the plane #>
                record Point { int X; }
            }",
        );
        match &module.forms[0] {
            Form::Enum(form) => assert_eq!(
                form.annotation.unwrap().resolve(),
                "A color.\nPainted things have one."
            ),
            other => panic!("expected an enum, got {other:?}"),
        }
        match &module.forms[1] {
            Form::Struct(form) => {
                assert_eq!(form.annotation.unwrap().resolve(), "A point in the plane")
            }
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn attributes_parse_eagerly() {
        let module = parse_ok(
            r#"module Demo {
                [csharp namespace="Demo.Schema" sealed]
                [* enabled=false]
                record Point { int X; }
            }"#,
        );
        let attrs = module.forms[0].attributes();
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[0].name.resolve(), "namespace");
        assert_eq!(
            attrs[0].value,
            AttributeValue::String(Symbol::intern("Demo.Schema"))
        );
        assert_eq!(attrs[1].value, AttributeValue::Bool(true));
        assert_eq!(attrs[2].selector, AttrSelector::Any);
        assert_eq!(attrs[2].value, AttributeValue::Bool(false));
    }

    #[test]
    fn dotted_attribute_names_and_json_values() {
        let module = parse_ok(
            r#"module Demo {
                [* json.enabled=false]
                [meta schema={"version": 3, "tags": ["a"]}]
                record Point { int X; }
            }"#,
        );
        let attrs = module.forms[0].attributes();
        assert_eq!(attrs[0].name.resolve(), "json.enabled");
        match &attrs[1].value {
            AttributeValue::Json(value) => assert_eq!(value["version"], 3),
            other => panic!("expected a json value, got {other:?}"),
        }
    }

    #[test]
    fn variants_and_qualified_children() {
        let module = parse_ok(
            "module Demo {
                enum ShapeKind { CircleKind; }
                variant Shape { tag ShapeKind Kind; }
                record Shape.Circle { float Radius; }
            }",
        );
        match &module.forms[1] {
            Form::Struct(form) => {
                assert_eq!(form.kind, StructKind::Variant);
                assert!(form.fields[0].is_tag);
            }
            other => panic!("expected a variant, got {other:?}"),
        }
        match &module.forms[2] {
            Form::Struct(form) => {
                assert_eq!(form.parent.unwrap().symbol.resolve(), "Shape");
                assert_eq!(form.name.symbol.resolve(), "Circle");
            }
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn generics_optionals_and_defaults() {
        let module = parse_ok(
            r#"module Demo {
                record Pair<A, B> {
                    A First;
                    B Second;
                    ?string Label = "none";
                    list<int> Items = [1, 2, 3];
                    dict<string, list<int>> Index = {};
                }
            }"#,
        );
        match &module.forms[0] {
            Form::Struct(form) => {
                assert_eq!(form.generics.len(), 2);
                assert!(matches!(form.fields[2].ty, TypeExpr::Optional { .. }));
                assert!(matches!(
                    form.fields[3].default,
                    Some(ValueExpr::List(_, ref items)) if items.len() == 3
                ));
                assert!(matches!(
                    form.fields[4].default,
                    Some(ValueExpr::EmptyObject(_))
                ));
            }
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn services_parse_directions_and_throws() {
        let module = parse_ok(
            "module Demo {
                exception Overflow { string Reason; }
                service Calculator {
                    c->s Add(int A, int B) returns (int Sum) throws Overflow;
                    s->c Notify(string Message);
                }
            }",
        );
        match &module.forms[1] {
            Form::Service(form) => {
                assert_eq!(form.functions.len(), 2);
                assert_eq!(form.functions[0].direction, Direction::ClientToServer);
                assert_eq!(form.functions[0].returns.len(), 1);
                assert_eq!(form.functions[0].throws.len(), 1);
                assert_eq!(form.functions[1].direction, Direction::ServerToClient);
                assert!(form.functions[1].returns.is_empty());
            }
            other => panic!("expected a service, got {other:?}"),
        }
    }

    #[test]
    fn webservice_resources() {
        let module = parse_ok(
            r#"module Demo {
                record User { string Name; }
                webservice Users {
                    GetUser => GET /users/{id:int} -> User;
                    Ping => GET /status -> 200 OK;
                }
            }"#,
        );
        match &module.forms[1] {
            Form::WebService(form) => {
                assert_eq!(form.resources.len(), 2);
                let resource = &form.resources[0];
                assert_eq!(resource.verb.symbol.resolve(), "GET");
                assert_eq!(resource.path.len(), 2);
                assert!(matches!(resource.path[1], UriSegment::Param { .. }));
                assert!(matches!(resource.response, Some(Response::Type(_))));
                match &form.resources[1].response {
                    Some(Response::Status { code, phrase, .. }) => {
                        assert_eq!(*code, 200);
                        assert_eq!(phrase.resolve(), "OK");
                    }
                    other => panic!("expected a status response, got {other:?}"),
                }
            }
            other => panic!("expected a webservice, got {other:?}"),
        }
    }

    #[test]
    fn unions_defines_tables() {
        let module = parse_ok(
            "module Demo {
                union Payload { Empty; Text: string; Blob: binary; }
                define Id long;
                table Scores { string Player; int Points; }
            }",
        );
        match &module.forms[0] {
            Form::Union(form) => {
                assert_eq!(form.clauses.len(), 3);
                assert!(form.clauses[0].ty.is_none());
                assert!(form.clauses[1].ty.is_some());
            }
            other => panic!("expected a union, got {other:?}"),
        }
        assert!(matches!(&module.forms[1], Form::Define(_)));
        assert!(matches!(&module.forms[2], Form::Table(_)));
    }

    #[test]
    fn syntax_errors_are_collected_and_recovered() {
        let (module, messages) = parse(
            "module Demo {
                record Good { int X; }
                record Bad { int ; }
                record AlsoGood { int Y; }
            }",
        );
        // the malformed field was reported, the surrounding records survive
        assert!(!messages.is_empty());
        assert_eq!(module.forms.len(), 3);
        match &module.forms[2] {
            Form::Struct(form) => assert_eq!(form.name.symbol.resolve(), "AlsoGood"),
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn keyword_names_are_rejected() {
        let (module, messages) = parse("module Demo { record table { int X; } }");
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            Message::Parse(ParseMessage::InvalidIdentifier { text, .. }) => {
                assert_eq!(text.resolve(), "table");
            }
            other => panic!("expected an invalid identifier message, got {other:?}"),
        }
        // the declaration itself survives
        assert_eq!(module.forms.len(), 1);
    }

    #[test]
    fn two_errors_two_messages() {
        let (_, messages) = parse(
            "module Demo {
                record A { int ; }
                record B { string ; }
            }",
        );
        let errors = messages.iter().filter(|m| m.is_error()).count();
        assert_eq!(errors, 2);
    }

    #[test]
    fn unterminated_string_reaches_eof_without_crashing() {
        let (_, messages) = parse(r#"module Demo { record R { string Name = "abc"#);
        let unterminated = messages
            .iter()
            .filter(|m| {
                matches!(
                    m,
                    Message::Scan(crate::reporting::ScanMessage::UnterminatedString { .. })
                )
            })
            .count();
        assert_eq!(unterminated, 1);
    }

    #[test]
    fn using_imports() {
        let module = parse_ok("module Demo { using Common; using Auth; }");
        assert_eq!(module.usings.len(), 2);
        assert_eq!(module.usings[0].symbol.resolve(), "Common");
    }
}
