//! Diagnostic messages used in the keel compiler.
//!
//! These can be converted to [`Diagnostic`]s in order to present them to the user.
//!
//! [`Diagnostic`]: codespan_reporting::diagnostic::Diagnostic

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::attr::{HostKind, ValueKind};
use crate::files::FileId;
use crate::source::FileRange;
use crate::symbol::Symbol;

/// Problem codes attached to semantic diagnostics.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProblemCode {
    Syntax,
    UnknownType,
    UnknownAttribute,
    AttributeTarget,
    AttributeType,
    FormatDisabled,
    Internal,
}

impl ProblemCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ProblemCode::Syntax => "ESyntax",
            ProblemCode::UnknownType => "EUnknownType",
            ProblemCode::UnknownAttribute => "EUnknownAttribute",
            ProblemCode::AttributeTarget => "EAttributeTarget",
            ProblemCode::AttributeType => "EAttributeType",
            ProblemCode::FormatDisabled => "EFormatDisabled",
            ProblemCode::Internal => "EInternal",
        }
    }
}

/// Global diagnostic messages.
#[derive(Debug, Clone)]
pub enum Message {
    Scan(ScanMessage),
    Parse(ParseMessage),
    Resolve(ResolveMessage),
}

impl From<ScanMessage> for Message {
    fn from(message: ScanMessage) -> Self {
        Message::Scan(message)
    }
}

impl From<ParseMessage> for Message {
    fn from(message: ParseMessage) -> Self {
        Message::Parse(message)
    }
}

impl From<ResolveMessage> for Message {
    fn from(message: ResolveMessage) -> Self {
        Message::Resolve(message)
    }
}

impl Message {
    pub fn to_diagnostic(&self) -> Diagnostic<FileId> {
        match self {
            Message::Scan(message) => message.to_diagnostic(),
            Message::Parse(message) => message.to_diagnostic(),
            Message::Resolve(message) => message.to_diagnostic(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.to_diagnostic().severity >= codespan_reporting::diagnostic::Severity::Error
    }
}

/// Messages produced while scanning raw characters.
#[derive(Debug, Clone)]
pub enum ScanMessage {
    UnterminatedString {
        range: FileRange,
    },
    UnterminatedBlockComment {
        first_open: FileRange,
    },
    InvalidEscape {
        range: FileRange,
        found: char,
    },
}

impl ScanMessage {
    pub fn to_diagnostic(&self) -> Diagnostic<FileId> {
        match self {
            ScanMessage::UnterminatedString { range } => Diagnostic::error()
                .with_code(ProblemCode::Syntax.as_str())
                .with_message("Unterminated quoted string")
                .with_labels(vec![primary(range).with_message("string starts here")]),
            ScanMessage::UnterminatedBlockComment { first_open } => Diagnostic::error()
                .with_code(ProblemCode::Syntax.as_str())
                .with_message("unterminated block comment")
                .with_labels(vec![primary(first_open).with_message("first `<#`")])
                .with_notes(vec!["Help: a closing `#>` is needed".to_owned()]),
            ScanMessage::InvalidEscape { range, found } => Diagnostic::error()
                .with_code(ProblemCode::Syntax.as_str())
                .with_message(format!("invalid escape sequence `\\{found}`"))
                .with_labels(vec![primary(range)]),
        }
    }
}

/// Messages produced while parsing declarations.
#[derive(Debug, Clone)]
pub enum ParseMessage {
    Expected {
        range: FileRange,
        expected: String,
        found: Option<String>,
    },
    UnexpectedEof {
        range: FileRange,
        expected: String,
    },
    InvalidIdentifier {
        range: FileRange,
        text: Symbol,
    },
    InvalidNumber {
        range: FileRange,
        text: Symbol,
    },
}

impl ParseMessage {
    pub fn to_diagnostic(&self) -> Diagnostic<FileId> {
        match self {
            ParseMessage::Expected {
                range,
                expected,
                found,
            } => {
                let label = match found {
                    Some(found) => format!("expected {expected}, found `{found}`"),
                    None => format!("expected {expected}"),
                };
                Diagnostic::error()
                    .with_code(ProblemCode::Syntax.as_str())
                    .with_message(format!("expected {expected}"))
                    .with_labels(vec![primary(range).with_message(label)])
            }
            ParseMessage::UnexpectedEof { range, expected } => Diagnostic::error()
                .with_code(ProblemCode::Syntax.as_str())
                .with_message("unexpected end of file")
                .with_labels(vec![
                    primary(range).with_message(format!("expected {expected}"))
                ]),
            ParseMessage::InvalidIdentifier { range, text } => Diagnostic::error()
                .with_code(ProblemCode::Syntax.as_str())
                .with_message(format!("invalid identifier `{text}`"))
                .with_labels(vec![primary(range)]),
            ParseMessage::InvalidNumber { range, text } => Diagnostic::error()
                .with_code(ProblemCode::Syntax.as_str())
                .with_message(format!("invalid number literal `{text}`"))
                .with_labels(vec![primary(range)]),
        }
    }
}

/// Messages produced while resolving the declaration tree.
#[derive(Debug, Clone)]
pub enum ResolveMessage {
    UnknownType {
        range: FileRange,
        name: Symbol,
        suggestion: Option<Symbol>,
    },
    UnknownModule {
        range: FileRange,
        name: Symbol,
    },
    NotAType {
        range: FileRange,
        name: Symbol,
        found: &'static str,
    },
    NotAnEnum {
        range: FileRange,
        name: Symbol,
    },
    NotAnInterface {
        range: FileRange,
        name: Symbol,
    },
    InvalidAncestor {
        range: FileRange,
        name: Symbol,
        host: &'static str,
    },
    QualifierNotAVariant {
        range: FileRange,
        name: Symbol,
        found: &'static str,
    },
    GenericArity {
        range: FileRange,
        name: Symbol,
        expected: usize,
        found: usize,
    },
    ItemRedefinition {
        name: Symbol,
        found_range: FileRange,
        original_range: FileRange,
    },
    FieldRedeclaration {
        name: Symbol,
        found_range: FileRange,
        original_range: FileRange,
    },
    EnumBaseNotInteger {
        range: FileRange,
    },
    DefaultTypeMismatch {
        range: FileRange,
        field: Symbol,
        expected: String,
    },
    TagOutsideVariant {
        range: FileRange,
    },
    MissingTag {
        range: FileRange,
        name: Symbol,
    },
    UnknownAttribute {
        range: FileRange,
        name: Symbol,
        suggestion: Option<&'static str>,
    },
    AttributeTarget {
        range: FileRange,
        name: Symbol,
        host: HostKind,
    },
    AttributeType {
        range: FileRange,
        name: Symbol,
        expected: ValueKind,
        found: &'static str,
    },
    FormatDisabled {
        range: FileRange,
        format: &'static str,
        form: Symbol,
    },
}

impl ResolveMessage {
    pub fn to_diagnostic(&self) -> Diagnostic<FileId> {
        match self {
            ResolveMessage::UnknownType {
                range,
                name,
                suggestion,
            } => Diagnostic::error()
                .with_code(ProblemCode::UnknownType.as_str())
                .with_message(format!("cannot find type `{name}` in this scope"))
                .with_labels(vec![primary(range).with_message("unresolved reference")])
                .with_notes(did_you_mean(suggestion.as_ref().map(Symbol::resolve))),
            ResolveMessage::UnknownModule { range, name } => Diagnostic::error()
                .with_code(ProblemCode::UnknownType.as_str())
                .with_message(format!("cannot find module `{name}`"))
                .with_labels(vec![primary(range).with_message("unknown module")]),
            ResolveMessage::NotAType { range, name, found } => Diagnostic::error()
                .with_code(ProblemCode::UnknownType.as_str())
                .with_message(format!("`{name}` is not a type"))
                .with_labels(vec![
                    primary(range).with_message(format!("this is a {found}"))
                ]),
            ResolveMessage::NotAnEnum { range, name } => Diagnostic::error()
                .with_code(ProblemCode::UnknownType.as_str())
                .with_message(format!("`flags` requires an enum, found `{name}`"))
                .with_labels(vec![primary(range)]),
            ResolveMessage::NotAnInterface { range, name } => Diagnostic::error()
                .with_code(ProblemCode::UnknownType.as_str())
                .with_message(format!("`{name}` is not an interface"))
                .with_labels(vec![primary(range)
                    .with_message("only interfaces may follow the ancestor in this list")]),
            ResolveMessage::InvalidAncestor { range, name, host } => Diagnostic::error()
                .with_code(ProblemCode::UnknownType.as_str())
                .with_message(format!("a {host} cannot extend `{name}`"))
                .with_labels(vec![
                    primary(range).with_message(format!("invalid ancestor for a {host}"))
                ]),
            ResolveMessage::QualifierNotAVariant { range, name, found } => Diagnostic::error()
                .with_code(ProblemCode::UnknownType.as_str())
                .with_message(format!("`{name}` is not a variant"))
                .with_labels(vec![primary(range).with_message(format!(
                    "a qualified declaration nests in a variant, this is a {found}"
                ))]),
            ResolveMessage::GenericArity {
                range,
                name,
                expected,
                found,
            } => Diagnostic::error()
                .with_code(ProblemCode::Internal.as_str())
                .with_message(format!(
                    "wrong number of generic arguments for `{name}`: expected {expected}, found {found}"
                ))
                .with_labels(vec![primary(range).with_message("wrong number of arguments")]),
            ResolveMessage::ItemRedefinition {
                name,
                found_range,
                original_range,
            } => Diagnostic::error()
                .with_code(ProblemCode::Syntax.as_str())
                .with_message(format!("the name `{name}` is defined multiple times"))
                .with_labels(vec![
                    primary(found_range).with_message("redefined here"),
                    secondary(original_range).with_message("previous definition here"),
                ])
                .with_notes(vec![format!(
                    "`{name}` must be defined only once in this module"
                )]),
            ResolveMessage::FieldRedeclaration {
                name,
                found_range,
                original_range,
            } => Diagnostic::error()
                .with_code(ProblemCode::Syntax.as_str())
                .with_message(format!("field `{name}` is already declared"))
                .with_labels(vec![
                    primary(found_range).with_message("field already declared"),
                    secondary(original_range).with_message("previous field declaration here"),
                ])
                .with_notes(vec![format!(
                    "`{name}` is also available through the ancestor chain"
                )]),
            ResolveMessage::EnumBaseNotInteger { range } => Diagnostic::error()
                .with_code(ProblemCode::UnknownType.as_str())
                .with_message("enum base type must be an integer primitive")
                .with_labels(vec![primary(range)]),
            ResolveMessage::DefaultTypeMismatch {
                range,
                field,
                expected,
            } => Diagnostic::error()
                .with_code(ProblemCode::AttributeType.as_str())
                .with_message(format!(
                    "default value for `{field}` does not have type `{expected}`"
                ))
                .with_labels(vec![primary(range).with_message("mismatched default value")]),
            ResolveMessage::TagOutsideVariant { range } => Diagnostic::error()
                .with_code(ProblemCode::Syntax.as_str())
                .with_message("`tag` fields may only appear in variants")
                .with_labels(vec![primary(range)]),
            ResolveMessage::MissingTag { range, name } => Diagnostic::error()
                .with_code(ProblemCode::Syntax.as_str())
                .with_message(format!("variant `{name}` has no tag field"))
                .with_labels(vec![
                    primary(range).with_message("declare a `tag` field in this variant")
                ]),
            ResolveMessage::UnknownAttribute {
                range,
                name,
                suggestion,
            } => Diagnostic::error()
                .with_code(ProblemCode::UnknownAttribute.as_str())
                .with_message(format!("unknown attribute `{name}`"))
                .with_labels(vec![primary(range)])
                .with_notes(did_you_mean(*suggestion)),
            ResolveMessage::AttributeTarget { range, name, host } => Diagnostic::error()
                .with_code(ProblemCode::AttributeTarget.as_str())
                .with_message(format!(
                    "attribute `{name}` cannot be applied to a {}",
                    host.description()
                ))
                .with_labels(vec![primary(range).with_message("not allowed here")]),
            ResolveMessage::AttributeType {
                range,
                name,
                expected,
                found,
            } => Diagnostic::error()
                .with_code(ProblemCode::AttributeType.as_str())
                .with_message(format!(
                    "attribute `{name}` expects a {expected} value, found {found}"
                ))
                .with_labels(vec![primary(range).with_message("mismatched attribute value")]),
            ResolveMessage::FormatDisabled {
                range,
                format,
                form,
            } => Diagnostic::error()
                .with_code(ProblemCode::FormatDisabled.as_str())
                .with_message(format!(
                    "the {format} format is disabled for `{form}`"
                ))
                .with_labels(vec![primary(range)
                    .with_message(format!("`{form}` is referenced here with {format} enabled"))]),
        }
    }
}

fn primary(range: &FileRange) -> Label<FileId> {
    Label::primary(range.file_id(), *range)
}

fn secondary(range: &FileRange) -> Label<FileId> {
    Label::secondary(range.file_id(), *range)
}

fn did_you_mean(suggestion: Option<&str>) -> Vec<String> {
    suggestion
        .map(|name| format!("help: did you mean `{name}`?"))
        .into_iter()
        .collect()
}

/// Joins expected alternatives for "expected X" messages.
pub fn format_expected(expected: &[impl std::fmt::Display]) -> Option<String> {
    use itertools::Itertools;

    expected.split_last().map(|items| match items {
        (last, []) => format!("{last}"),
        (last, expected) => format!("{} or {}", expected.iter().format(", "), last),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_alternatives_join_with_or() {
        assert_eq!(format_expected(&[] as &[&str]), None);
        assert_eq!(format_expected(&["a name"]).unwrap(), "a name");
        assert_eq!(
            format_expected(&["`record`", "`enum`", "`variant`"]).unwrap(),
            "`record`, `enum` or `variant`"
        );
    }
}
