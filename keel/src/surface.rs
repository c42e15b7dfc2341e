//! The untyped declaration tree produced by the parser.
//!
//! One [`Module`] is produced per source file. Names are still plain
//! symbols at this stage; cross-references, generics and attributes are
//! resolved by [`crate::ast::resolve`].

use crate::attr::AttrInstance;
use crate::files::FileId;
use crate::reporting::Message;
use crate::source::FileRange;
use crate::symbol::Symbol;

mod grammar;
pub mod scanner;
pub mod term;

/// A located identifier.
#[derive(Debug, Copy, Clone)]
pub struct Name {
    pub range: FileRange,
    pub symbol: Symbol,
}

/// A doc comment attached to a declaration.
pub type Annotation = Symbol;

#[derive(Debug)]
pub struct Module {
    pub range: FileRange,
    pub name: Name,
    pub annotation: Option<Annotation>,
    pub attributes: Vec<AttrInstance>,
    pub usings: Vec<Name>,
    pub forms: Vec<Form>,
}

impl Module {
    /// Parse a module from `source`, collecting every diagnostic rather than
    /// stopping at the first.
    pub fn parse(file_id: FileId, source: &str) -> (Module, Vec<Message>) {
        grammar::parse_module(file_id, source)
    }
}

#[derive(Debug)]
pub enum Form {
    Enum(EnumForm),
    Struct(StructForm),
    Union(UnionForm),
    Define(DefineForm),
    Table(TableForm),
    Service(ServiceForm),
    WebService(WebServiceForm),
}

impl Form {
    pub fn name(&self) -> Name {
        match self {
            Form::Enum(form) => form.name,
            Form::Struct(form) => form.name,
            Form::Union(form) => form.name,
            Form::Define(form) => form.name,
            Form::Table(form) => form.name,
            Form::Service(form) => form.name,
            Form::WebService(form) => form.name,
        }
    }

    pub fn attributes(&self) -> &[AttrInstance] {
        match self {
            Form::Enum(form) => &form.attributes,
            Form::Struct(form) => &form.attributes,
            Form::Union(form) => &form.attributes,
            Form::Define(form) => &form.attributes,
            Form::Table(form) => &form.attributes,
            Form::Service(form) => &form.attributes,
            Form::WebService(form) => &form.attributes,
        }
    }
}

#[derive(Debug)]
pub struct EnumForm {
    pub range: FileRange,
    pub annotation: Option<Annotation>,
    pub attributes: Vec<AttrInstance>,
    pub name: Name,
    /// Optional integer base type, e.g. `enum Color : byte`.
    pub base: Option<TypeExpr>,
    pub fields: Vec<EnumField>,
}

#[derive(Debug)]
pub struct EnumField {
    pub annotation: Option<Annotation>,
    pub attributes: Vec<AttrInstance>,
    pub name: Name,
    pub value: Option<(FileRange, i64)>,
}

/// Record, exception, variant and interface declarations all share the same
/// body shape; [`StructKind`] tells them apart.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StructKind {
    Record,
    Exception,
    Variant,
    Interface,
}

#[derive(Debug)]
pub struct StructForm {
    pub range: FileRange,
    pub annotation: Option<Annotation>,
    pub attributes: Vec<AttrInstance>,
    pub kind: StructKind,
    pub name: Name,
    /// For `record Parent.Child { … }`: the qualifying variant name.
    pub parent: Option<Name>,
    pub generics: Vec<Name>,
    /// The `:`-list. The first entry may be a record/variant ancestor;
    /// the rest must be interfaces.
    pub inherits: Vec<TypeExpr>,
    pub fields: Vec<Field>,
}

#[derive(Debug)]
pub struct Field {
    pub annotation: Option<Annotation>,
    pub attributes: Vec<AttrInstance>,
    pub is_tag: bool,
    pub ty: TypeExpr,
    pub name: Name,
    pub default: Option<ValueExpr>,
}

#[derive(Debug)]
pub struct UnionForm {
    pub range: FileRange,
    pub annotation: Option<Annotation>,
    pub attributes: Vec<AttrInstance>,
    pub name: Name,
    pub generics: Vec<Name>,
    pub clauses: Vec<UnionClause>,
}

#[derive(Debug)]
pub struct UnionClause {
    pub annotation: Option<Annotation>,
    pub name: Name,
    pub ty: Option<TypeExpr>,
}

#[derive(Debug)]
pub struct DefineForm {
    pub range: FileRange,
    pub annotation: Option<Annotation>,
    pub attributes: Vec<AttrInstance>,
    pub name: Name,
    pub generics: Vec<Name>,
    pub ty: TypeExpr,
}

#[derive(Debug)]
pub struct TableForm {
    pub range: FileRange,
    pub annotation: Option<Annotation>,
    pub attributes: Vec<AttrInstance>,
    pub name: Name,
    pub fields: Vec<Field>,
}

#[derive(Debug)]
pub struct ServiceForm {
    pub range: FileRange,
    pub annotation: Option<Annotation>,
    pub attributes: Vec<AttrInstance>,
    pub name: Name,
    pub functions: Vec<Function>,
}

/// Message direction of a service function.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    /// `c->s`
    ClientToServer,
    /// `s->c`
    ServerToClient,
}

#[derive(Debug)]
pub struct Function {
    pub annotation: Option<Annotation>,
    pub direction: Direction,
    pub name: Name,
    pub args: Vec<Param>,
    pub returns: Vec<Param>,
    pub throws: Vec<TypeExpr>,
}

#[derive(Debug)]
pub struct Param {
    pub ty: TypeExpr,
    pub name: Name,
}

#[derive(Debug)]
pub struct WebServiceForm {
    pub range: FileRange,
    pub annotation: Option<Annotation>,
    pub attributes: Vec<AttrInstance>,
    pub name: Name,
    pub resources: Vec<Resource>,
}

#[derive(Debug)]
pub struct Resource {
    pub annotation: Option<Annotation>,
    pub attributes: Vec<AttrInstance>,
    pub name: Name,
    /// HTTP verb, e.g. `GET`.
    pub verb: Name,
    pub path: Vec<UriSegment>,
    /// Optional `as json` content-type alias.
    pub content_as: Option<Name>,
    pub response: Option<Response>,
}

#[derive(Debug)]
pub enum UriSegment {
    Literal(FileRange, Symbol),
    /// `{name:type}` template segments.
    Param { name: Name, ty: TypeExpr },
}

#[derive(Debug)]
pub enum Response {
    Type(TypeExpr),
    Status {
        range: FileRange,
        code: i64,
        phrase: Symbol,
    },
}

/// A syntactic type reference.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    Name {
        range: FileRange,
        name: Symbol,
        args: Vec<TypeExpr>,
    },
    Optional {
        range: FileRange,
        inner: Box<TypeExpr>,
    },
    /// Placeholder produced while recovering from a syntax error.
    Error { range: FileRange },
}

impl TypeExpr {
    pub fn range(&self) -> FileRange {
        match self {
            TypeExpr::Name { range, .. }
            | TypeExpr::Optional { range, .. }
            | TypeExpr::Error { range } => *range,
        }
    }
}

/// A literal default value.
#[derive(Debug, Clone)]
pub enum ValueExpr {
    Bool(FileRange, bool),
    Int(FileRange, i64),
    Float(FileRange, f64),
    String(FileRange, Symbol),
    /// A bare or dotted reference, e.g. `Red` or `Color.Red`.
    Ref(FileRange, Symbol, Option<Symbol>),
    List(FileRange, Vec<ValueExpr>),
    Dict(FileRange, Vec<(ValueExpr, ValueExpr)>),
    /// `{}`
    EmptyObject(FileRange),
}

impl ValueExpr {
    pub fn range(&self) -> FileRange {
        match self {
            ValueExpr::Bool(range, _)
            | ValueExpr::Int(range, _)
            | ValueExpr::Float(range, _)
            | ValueExpr::String(range, _)
            | ValueExpr::Ref(range, _, _)
            | ValueExpr::List(range, _)
            | ValueExpr::Dict(range, _)
            | ValueExpr::EmptyObject(range) => *range,
        }
    }
}
