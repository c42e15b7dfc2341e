//! The resolved schema model.
//!
//! Declarations live in an id-indexed arena owned by [`Ast`]. Forms refer to
//! each other through [`FormId`], so type identity is integer equality and
//! cross-references never borrow into sibling declarations.

use crate::attr::{self, AttrInstance, AttributeDescriptor, AttributeValue, Inherit};
use crate::source::FileRange;
use crate::symbol::Symbol;

pub mod resolve;

/// Index of a form in [`Ast::forms`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormId(u32);

impl FormId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a module in [`Ast::modules`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A resolved set of schema modules.
#[derive(Debug, Default)]
pub struct Ast {
    modules: Vec<ModuleData>,
    forms: Vec<FormData>,
}

#[derive(Debug)]
pub struct ModuleData {
    pub range: FileRange,
    pub name: Symbol,
    pub annotation: Option<Symbol>,
    pub attributes: Vec<AttrInstance>,
    pub usings: Vec<ModuleId>,
    pub forms: Vec<FormId>,
}

#[derive(Debug)]
pub struct FormData {
    pub range: FileRange,
    pub module: ModuleId,
    pub name: Symbol,
    pub annotation: Option<Symbol>,
    pub attributes: Vec<AttrInstance>,
    /// The enclosing form for qualified declarations such as
    /// `record Shape.Circle`.
    pub scope_parent: Option<FormId>,
    pub kind: FormKind,
}

#[derive(Debug)]
pub enum FormKind {
    Enum(EnumData),
    Struct(StructData),
    Union(UnionData),
    Define(DefineData),
    Table(TableData),
    Service(ServiceData),
    WebService(WebServiceData),
}

impl FormKind {
    pub fn description(&self) -> &'static str {
        match self {
            FormKind::Enum(_) => "an enum",
            FormKind::Struct(data) => data.kind.description(),
            FormKind::Union(_) => "a union",
            FormKind::Define(_) => "a type alias",
            FormKind::Table(_) => "a table",
            FormKind::Service(_) => "a service",
            FormKind::WebService(_) => "a web service",
        }
    }
}

#[derive(Debug)]
pub struct EnumData {
    pub base: IntType,
    pub members: Vec<EnumMember>,
}

#[derive(Debug)]
pub struct EnumMember {
    pub range: FileRange,
    pub name: Symbol,
    pub annotation: Option<Symbol>,
    pub attributes: Vec<AttrInstance>,
    pub ordinal: i64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StructKind {
    Record,
    Exception,
    Variant,
    Interface,
}

impl StructKind {
    pub fn description(self) -> &'static str {
        match self {
            StructKind::Record => "a record",
            StructKind::Exception => "an exception",
            StructKind::Variant => "a variant",
            StructKind::Interface => "an interface",
        }
    }
}

#[derive(Debug)]
pub struct StructData {
    pub kind: StructKind,
    pub generics: Vec<Symbol>,
    /// Resolved base types. The first entry is the ancestor used for field
    /// and attribute inheritance.
    pub inherits: Vec<Type>,
    pub fields: Vec<FieldData>,
}

#[derive(Debug)]
pub struct FieldData {
    pub range: FileRange,
    pub name: Symbol,
    pub annotation: Option<Symbol>,
    pub attributes: Vec<AttrInstance>,
    pub is_tag: bool,
    pub ty: Type,
    pub default: Option<Value>,
}

#[derive(Debug)]
pub struct UnionData {
    pub generics: Vec<Symbol>,
    pub clauses: Vec<UnionClauseData>,
}

#[derive(Debug)]
pub struct UnionClauseData {
    pub range: FileRange,
    pub name: Symbol,
    pub annotation: Option<Symbol>,
    pub ty: Option<Type>,
}

#[derive(Debug)]
pub struct DefineData {
    pub generics: Vec<Symbol>,
    pub ty: Type,
}

#[derive(Debug)]
pub struct TableData {
    pub fields: Vec<FieldData>,
}

#[derive(Debug)]
pub struct ServiceData {
    pub functions: Vec<FunctionData>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

#[derive(Debug)]
pub struct FunctionData {
    pub range: FileRange,
    pub name: Symbol,
    pub annotation: Option<Symbol>,
    pub direction: Direction,
    pub args: Vec<ParamData>,
    pub returns: Vec<ParamData>,
    pub throws: Vec<Type>,
}

#[derive(Debug)]
pub struct ParamData {
    pub name: Symbol,
    pub ty: Type,
}

#[derive(Debug)]
pub struct WebServiceData {
    pub resources: Vec<ResourceData>,
}

#[derive(Debug)]
pub struct ResourceData {
    pub range: FileRange,
    pub name: Symbol,
    pub annotation: Option<Symbol>,
    pub attributes: Vec<AttrInstance>,
    pub verb: Symbol,
    pub path: Vec<PathSegment>,
    pub content_as: Option<Symbol>,
    pub response: Option<ResponseData>,
}

#[derive(Debug)]
pub enum PathSegment {
    Literal(Symbol),
    Param { name: Symbol, ty: Type },
}

#[derive(Debug)]
pub enum ResponseData {
    Type(Type),
    Status { code: i64, phrase: Symbol },
}

/// Fixed-width integer primitives.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IntType {
    Sbyte,
    Byte,
    Short,
    Ushort,
    Int,
    Uint,
    Long,
    Ulong,
}

impl IntType {
    pub fn keyword(self) -> &'static str {
        match self {
            IntType::Sbyte => "sbyte",
            IntType::Byte => "byte",
            IntType::Short => "short",
            IntType::Ushort => "ushort",
            IntType::Int => "int",
            IntType::Uint => "uint",
            IntType::Long => "long",
            IntType::Ulong => "ulong",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FloatType {
    Float,
    Double,
}

impl FloatType {
    pub fn keyword(self) -> &'static str {
        match self {
            FloatType::Float => "float",
            FloatType::Double => "double",
        }
    }
}

/// A resolved type. Named forms appear by id, so two references to the same
/// declaration compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Bool,
    Int(IntType),
    Float(FloatType),
    String,
    Binary,
    Atom,
    Json,
    List(Box<Type>),
    Dict(Box<Type>, Box<Type>),
    Optional(Box<Type>),
    /// A `flags<E>` set over an enum form.
    Flags(FormId),
    /// A generic parameter of the enclosing form, by position.
    GenericParam(FormId, u32),
    Form(FormId),
    /// A generic form applied to arguments, e.g. `Pair<int, string>`.
    Instance(FormId, Vec<Type>),
    /// Placeholder left behind by a reported resolution error.
    Error,
}

impl Type {
    pub fn form_id(&self) -> Option<FormId> {
        match self {
            Type::Flags(id) | Type::Form(id) | Type::Instance(id, _) => Some(*id),
            _ => None,
        }
    }
}

/// A resolved literal default.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Symbol),
    /// A reference to an enum member, by form and member index.
    EnumMember(FormId, u32),
    List(Vec<Value>),
    Dict(Vec<(Value, Value)>),
    EmptyObject,
}

impl Ast {
    pub fn modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        (0..self.modules.len()).map(|index| ModuleId(index as u32))
    }

    pub fn forms(&self) -> impl Iterator<Item = FormId> + '_ {
        (0..self.forms.len()).map(|index| FormId(index as u32))
    }

    pub fn module(&self, id: ModuleId) -> &ModuleData {
        &self.modules[id.index()]
    }

    pub fn form(&self, id: FormId) -> &FormData {
        &self.forms[id.index()]
    }

    pub fn module_named(&self, name: Symbol) -> Option<ModuleId> {
        self.modules()
            .find(|id| self.module(*id).name == name)
    }

    pub fn form_named(&self, module: ModuleId, name: Symbol) -> Option<FormId> {
        self.module(module)
            .forms
            .iter()
            .copied()
            .find(|id| self.form(*id).name == name)
    }

    /// The dotted `Module.Form` name used in generated output.
    pub fn qualified_name(&self, id: FormId) -> String {
        let form = self.form(id);
        let module = self.module(form.module);
        match form.scope_parent {
            Some(parent) => format!(
                "{}.{}.{}",
                module.name,
                self.form(parent).name,
                form.name
            ),
            None => format!("{}.{}", module.name, form.name),
        }
    }

    /// The first base type's form, if any. This is the chain walked for
    /// inherited fields and `Inherit::Type` attributes.
    pub fn ancestor(&self, id: FormId) -> Option<FormId> {
        match &self.form(id).kind {
            FormKind::Struct(data) => data.inherits.first().and_then(Type::form_id),
            _ => None,
        }
    }

    /// The form followed by its ancestors, nearest first.
    pub fn ancestry(&self, id: FormId) -> Ancestry<'_> {
        Ancestry {
            ast: self,
            next: Some(id),
        }
    }

    /// Own fields followed by inherited ones. The flag is true for fields
    /// declared on an ancestor.
    pub fn all_fields(&self, id: FormId) -> impl Iterator<Item = (&FieldData, bool)> + '_ {
        self.ancestry(id).flat_map(move |ancestor| {
            let inherited = ancestor != id;
            let fields = match &self.form(ancestor).kind {
                FormKind::Struct(data) => data.fields.as_slice(),
                FormKind::Table(data) => data.fields.as_slice(),
                _ => &[],
            };
            fields.iter().map(move |field| (field, inherited))
        })
    }

    /// The name of a generic parameter, by owning form and position.
    pub fn generic_name(&self, id: FormId, index: u32) -> Symbol {
        let generics = match &self.form(id).kind {
            FormKind::Struct(data) => &data.generics,
            FormKind::Union(data) => &data.generics,
            FormKind::Define(data) => &data.generics,
            _ => return Symbol::intern_static("?"),
        };
        generics
            .get(index as usize)
            .copied()
            .unwrap_or_else(|| Symbol::intern_static("?"))
    }

    /// Render a type back to schema syntax, for diagnostics and output.
    pub fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Bool => "bool".to_owned(),
            Type::Int(int) => int.keyword().to_owned(),
            Type::Float(float) => float.keyword().to_owned(),
            Type::String => "string".to_owned(),
            Type::Binary => "binary".to_owned(),
            Type::Atom => "atom".to_owned(),
            Type::Json => "json".to_owned(),
            Type::List(item) => format!("list<{}>", self.type_name(item)),
            Type::Dict(key, value) => {
                format!("dict<{}, {}>", self.type_name(key), self.type_name(value))
            }
            Type::Optional(inner) => format!("?{}", self.type_name(inner)),
            Type::Flags(id) => format!("flags<{}>", self.form(*id).name),
            Type::GenericParam(form, index) => self.generic_name(*form, *index).resolve().to_owned(),
            Type::Form(id) => self.form(*id).name.resolve().to_owned(),
            Type::Instance(id, args) => {
                let args: Vec<String> = args.iter().map(|arg| self.type_name(arg)).collect();
                format!("{}<{}>", self.form(*id).name, args.join(", "))
            }
            Type::Error => "{unknown}".to_owned(),
        }
    }

    // ------------------------------------------------------- attribute lookup

    /// Resolve an attribute on a form, following the descriptor's
    /// inheritance mode. Local instances win; then `Inherit::Scope` walks
    /// the lexical scope out to the module, while `Inherit::Type` walks the
    /// ancestor chain.
    pub fn attribute(
        &self,
        id: FormId,
        descriptor: &AttributeDescriptor,
    ) -> Option<&AttributeValue> {
        if let Some(value) = attr::find_local(&self.form(id).attributes, descriptor) {
            return Some(value);
        }
        match descriptor.inherit {
            Inherit::None => None,
            Inherit::Scope => {
                let mut scope = self.form(id).scope_parent;
                while let Some(parent) = scope {
                    if let Some(value) =
                        attr::find_local(&self.form(parent).attributes, descriptor)
                    {
                        return Some(value);
                    }
                    scope = self.form(parent).scope_parent;
                }
                attr::find_local(&self.module(self.form(id).module).attributes, descriptor)
            }
            Inherit::Type => self
                .ancestry(id)
                .skip(1)
                .find_map(|ancestor| {
                    attr::find_local(&self.form(ancestor).attributes, descriptor)
                }),
        }
    }

    /// Resolve an attribute on a field. Fields inherit scoped attributes
    /// from their declaring form.
    pub fn field_attribute<'a>(
        &'a self,
        form: FormId,
        field: &'a FieldData,
        descriptor: &AttributeDescriptor,
    ) -> Option<&'a AttributeValue> {
        if let Some(value) = attr::find_local(&field.attributes, descriptor) {
            return Some(value);
        }
        match descriptor.inherit {
            Inherit::None => None,
            Inherit::Scope | Inherit::Type => self.attribute(form, descriptor),
        }
    }

    pub fn bool_attribute(
        &self,
        id: FormId,
        descriptor: &AttributeDescriptor,
        default: bool,
    ) -> bool {
        self.attribute(id, descriptor)
            .and_then(AttributeValue::as_bool)
            .unwrap_or(default)
    }

    /// Whether a wire format is enabled for a form. Formats default to
    /// enabled; `[* json.enabled=false]` style attributes opt out.
    pub fn format_enabled(&self, id: FormId, descriptor: &AttributeDescriptor) -> bool {
        self.bool_attribute(id, descriptor, true)
    }
}

/// Iterator over a form and its ancestors, produced by [`Ast::ancestry`].
/// Resolution rejects inheritance cycles, so the walk terminates.
pub struct Ancestry<'a> {
    ast: &'a Ast,
    next: Option<FormId>,
}

impl Iterator for Ancestry<'_> {
    type Item = FormId;

    fn next(&mut self) -> Option<FormId> {
        let current = self.next?;
        self.next = self.ast.ancestor(current);
        Some(current)
    }
}
