//! Mapping from the per-file declaration trees to the resolved [`Ast`].
//!
//! Resolution is a pure one-shot pass: register every module and form
//! header, then fill the bodies resolving each type reference through the
//! module's `using` list. References to the same declaration share one
//! [`FormId`]. Recoverable problems are reported as messages and leave
//! [`Type::Error`] placeholders behind; structural violations like cyclic
//! ancestry raise a typed panic for the driver's panic hook.

use std::panic::panic_any;

use fxhash::{FxHashMap, FxHashSet};

use crate::attr::{self, AttrInstance, AttrSelector, HostKind};
use crate::reporting::{Message, ResolveMessage};
use crate::source::FileRange;
use crate::surface;
use crate::symbol::Symbol;

use super::{
    Ast, DefineData, Direction, EnumData, EnumMember, FieldData, FloatType, FormData, FormId,
    FormKind, FunctionData, IntType, ModuleData, ModuleId, ParamData, PathSegment, ResourceData,
    ResponseData, ServiceData, StructData, StructKind, TableData, Type, UnionClauseData,
    UnionData, Value, WebServiceData,
};

/// Structural failures raised as typed panics.
#[derive(Debug, Clone)]
pub enum Error {
    CyclicAncestry { form: String },
}

impl Error {
    pub fn description(&self) -> String {
        match self {
            Error::CyclicAncestry { form } => {
                format!("cyclic ancestry detected while resolving `{form}`")
            }
        }
    }
}

/// Resolve a set of parsed modules into one [`Ast`].
pub fn resolve(modules: &[surface::Module]) -> (Ast, Vec<Message>) {
    let mut resolver = Resolver {
        ast: Ast::default(),
        messages: Vec::new(),
        form_ids: FxHashMap::default(),
    };

    resolver.register(modules);
    resolver.resolve_usings(modules);
    resolver.resolve_scope_parents(modules);
    // Enums first: default values and `flags<E>` arguments need their
    // members and base types available.
    resolver.resolve_bodies(modules, true);
    resolver.resolve_bodies(modules, false);
    resolver.check_ancestry();
    resolver.check_tags();
    resolver.check_format_gating();
    resolver.validate_attributes();

    (resolver.ast, resolver.messages)
}

struct Resolver {
    ast: Ast,
    messages: Vec<Message>,
    form_ids: FxHashMap<(ModuleId, Symbol), FormId>,
}

impl Resolver {
    fn report(&mut self, message: ResolveMessage) {
        self.messages.push(Message::Resolve(message));
    }

    // ---------------------------------------------------------- registration

    /// Push every module and form header, building the name tables. Bodies
    /// stay empty except for generic parameter lists, which later arity
    /// checks need.
    fn register(&mut self, modules: &[surface::Module]) {
        for module in modules {
            let module_id = ModuleId(self.ast.modules.len() as u32);
            if let Some(original) = self.ast.module_named(module.name.symbol) {
                let original_range = self.ast.module(original).range;
                self.report(ResolveMessage::ItemRedefinition {
                    name: module.name.symbol,
                    found_range: module.name.range,
                    original_range,
                });
            }
            self.ast.modules.push(ModuleData {
                range: module.range,
                name: module.name.symbol,
                annotation: module.annotation,
                attributes: module.attributes.clone(),
                usings: Vec::new(),
                forms: Vec::new(),
            });

            for form in &module.forms {
                let form_id = FormId(self.ast.forms.len() as u32);
                let name = form.name().symbol;
                match self.form_ids.get(&(module_id, name)) {
                    Some(original) => {
                        let original_range = self.ast.form(*original).range;
                        self.report(ResolveMessage::ItemRedefinition {
                            name,
                            found_range: form.name().range,
                            original_range,
                        });
                    }
                    None => {
                        self.form_ids.insert((module_id, name), form_id);
                    }
                }
                let header = self.form_header(module_id, form);
                self.ast.forms.push(header);
                self.ast.modules[module_id.index()].forms.push(form_id);
            }
        }
    }

    fn form_header(&self, module: ModuleId, form: &surface::Form) -> FormData {
        let (range, annotation, attributes, kind) = match form {
            surface::Form::Enum(data) => (
                data.range,
                data.annotation,
                &data.attributes,
                FormKind::Enum(EnumData {
                    base: IntType::Int,
                    members: Vec::new(),
                }),
            ),
            surface::Form::Struct(data) => (
                data.range,
                data.annotation,
                &data.attributes,
                FormKind::Struct(StructData {
                    kind: struct_kind(data.kind),
                    generics: data.generics.iter().map(|name| name.symbol).collect(),
                    inherits: Vec::new(),
                    fields: Vec::new(),
                }),
            ),
            surface::Form::Union(data) => (
                data.range,
                data.annotation,
                &data.attributes,
                FormKind::Union(UnionData {
                    generics: data.generics.iter().map(|name| name.symbol).collect(),
                    clauses: Vec::new(),
                }),
            ),
            surface::Form::Define(data) => (
                data.range,
                data.annotation,
                &data.attributes,
                FormKind::Define(DefineData {
                    generics: data.generics.iter().map(|name| name.symbol).collect(),
                    ty: Type::Error,
                }),
            ),
            surface::Form::Table(data) => (
                data.range,
                data.annotation,
                &data.attributes,
                FormKind::Table(TableData { fields: Vec::new() }),
            ),
            surface::Form::Service(data) => (
                data.range,
                data.annotation,
                &data.attributes,
                FormKind::Service(ServiceData {
                    functions: Vec::new(),
                }),
            ),
            surface::Form::WebService(data) => (
                data.range,
                data.annotation,
                &data.attributes,
                FormKind::WebService(WebServiceData {
                    resources: Vec::new(),
                }),
            ),
        };
        FormData {
            range,
            module,
            name: form.name().symbol,
            annotation,
            attributes: attributes.clone(),
            scope_parent: None,
            kind,
        }
    }

    fn resolve_usings(&mut self, modules: &[surface::Module]) {
        for (index, module) in modules.iter().enumerate() {
            let module_id = ModuleId(index as u32);
            for using in &module.usings {
                match self.ast.module_named(using.symbol) {
                    Some(used) => self.ast.modules[module_id.index()].usings.push(used),
                    None => self.report(ResolveMessage::UnknownModule {
                        range: using.range,
                        name: using.symbol,
                    }),
                }
            }
        }
    }

    /// Link qualified declarations like `record Shape.Circle` to their
    /// enclosing form.
    fn resolve_scope_parents(&mut self, modules: &[surface::Module]) {
        for (module_index, module) in modules.iter().enumerate() {
            let module_id = ModuleId(module_index as u32);
            for (form_index, form) in module.forms.iter().enumerate() {
                let surface::Form::Struct(data) = form else {
                    continue;
                };
                let Some(parent) = data.parent else { continue };
                let form_id = self.ast.modules[module_id.index()].forms[form_index];
                match self.form_ids.get(&(module_id, parent.symbol)) {
                    Some(parent_id) => {
                        let parent_id = *parent_id;
                        let is_variant = matches!(
                            &self.ast.form(parent_id).kind,
                            FormKind::Struct(parent_data)
                                if parent_data.kind == StructKind::Variant
                        );
                        if is_variant {
                            self.ast.forms[form_id.index()].scope_parent = Some(parent_id);
                        } else {
                            let found = self.ast.form(parent_id).kind.description();
                            self.report(ResolveMessage::QualifierNotAVariant {
                                range: parent.range,
                                name: parent.symbol,
                                found,
                            });
                        }
                    }
                    None => {
                        let suggestion = self.suggest_type(module_id, parent.symbol);
                        self.report(ResolveMessage::UnknownType {
                            range: parent.range,
                            name: parent.symbol,
                            suggestion,
                        });
                    }
                }
            }
        }
    }

    // ---------------------------------------------------------------- lookup

    /// Find a form by plain name: the module's own declarations first, then
    /// its `using` imports in order.
    fn lookup_form(&self, module: ModuleId, name: Symbol) -> Option<FormId> {
        if let Some(id) = self.form_ids.get(&(module, name)) {
            return Some(*id);
        }
        self.ast
            .module(module)
            .usings
            .iter()
            .find_map(|used| self.form_ids.get(&(*used, name)).copied())
    }

    /// A did-you-mean candidate among the names visible from `module`.
    fn suggest_type(&self, module: ModuleId, name: Symbol) -> Option<Symbol> {
        let mut candidates: Vec<&str> = PRIMITIVES.iter().map(|(name, _)| *name).collect();
        candidates.extend(["list", "dict", "flags"]);
        let visible = std::iter::once(module)
            .chain(self.ast.module(module).usings.iter().copied());
        for visible_module in visible {
            for form in &self.ast.module(visible_module).forms {
                candidates.push(self.ast.form(*form).name.resolve());
            }
        }
        suggest(name.resolve(), candidates.into_iter()).map(Symbol::intern)
    }

    fn generic_arity(&self, id: FormId) -> usize {
        match &self.ast.form(id).kind {
            FormKind::Struct(data) => data.generics.len(),
            FormKind::Union(data) => data.generics.len(),
            FormKind::Define(data) => data.generics.len(),
            _ => 0,
        }
    }

    // ----------------------------------------------------------------- types

    fn resolve_type(&mut self, ctx: &Ctx<'_>, expr: &surface::TypeExpr) -> Type {
        match expr {
            surface::TypeExpr::Error { .. } => Type::Error,
            surface::TypeExpr::Optional { inner, .. } => {
                Type::Optional(Box::new(self.resolve_type(ctx, inner)))
            }
            surface::TypeExpr::Name { range, name, args } => {
                let word = name.resolve();

                if let Some(ty) = primitive(word) {
                    if !args.is_empty() {
                        self.report(ResolveMessage::GenericArity {
                            range: *range,
                            name: *name,
                            expected: 0,
                            found: args.len(),
                        });
                    }
                    return ty;
                }

                match word {
                    "list" => {
                        let mut args = self.resolve_args(ctx, args);
                        if args.len() != 1 {
                            self.report(ResolveMessage::GenericArity {
                                range: *range,
                                name: *name,
                                expected: 1,
                                found: args.len(),
                            });
                            return Type::Error;
                        }
                        return Type::List(Box::new(args.remove(0)));
                    }
                    "dict" => {
                        let mut args = self.resolve_args(ctx, args);
                        if args.len() != 2 {
                            self.report(ResolveMessage::GenericArity {
                                range: *range,
                                name: *name,
                                expected: 2,
                                found: args.len(),
                            });
                            return Type::Error;
                        }
                        let value = args.remove(1);
                        let key = args.remove(0);
                        return Type::Dict(Box::new(key), Box::new(value));
                    }
                    "flags" => return self.resolve_flags(ctx, *range, args),
                    _ => {}
                }

                if let Some(index) = ctx
                    .generics
                    .iter()
                    .position(|generic| *generic == *name)
                {
                    if !args.is_empty() {
                        self.report(ResolveMessage::GenericArity {
                            range: *range,
                            name: *name,
                            expected: 0,
                            found: args.len(),
                        });
                    }
                    return Type::GenericParam(ctx.form, index as u32);
                }

                let Some(id) = self.lookup_form(ctx.module, *name) else {
                    let suggestion = self.suggest_type(ctx.module, *name);
                    self.report(ResolveMessage::UnknownType {
                        range: *range,
                        name: *name,
                        suggestion,
                    });
                    return Type::Error;
                };

                match &self.ast.form(id).kind {
                    FormKind::Table(_)
                    | FormKind::Service(_)
                    | FormKind::WebService(_) => {
                        let found = self.ast.form(id).kind.description();
                        self.report(ResolveMessage::NotAType {
                            range: *range,
                            name: *name,
                            found,
                        });
                        return Type::Error;
                    }
                    _ => {}
                }

                let expected = self.generic_arity(id);
                let args = self.resolve_args(ctx, args);
                if args.len() != expected {
                    // Best-effort: keep the reference so mapping continues.
                    self.report(ResolveMessage::GenericArity {
                        range: *range,
                        name: *name,
                        expected,
                        found: args.len(),
                    });
                }
                if args.is_empty() {
                    Type::Form(id)
                } else {
                    Type::Instance(id, args)
                }
            }
        }
    }

    fn resolve_args(&mut self, ctx: &Ctx<'_>, args: &[surface::TypeExpr]) -> Vec<Type> {
        args.iter().map(|arg| self.resolve_type(ctx, arg)).collect()
    }

    fn resolve_flags(
        &mut self,
        ctx: &Ctx<'_>,
        range: FileRange,
        args: &[surface::TypeExpr],
    ) -> Type {
        if args.len() != 1 {
            self.report(ResolveMessage::GenericArity {
                range,
                name: Symbol::intern_static("flags"),
                expected: 1,
                found: args.len(),
            });
            return Type::Error;
        }
        let arg = &args[0];
        let arg_name = match arg {
            surface::TypeExpr::Name { name, .. } => *name,
            _ => Symbol::intern_static("?"),
        };
        match self.resolve_type(ctx, arg) {
            Type::Form(id) if matches!(self.ast.form(id).kind, FormKind::Enum(_)) => {
                Type::Flags(id)
            }
            Type::Error => Type::Error,
            _ => {
                self.report(ResolveMessage::NotAnEnum {
                    range: arg.range(),
                    name: arg_name,
                });
                Type::Error
            }
        }
    }

    // ---------------------------------------------------------------- bodies

    fn resolve_bodies(&mut self, modules: &[surface::Module], enums_only: bool) {
        for (module_index, module) in modules.iter().enumerate() {
            let module_id = ModuleId(module_index as u32);
            for (form_index, form) in module.forms.iter().enumerate() {
                if matches!(form, surface::Form::Enum(_)) != enums_only {
                    continue;
                }
                let form_id = self.ast.modules[module_id.index()].forms[form_index];
                let kind = self.form_body(module_id, form_id, form);
                self.ast.forms[form_id.index()].kind = kind;
            }
        }
    }

    fn form_body(
        &mut self,
        module: ModuleId,
        form_id: FormId,
        form: &surface::Form,
    ) -> FormKind {
        match form {
            surface::Form::Enum(data) => FormKind::Enum(self.enum_body(module, form_id, data)),
            surface::Form::Struct(data) => {
                FormKind::Struct(self.struct_body(module, form_id, data))
            }
            surface::Form::Union(data) => FormKind::Union(self.union_body(module, form_id, data)),
            surface::Form::Define(data) => {
                let generics: Vec<Symbol> =
                    data.generics.iter().map(|name| name.symbol).collect();
                let ctx = Ctx {
                    module,
                    form: form_id,
                    generics: &generics,
                };
                let ty = self.resolve_type(&ctx, &data.ty);
                FormKind::Define(DefineData { generics, ty })
            }
            surface::Form::Table(data) => {
                let ctx = Ctx {
                    module,
                    form: form_id,
                    generics: &[],
                };
                FormKind::Table(TableData {
                    fields: self.fields(&ctx, &data.fields),
                })
            }
            surface::Form::Service(data) => {
                FormKind::Service(self.service_body(module, form_id, data))
            }
            surface::Form::WebService(data) => {
                FormKind::WebService(self.webservice_body(module, form_id, data))
            }
        }
    }

    fn enum_body(
        &mut self,
        module: ModuleId,
        form_id: FormId,
        data: &surface::EnumForm,
    ) -> EnumData {
        let base = match &data.base {
            None => IntType::Int,
            Some(base) => {
                let ctx = Ctx {
                    module,
                    form: form_id,
                    generics: &[],
                };
                match self.resolve_type(&ctx, base) {
                    Type::Int(int) => int,
                    Type::Error => IntType::Int,
                    _ => {
                        self.report(ResolveMessage::EnumBaseNotInteger {
                            range: base.range(),
                        });
                        IntType::Int
                    }
                }
            }
        };

        let mut members = Vec::new();
        let mut next_ordinal = 0;
        for field in &data.fields {
            let ordinal = match field.value {
                Some((_, value)) => value,
                None => next_ordinal,
            };
            next_ordinal = ordinal.saturating_add(1);
            members.push(EnumMember {
                range: field.name.range,
                name: field.name.symbol,
                annotation: field.annotation,
                attributes: field.attributes.clone(),
                ordinal,
            });
        }

        EnumData { base, members }
    }

    fn struct_body(
        &mut self,
        module: ModuleId,
        form_id: FormId,
        data: &surface::StructForm,
    ) -> StructData {
        let kind = struct_kind(data.kind);
        let generics: Vec<Symbol> = data.generics.iter().map(|name| name.symbol).collect();
        let ctx = Ctx {
            module,
            form: form_id,
            generics: &generics,
        };

        // A qualified declaration takes its enclosing variant as ancestor;
        // every listed base must then be an interface.
        let mut inherits = Vec::new();
        if let Some(parent_id) = self.ast.form(form_id).scope_parent {
            inherits.push(Type::Form(parent_id));
        }
        for base in &data.inherits {
            let ty = self.resolve_type(&ctx, base);
            match ty.form_id() {
                Some(base_id) => {
                    let base_kind = &self.ast.form(base_id).kind;
                    if inherits.is_empty() {
                        let valid = match base_kind {
                            FormKind::Struct(base_data) => {
                                kind != StructKind::Interface
                                    || base_data.kind == StructKind::Interface
                            }
                            _ => false,
                        };
                        if !valid {
                            self.report(ResolveMessage::InvalidAncestor {
                                range: base.range(),
                                name: type_head(base),
                                host: kind.description(),
                            });
                            inherits.push(Type::Error);
                            continue;
                        }
                    } else {
                        let is_interface = matches!(
                            base_kind,
                            FormKind::Struct(base_data)
                                if base_data.kind == StructKind::Interface
                        );
                        if !is_interface {
                            self.report(ResolveMessage::NotAnInterface {
                                range: base.range(),
                                name: type_head(base),
                            });
                            inherits.push(Type::Error);
                            continue;
                        }
                    }
                    inherits.push(ty);
                }
                None => inherits.push(ty),
            }
        }

        StructData {
            kind,
            generics: generics.clone(),
            inherits,
            fields: self.fields(&ctx, &data.fields),
        }
    }

    fn fields(&mut self, ctx: &Ctx<'_>, fields: &[surface::Field]) -> Vec<FieldData> {
        let mut resolved: Vec<FieldData> = Vec::new();
        for field in fields {
            if let Some(original) = resolved
                .iter()
                .find(|existing| existing.name == field.name.symbol)
            {
                let original_range = original.range;
                self.report(ResolveMessage::FieldRedeclaration {
                    name: field.name.symbol,
                    found_range: field.name.range,
                    original_range,
                });
                continue;
            }
            let ty = self.resolve_type(ctx, &field.ty);
            let default = field
                .default
                .as_ref()
                .and_then(|value| self.check_value(&ty, value, field.name.symbol));
            resolved.push(FieldData {
                range: field.name.range,
                name: field.name.symbol,
                annotation: field.annotation,
                attributes: field.attributes.clone(),
                is_tag: field.is_tag,
                ty,
                default,
            });
        }
        resolved
    }

    fn union_body(
        &mut self,
        module: ModuleId,
        form_id: FormId,
        data: &surface::UnionForm,
    ) -> UnionData {
        let generics: Vec<Symbol> = data.generics.iter().map(|name| name.symbol).collect();
        let ctx = Ctx {
            module,
            form: form_id,
            generics: &generics,
        };
        let clauses = data
            .clauses
            .iter()
            .map(|clause| UnionClauseData {
                range: clause.name.range,
                name: clause.name.symbol,
                annotation: clause.annotation,
                ty: clause.ty.as_ref().map(|ty| self.resolve_type(&ctx, ty)),
            })
            .collect();
        UnionData { generics, clauses }
    }

    fn service_body(
        &mut self,
        module: ModuleId,
        form_id: FormId,
        data: &surface::ServiceForm,
    ) -> ServiceData {
        let ctx = Ctx {
            module,
            form: form_id,
            generics: &[],
        };
        let functions = data
            .functions
            .iter()
            .map(|function| FunctionData {
                range: function.name.range,
                name: function.name.symbol,
                annotation: function.annotation,
                direction: match function.direction {
                    surface::Direction::ClientToServer => Direction::ClientToServer,
                    surface::Direction::ServerToClient => Direction::ServerToClient,
                },
                args: self.params(&ctx, &function.args),
                returns: self.params(&ctx, &function.returns),
                throws: function
                    .throws
                    .iter()
                    .map(|ty| self.resolve_type(&ctx, ty))
                    .collect(),
            })
            .collect();
        ServiceData { functions }
    }

    fn params(&mut self, ctx: &Ctx<'_>, params: &[surface::Param]) -> Vec<ParamData> {
        params
            .iter()
            .map(|param| ParamData {
                name: param.name.symbol,
                ty: self.resolve_type(ctx, &param.ty),
            })
            .collect()
    }

    fn webservice_body(
        &mut self,
        module: ModuleId,
        form_id: FormId,
        data: &surface::WebServiceForm,
    ) -> WebServiceData {
        let ctx = Ctx {
            module,
            form: form_id,
            generics: &[],
        };
        let resources = data
            .resources
            .iter()
            .map(|resource| ResourceData {
                range: resource.name.range,
                name: resource.name.symbol,
                annotation: resource.annotation,
                attributes: resource.attributes.clone(),
                verb: resource.verb.symbol,
                path: resource
                    .path
                    .iter()
                    .map(|segment| match segment {
                        surface::UriSegment::Literal(_, text) => PathSegment::Literal(*text),
                        surface::UriSegment::Param { name, ty } => PathSegment::Param {
                            name: name.symbol,
                            ty: self.resolve_type(&ctx, ty),
                        },
                    })
                    .collect(),
                content_as: resource.content_as.map(|name| name.symbol),
                response: resource.response.as_ref().map(|response| match response {
                    surface::Response::Type(ty) => {
                        ResponseData::Type(self.resolve_type(&ctx, ty))
                    }
                    surface::Response::Status { code, phrase, .. } => ResponseData::Status {
                        code: *code,
                        phrase: *phrase,
                    },
                }),
            })
            .collect();
        WebServiceData { resources }
    }

    // --------------------------------------------------------------- values

    /// Check a default value against the field's resolved type, producing
    /// the resolved [`Value`].
    fn check_value(
        &mut self,
        ty: &Type,
        expr: &surface::ValueExpr,
        field: Symbol,
    ) -> Option<Value> {
        use surface::ValueExpr;

        let value = match (ty, expr) {
            (Type::Error, _) => return None,
            (Type::Optional(inner), _) => return self.check_value(inner, expr, field),
            (Type::Bool, ValueExpr::Bool(_, value)) => Value::Bool(*value),
            (Type::Int(_), ValueExpr::Int(_, value)) => Value::Int(*value),
            (Type::Float(_), ValueExpr::Int(_, value)) => Value::Float(*value as f64),
            (Type::Float(_), ValueExpr::Float(_, value)) => Value::Float(*value),
            (Type::String, ValueExpr::String(_, value)) => Value::String(*value),
            (Type::Atom, ValueExpr::String(_, value)) => Value::String(*value),
            (Type::Atom, ValueExpr::Ref(_, first, None)) => Value::String(*first),
            (Type::Form(id), ValueExpr::Ref(range, first, second))
                if matches!(self.ast.form(*id).kind, FormKind::Enum(_)) =>
            {
                let member = match second {
                    // `Color.Red` style: the qualifier must name the enum.
                    Some(member) if *first == self.ast.form(*id).name => Some(*member),
                    Some(_) => None,
                    None => Some(*first),
                };
                let index = member.and_then(|member| {
                    let FormKind::Enum(data) = &self.ast.form(*id).kind else {
                        return None;
                    };
                    data.members
                        .iter()
                        .position(|candidate| candidate.name == member)
                });
                match index {
                    Some(index) => Value::EnumMember(*id, index as u32),
                    None => {
                        return self.value_mismatch(ty, *range, field);
                    }
                }
            }
            (Type::List(item), ValueExpr::List(_, items)) => Value::List(
                items
                    .iter()
                    .filter_map(|expr| self.check_value(item, expr, field))
                    .collect(),
            ),
            (Type::Dict(key, value), ValueExpr::Dict(_, pairs)) => Value::Dict(
                pairs
                    .iter()
                    .filter_map(|(key_expr, value_expr)| {
                        let key = self.check_value(key, key_expr, field)?;
                        let value = self.check_value(value, value_expr, field)?;
                        Some((key, value))
                    })
                    .collect(),
            ),
            (Type::Dict(_, _), ValueExpr::EmptyObject(_)) => Value::Dict(Vec::new()),
            (Type::Json, ValueExpr::EmptyObject(_)) => Value::EmptyObject,
            (Type::Json, _) => return self.json_default(expr),
            (_, expr) => {
                return self.value_mismatch(ty, expr.range(), field);
            }
        };
        Some(value)
    }

    fn value_mismatch(&mut self, ty: &Type, range: FileRange, field: Symbol) -> Option<Value> {
        let expected = self.ast.type_name(ty);
        self.report(ResolveMessage::DefaultTypeMismatch {
            range,
            field,
            expected,
        });
        None
    }

    /// A `json`-typed default accepts any literal shape.
    fn json_default(&mut self, expr: &surface::ValueExpr) -> Option<Value> {
        use surface::ValueExpr;
        Some(match expr {
            ValueExpr::Bool(_, value) => Value::Bool(*value),
            ValueExpr::Int(_, value) => Value::Int(*value),
            ValueExpr::Float(_, value) => Value::Float(*value),
            ValueExpr::String(_, value) | ValueExpr::Ref(_, value, None) => Value::String(*value),
            ValueExpr::Ref(_, first, Some(second)) => {
                Value::String(Symbol::intern(format!("{first}.{second}")))
            }
            ValueExpr::List(_, items) => Value::List(
                items
                    .iter()
                    .filter_map(|item| self.json_default(item))
                    .collect(),
            ),
            ValueExpr::Dict(_, pairs) => Value::Dict(
                pairs
                    .iter()
                    .filter_map(|(key, value)| {
                        Some((self.json_default(key)?, self.json_default(value)?))
                    })
                    .collect(),
            ),
            ValueExpr::EmptyObject(_) => Value::EmptyObject,
        })
    }

    // ---------------------------------------------------------------- checks

    /// Walk every ancestor chain with a visited set. A cycle is a structural
    /// failure: it would make every chain walk in the compiler loop forever,
    /// so it aborts resolution through the panic hook.
    fn check_ancestry(&self) {
        for id in self.ast.forms() {
            let mut visited = FxHashSet::default();
            let mut current = Some(id);
            while let Some(form) = current {
                if !visited.insert(form) {
                    panic_any(Error::CyclicAncestry {
                        form: self.ast.qualified_name(form),
                    });
                }
                current = self.ast.ancestor(form);
            }
        }
    }

    fn check_tags(&mut self) {
        let mut messages = Vec::new();
        for id in self.ast.forms() {
            let form = self.ast.form(id);
            let FormKind::Struct(data) = &form.kind else {
                if let FormKind::Table(data) = &form.kind {
                    for field in &data.fields {
                        if field.is_tag {
                            messages.push(ResolveMessage::TagOutsideVariant {
                                range: field.range,
                            });
                        }
                    }
                }
                continue;
            };
            if data.kind == StructKind::Variant {
                let tagged = self.ast.all_fields(id).any(|(field, _)| field.is_tag);
                if !tagged {
                    messages.push(ResolveMessage::MissingTag {
                        range: form.range,
                        name: form.name,
                    });
                }
            } else {
                for field in &data.fields {
                    if field.is_tag {
                        messages.push(ResolveMessage::TagOutsideVariant {
                            range: field.range,
                        });
                    }
                }
            }
        }
        for message in messages {
            self.report(message);
        }
    }

    /// Report fields that drag a format-disabled form into a form that has
    /// the format enabled.
    fn check_format_gating(&mut self) {
        let mut messages = Vec::new();
        for id in self.ast.forms() {
            let fields = match &self.ast.form(id).kind {
                FormKind::Struct(data) => &data.fields,
                FormKind::Table(data) => &data.fields,
                _ => continue,
            };
            for descriptor in [&attr::core::JSON_ENABLED, &attr::core::BINARY_ENABLED] {
                if !self.ast.format_enabled(id, descriptor) {
                    continue;
                }
                let format = match descriptor.name {
                    "json.enabled" => "json",
                    _ => "binary",
                };
                for field in fields {
                    let mut referenced = Vec::new();
                    collect_form_ids(&field.ty, &mut referenced);
                    for reference in referenced {
                        if !self.ast.format_enabled(reference, descriptor) {
                            messages.push(ResolveMessage::FormatDisabled {
                                range: field.range,
                                format,
                                form: self.ast.form(reference).name,
                            });
                        }
                    }
                }
            }
        }
        for message in messages {
            self.report(message);
        }
    }

    /// Check every attribute instance against the descriptor registry.
    /// Instances addressed to a target no descriptor names are left for
    /// external backends to interpret.
    fn validate_attributes(&mut self) {
        let mut messages = Vec::new();
        for id in self.ast.modules() {
            validate_instances(&self.ast.module(id).attributes, HostKind::Module, &mut messages);
        }
        for id in self.ast.forms() {
            let form = self.ast.form(id);
            let host = match &form.kind {
                FormKind::Enum(_) => HostKind::Enum,
                FormKind::Struct(data) => match data.kind {
                    StructKind::Record | StructKind::Exception => HostKind::Record,
                    StructKind::Variant => HostKind::Variant,
                    StructKind::Interface => HostKind::Interface,
                },
                FormKind::Union(_) => HostKind::Union,
                FormKind::Define(_) => HostKind::Define,
                FormKind::Table(_) => HostKind::Table,
                FormKind::Service(_) => HostKind::Service,
                FormKind::WebService(_) => HostKind::WebService,
            };
            validate_instances(&form.attributes, host, &mut messages);

            match &form.kind {
                FormKind::Enum(data) => {
                    for member in &data.members {
                        validate_instances(&member.attributes, HostKind::EnumField, &mut messages);
                    }
                }
                FormKind::Struct(data) => {
                    for field in &data.fields {
                        validate_instances(&field.attributes, HostKind::Field, &mut messages);
                    }
                }
                FormKind::Table(data) => {
                    for field in &data.fields {
                        validate_instances(&field.attributes, HostKind::Field, &mut messages);
                    }
                }
                FormKind::WebService(data) => {
                    for resource in &data.resources {
                        validate_instances(
                            &resource.attributes,
                            HostKind::Resource,
                            &mut messages,
                        );
                    }
                }
                _ => {}
            }
        }
        for message in messages {
            self.report(message);
        }
    }
}

/// The scope a type reference is resolved in.
struct Ctx<'a> {
    module: ModuleId,
    form: FormId,
    generics: &'a [Symbol],
}

const PRIMITIVES: &[(&str, Type)] = &[
    ("bool", Type::Bool),
    ("sbyte", Type::Int(IntType::Sbyte)),
    ("byte", Type::Int(IntType::Byte)),
    ("short", Type::Int(IntType::Short)),
    ("ushort", Type::Int(IntType::Ushort)),
    ("int", Type::Int(IntType::Int)),
    ("uint", Type::Int(IntType::Uint)),
    ("long", Type::Int(IntType::Long)),
    ("ulong", Type::Int(IntType::Ulong)),
    ("float", Type::Float(FloatType::Float)),
    ("double", Type::Float(FloatType::Double)),
    ("string", Type::String),
    ("binary", Type::Binary),
    ("atom", Type::Atom),
    ("json", Type::Json),
];

fn primitive(name: &str) -> Option<Type> {
    PRIMITIVES
        .iter()
        .find(|(primitive, _)| *primitive == name)
        .map(|(_, ty)| ty.clone())
}

fn struct_kind(kind: surface::StructKind) -> StructKind {
    match kind {
        surface::StructKind::Record => StructKind::Record,
        surface::StructKind::Exception => StructKind::Exception,
        surface::StructKind::Variant => StructKind::Variant,
        surface::StructKind::Interface => StructKind::Interface,
    }
}

/// The head identifier of a type expression, for diagnostics.
fn type_head(expr: &surface::TypeExpr) -> Symbol {
    match expr {
        surface::TypeExpr::Name { name, .. } => *name,
        surface::TypeExpr::Optional { inner, .. } => type_head(inner),
        surface::TypeExpr::Error { .. } => Symbol::intern_static("{unknown}"),
    }
}

/// Every form a type mentions, including through builtins and instances.
fn collect_form_ids(ty: &Type, out: &mut Vec<FormId>) {
    match ty {
        Type::List(item) | Type::Optional(item) => collect_form_ids(item, out),
        Type::Dict(key, value) => {
            collect_form_ids(key, out);
            collect_form_ids(value, out);
        }
        Type::Flags(id) | Type::Form(id) => out.push(*id),
        Type::Instance(id, args) => {
            out.push(*id);
            for arg in args {
                collect_form_ids(arg, out);
            }
        }
        _ => {}
    }
}

fn validate_instances(
    instances: &[AttrInstance],
    host: HostKind,
    out: &mut Vec<ResolveMessage>,
) {
    for instance in instances {
        let known_target = match instance.selector {
            AttrSelector::Any => true,
            AttrSelector::Target(target) => attr::registry()
                .iter()
                .any(|descriptor| descriptor.target == target.resolve()),
        };
        if !known_target {
            continue;
        }
        let Some(descriptor) = attr::lookup(instance.selector, instance.name) else {
            let suggestion = suggest(
                instance.name.resolve(),
                attr::registry().iter().map(|descriptor| descriptor.name),
            );
            out.push(ResolveMessage::UnknownAttribute {
                range: instance.range,
                name: instance.name,
                suggestion,
            });
            continue;
        };
        if !descriptor.hosts.contains(host) {
            out.push(ResolveMessage::AttributeTarget {
                range: instance.range,
                name: instance.name,
                host,
            });
            continue;
        }
        if !instance.value.matches_kind(descriptor.kind) {
            out.push(ResolveMessage::AttributeType {
                range: instance.range,
                name: instance.name,
                expected: descriptor.kind,
                found: instance.value.description(),
            });
        }
    }
}

/// Nearest name within edit distance two, for did-you-mean notes.
fn suggest<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    candidates
        .map(|candidate| (levenshtein::levenshtein(name, candidate), candidate))
        .filter(|(distance, _)| (1..=2).contains(distance))
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;
    use crate::files::FileId;

    fn resolve_sources(sources: &[&str]) -> (Ast, Vec<Message>) {
        let mut modules = Vec::new();
        for (index, source) in sources.iter().enumerate() {
            let file_id = FileId::try_from(index as u32 + 1).unwrap();
            let (module, messages) = surface::Module::parse(file_id, source);
            assert!(messages.is_empty(), "unexpected syntax errors: {messages:?}");
            modules.push(module);
        }
        resolve(&modules)
    }

    fn resolve_one(source: &str) -> (Ast, Vec<Message>) {
        resolve_sources(&[source])
    }

    fn codes(messages: &[Message]) -> Vec<String> {
        messages
            .iter()
            .map(|message| message.to_diagnostic().code.unwrap_or_default())
            .collect()
    }

    #[test]
    fn color_point_round_trip() {
        let (ast, messages) = resolve_one(
            "module Demo {
                enum Color { Red; Green; Blue; }
                record Point { int X; int Y; }
            }",
        );
        assert!(messages.is_empty(), "{messages:?}");

        let module = ast.modules().next().unwrap();
        let color = ast.form_named(module, Symbol::intern("Color")).unwrap();
        match &ast.form(color).kind {
            FormKind::Enum(data) => {
                let ordinals: Vec<i64> =
                    data.members.iter().map(|member| member.ordinal).collect();
                assert_eq!(ordinals, [0, 1, 2]);
                assert_eq!(data.base, IntType::Int);
            }
            other => panic!("expected an enum, got {other:?}"),
        }

        let point = ast.form_named(module, Symbol::intern("Point")).unwrap();
        match &ast.form(point).kind {
            FormKind::Struct(data) => {
                assert_eq!(data.fields.len(), 2);
                assert_eq!(data.fields[0].ty, Type::Int(IntType::Int));
            }
            other => panic!("expected a record, got {other:?}"),
        }

        // `enabled` resolves true by default
        assert!(ast.bool_attribute(point, &attr::core::ENABLED, true));
    }

    #[test]
    fn references_share_one_form_id() {
        let (ast, messages) = resolve_one(
            "module Demo {
                record Point { int X; }
                record Segment { Point Start; Point End; }
            }",
        );
        assert!(messages.is_empty(), "{messages:?}");
        let module = ast.modules().next().unwrap();
        let point = ast.form_named(module, Symbol::intern("Point")).unwrap();
        let segment = ast.form_named(module, Symbol::intern("Segment")).unwrap();
        match &ast.form(segment).kind {
            FormKind::Struct(data) => {
                assert_eq!(data.fields[0].ty, Type::Form(point));
                assert_eq!(data.fields[0].ty, data.fields[1].ty);
            }
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_reports_exactly_once_with_suggestion() {
        let (_, messages) = resolve_one(
            "module Demo {
                record Point { int X; }
                record Line { Poin Start; }
            }",
        );
        assert_eq!(codes(&messages), ["EUnknownType"]);
        match &messages[0] {
            Message::Resolve(ResolveMessage::UnknownType { suggestion, .. }) => {
                assert_eq!(suggestion.as_ref().map(Symbol::resolve), Some("Point"));
            }
            other => panic!("expected an unknown type message, got {other:?}"),
        }
    }

    #[test]
    fn using_imports_scope_names() {
        let (ast, messages) = resolve_sources(&[
            "module Common { record Address { string City; } }",
            "module App { using Common; record User { Address Home; } }",
        ]);
        assert!(messages.is_empty(), "{messages:?}");
        let common = ast.module_named(Symbol::intern("Common")).unwrap();
        let app = ast.module_named(Symbol::intern("App")).unwrap();
        let address = ast.form_named(common, Symbol::intern("Address")).unwrap();
        let user = ast.form_named(app, Symbol::intern("User")).unwrap();
        match &ast.form(user).kind {
            FormKind::Struct(data) => assert_eq!(data.fields[0].ty, Type::Form(address)),
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn references_without_using_do_not_resolve() {
        let (_, messages) = resolve_sources(&[
            "module Common { record Address { string City; } }",
            "module App { record User { Address Home; } }",
        ]);
        assert_eq!(codes(&messages), ["EUnknownType"]);
    }

    #[test]
    fn generic_arity_mismatch_is_nonfatal() {
        let (ast, messages) = resolve_one(
            "module Demo {
                record Pair<A, B> { A First; B Second; }
                record Holder { Pair<int> P; }
            }",
        );
        assert_eq!(codes(&messages), ["EInternal"]);
        // mapping continued best-effort
        let module = ast.modules().next().unwrap();
        assert!(ast.form_named(module, Symbol::intern("Holder")).is_some());
    }

    #[test]
    fn generic_instances_resolve_parameters_by_position() {
        let (ast, messages) = resolve_one(
            "module Demo {
                record Pair<A, B> { A First; B Second; }
                record Holder { Pair<int, string> P; }
            }",
        );
        assert!(messages.is_empty(), "{messages:?}");
        let module = ast.modules().next().unwrap();
        let pair = ast.form_named(module, Symbol::intern("Pair")).unwrap();
        match &ast.form(pair).kind {
            FormKind::Struct(data) => {
                assert_eq!(data.fields[0].ty, Type::GenericParam(pair, 0));
                assert_eq!(data.fields[1].ty, Type::GenericParam(pair, 1));
            }
            other => panic!("expected a record, got {other:?}"),
        }
        let holder = ast.form_named(module, Symbol::intern("Holder")).unwrap();
        match &ast.form(holder).kind {
            FormKind::Struct(data) => assert_eq!(
                data.fields[0].ty,
                Type::Instance(pair, vec![Type::Int(IntType::Int), Type::String])
            ),
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn cyclic_ancestry_panics_with_a_typed_error() {
        let result = catch_unwind(AssertUnwindSafe(|| {
            resolve_one(
                "module Demo {
                    record A : B { int X; }
                    record B : A { int Y; }
                }",
            )
        }));
        let payload = result.unwrap_err();
        let error = payload.downcast_ref::<Error>().expect("a typed error");
        assert!(error.description().contains("cyclic ancestry"));
    }

    #[test]
    fn inherited_fields_are_looked_up_not_copied() {
        let (ast, messages) = resolve_one(
            "module Demo {
                record Base { int Id; }
                record Child : Base { string Name; }
            }",
        );
        assert!(messages.is_empty(), "{messages:?}");
        let module = ast.modules().next().unwrap();
        let child = ast.form_named(module, Symbol::intern("Child")).unwrap();
        let all: Vec<(String, bool)> = ast
            .all_fields(child)
            .map(|(field, inherited)| (field.name.resolve().to_owned(), inherited))
            .collect();
        assert_eq!(
            all,
            [("Name".to_owned(), false), ("Id".to_owned(), true)]
        );
        match &ast.form(child).kind {
            FormKind::Struct(data) => assert_eq!(data.fields.len(), 1),
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn qualified_children_take_the_variant_as_ancestor() {
        let (ast, messages) = resolve_one(
            "module Demo {
                variant Shape { tag int Kind; }
                record Shape.Circle { float Radius; }
            }",
        );
        assert!(messages.is_empty(), "{messages:?}");
        let module = ast.modules().next().unwrap();
        let shape = ast.form_named(module, Symbol::intern("Shape")).unwrap();
        let circle = ast.form_named(module, Symbol::intern("Circle")).unwrap();
        assert_eq!(ast.ancestor(circle), Some(shape));
        assert!(ast
            .all_fields(circle)
            .any(|(field, inherited)| inherited && field.is_tag));
    }

    #[test]
    fn qualified_names_must_nest_in_a_variant() {
        let (_, messages) = resolve_one(
            "module Demo {
                enum Kind { A; }
                record Kind.Child { int X; }
            }",
        );
        assert_eq!(codes(&messages), ["EUnknownType"]);
    }

    #[test]
    fn non_interface_after_ancestor_is_rejected() {
        let (_, messages) = resolve_one(
            "module Demo {
                record Base { int Id; }
                record Other { int Z; }
                interface Named { string Name; }
                record Child : Base, Other { int Y; }
                record Fine : Base, Named { int W; }
            }",
        );
        assert_eq!(messages.len(), 1);
        assert!(matches!(
            &messages[0],
            Message::Resolve(ResolveMessage::NotAnInterface { .. })
        ));
    }

    #[test]
    fn enum_base_must_be_an_integer() {
        let (_, messages) = resolve_one("module Demo { enum E : string { A; } }");
        assert!(matches!(
            &messages[0],
            Message::Resolve(ResolveMessage::EnumBaseNotInteger { .. })
        ));
    }

    #[test]
    fn explicit_ordinals_continue_the_sequence() {
        let (ast, messages) = resolve_one(
            "module Demo { enum E { A; B = 10; C; D = 0x20; } }",
        );
        assert!(messages.is_empty(), "{messages:?}");
        let module = ast.modules().next().unwrap();
        let e = ast.form_named(module, Symbol::intern("E")).unwrap();
        match &ast.form(e).kind {
            FormKind::Enum(data) => {
                let ordinals: Vec<i64> =
                    data.members.iter().map(|member| member.ordinal).collect();
                assert_eq!(ordinals, [0, 10, 11, 32]);
            }
            other => panic!("expected an enum, got {other:?}"),
        }
    }

    #[test]
    fn enum_ordinals_saturate_at_the_integer_limit() {
        let (ast, messages) = resolve_one(
            "module Demo { enum Big { Max = 9223372036854775807; Next; } }",
        );
        assert!(messages.is_empty(), "{messages:?}");
        let module = ast.modules().next().unwrap();
        let big = ast.form_named(module, Symbol::intern("Big")).unwrap();
        match &ast.form(big).kind {
            FormKind::Enum(data) => {
                assert_eq!(data.members[0].ordinal, i64::MAX);
                assert_eq!(data.members[1].ordinal, i64::MAX);
            }
            other => panic!("expected an enum, got {other:?}"),
        }
    }

    #[test]
    fn flags_require_an_enum_argument() {
        let (_, messages) = resolve_one(
            "module Demo {
                record Point { int X; }
                record Holder { flags<Point> F; }
            }",
        );
        assert!(matches!(
            &messages[0],
            Message::Resolve(ResolveMessage::NotAnEnum { .. })
        ));
    }

    #[test]
    fn enum_defaults_resolve_to_members() {
        let (ast, messages) = resolve_one(
            "module Demo {
                enum Color { Red; Green; }
                record Pixel { Color C = Color.Green; Color D = Red; }
            }",
        );
        assert!(messages.is_empty(), "{messages:?}");
        let module = ast.modules().next().unwrap();
        let color = ast.form_named(module, Symbol::intern("Color")).unwrap();
        let pixel = ast.form_named(module, Symbol::intern("Pixel")).unwrap();
        match &ast.form(pixel).kind {
            FormKind::Struct(data) => {
                assert_eq!(data.fields[0].default, Some(Value::EnumMember(color, 1)));
                assert_eq!(data.fields[1].default, Some(Value::EnumMember(color, 0)));
            }
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_defaults_are_reported() {
        let (_, messages) = resolve_one(
            r#"module Demo { record R { int X = "text"; } }"#,
        );
        assert!(matches!(
            &messages[0],
            Message::Resolve(ResolveMessage::DefaultTypeMismatch { .. })
        ));
    }

    #[test]
    fn duplicate_forms_and_fields() {
        let (_, messages) = resolve_one(
            "module Demo {
                record Point { int X; int X; }
                record Point { int Y; }
            }",
        );
        let mut kinds: Vec<&str> = messages
            .iter()
            .map(|message| match message {
                Message::Resolve(ResolveMessage::ItemRedefinition { .. }) => "item",
                Message::Resolve(ResolveMessage::FieldRedeclaration { .. }) => "field",
                other => panic!("unexpected message: {other:?}"),
            })
            .collect();
        kinds.sort();
        assert_eq!(kinds, ["field", "item"]);
    }

    #[test]
    fn tag_checks() {
        let (_, messages) = resolve_one(
            "module Demo {
                enum Kind { A; }
                variant NoTag { int X; }
                record Plain { tag Kind K; }
            }",
        );
        assert!(messages.iter().any(|message| matches!(
            message,
            Message::Resolve(ResolveMessage::MissingTag { .. })
        )));
        assert!(messages.iter().any(|message| matches!(
            message,
            Message::Resolve(ResolveMessage::TagOutsideVariant { .. })
        )));
    }

    #[test]
    fn inherited_tag_satisfies_the_variant() {
        let (_, messages) = resolve_one(
            "module Demo {
                enum Kind { A; }
                variant Base { tag Kind K; }
                variant Child : Base { int X; }
            }",
        );
        assert!(messages.is_empty(), "{messages:?}");
    }

    #[test]
    fn nearest_attribute_declaration_wins() {
        let (ast, messages) = resolve_one(
            r#"[* enabled=true]
            module Demo {
                [* enabled=false]
                record Off { int X; }
                record On { int Y; }
            }"#,
        );
        assert!(messages.is_empty(), "{messages:?}");
        let module = ast.modules().next().unwrap();
        let off = ast.form_named(module, Symbol::intern("Off")).unwrap();
        let on = ast.form_named(module, Symbol::intern("On")).unwrap();
        assert!(!ast.bool_attribute(off, &attr::core::ENABLED, true));
        assert!(ast.bool_attribute(on, &attr::core::ENABLED, true));
    }

    #[test]
    fn field_attributes_inherit_through_the_scope_chain() {
        let (ast, messages) = resolve_one(
            r#"module Demo {
                [* enabled=false]
                record Point {
                    int X;
                    [* enabled=true]
                    int Y;
                }
            }"#,
        );
        assert!(messages.is_empty(), "{messages:?}");
        let module = ast.modules().next().unwrap();
        let point = ast.form_named(module, Symbol::intern("Point")).unwrap();
        let fields = match &ast.form(point).kind {
            FormKind::Struct(data) => &data.fields,
            other => panic!("expected a record, got {other:?}"),
        };
        let enabled = |field| {
            ast.field_attribute(point, field, &attr::core::ENABLED)
                .and_then(attr::AttributeValue::as_bool)
        };
        // X falls back to the form, Y declares its own value
        assert_eq!(enabled(&fields[0]), Some(false));
        assert_eq!(enabled(&fields[1]), Some(true));
    }

    #[test]
    fn format_gating_follows_the_ancestor_chain() {
        let (ast, messages) = resolve_one(
            r#"module Demo {
                [* json.enabled=false]
                record Secret { binary Blob; }
                record Derived : Secret { int X; }
                record Report { Secret S; }
            }"#,
        );
        assert_eq!(codes(&messages), ["EFormatDisabled"]);
        let module = ast.modules().next().unwrap();
        let derived = ast.form_named(module, Symbol::intern("Derived")).unwrap();
        // Type-inherited: the derived record is json-disabled too
        assert!(!ast.format_enabled(derived, &attr::core::JSON_ENABLED));
    }

    #[test]
    fn attribute_validation() {
        let (_, messages) = resolve_one(
            r#"module Demo {
                [* enabld=false]
                record A { int X; }
                [* json.enabled=3]
                record B { int Y; }
                record C { [* json.enabled=false] int Z; }
                [csharp namespace="Kept.For.Backends"]
                record D { int W; }
            }"#,
        );
        let codes = codes(&messages);
        assert!(codes.contains(&"EUnknownAttribute".to_owned()));
        assert!(codes.contains(&"EAttributeType".to_owned()));
        assert!(codes.contains(&"EAttributeTarget".to_owned()));
        assert_eq!(codes.len(), 3);
        match &messages[0] {
            Message::Resolve(ResolveMessage::UnknownAttribute { suggestion, .. }) => {
                assert_eq!(*suggestion, Some("enabled"));
            }
            other => panic!("expected an unknown attribute, got {other:?}"),
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let source = "module Demo {
            enum Color { Red; Green; Blue; }
            record Point { int X; Color C; }
        }";
        let (first, _) = resolve_one(source);
        let (second, _) = resolve_one(source);
        assert_eq!(format!("{first:?}"), format!("{second:?}"));
    }
}
