//! The built-in `schema` target.
//!
//! Renders the resolved declaration graph back to canonical schema text.
//! This is mainly intended for inspecting what the compiler resolved, and
//! it doubles as the reference [`Target`] implementation.

use pretty::RcDoc;

use crate::ast::{
    Ast, Direction, FieldData, FormId, FormKind, FunctionData, ModuleId, ParamData, PathSegment,
    ResourceData, ResponseData, StructKind, Value,
};
use crate::attr::{
    self, AttrInstance, AttrSelector, AttributeDescriptor, AttributeValue, HostKind, HostKinds,
    Inherit, ValueKind,
};
use crate::symbol::Symbol;
use crate::target::{Target, TargetFile};

const INDENT: isize = 4;

/// Render width for a module, in columns: `[schema width=120]`.
pub static WIDTH: AttributeDescriptor = AttributeDescriptor {
    target: "schema",
    name: "width",
    hosts: HostKinds::of(&[HostKind::Module]),
    inherit: Inherit::Scope,
    kind: ValueKind::Int,
};

pub struct SchemaTarget;

impl Target for SchemaTarget {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn attributes(&self) -> &'static [&'static AttributeDescriptor] {
        static ATTRS: &[&AttributeDescriptor] = &[&WIDTH];
        ATTRS
    }

    fn generate(&self, ast: &Ast, modules: &[ModuleId], emit_width: usize) -> Vec<TargetFile> {
        let pp = Context::new(ast);
        modules
            .iter()
            .filter(|id| {
                attr::find_local(&ast.module(**id).attributes, &attr::core::ENABLED)
                    .and_then(AttributeValue::as_bool)
                    .unwrap_or(true)
            })
            .map(|id| {
                let width = attr::find_local(&ast.module(*id).attributes, &WIDTH)
                    .and_then(AttributeValue::as_int)
                    .map(|width| width as usize)
                    .unwrap_or(emit_width);
                let doc = pp.module(*id);
                TargetFile {
                    path: format!("{}.keel", ast.module(*id).name),
                    content: format!("{}\n", doc.pretty(width)),
                }
            })
            .collect()
    }
}

pub struct Context<'ast> {
    ast: &'ast Ast,
}

impl<'ast> Context<'ast> {
    pub fn new(ast: &'ast Ast) -> Context<'ast> {
        Context { ast }
    }

    pub fn module(&self, id: ModuleId) -> RcDoc<'ast> {
        let module = self.ast.module(id);
        let forms = module.forms.iter().copied().filter(|form| {
            self.ast
                .bool_attribute(*form, &attr::core::ENABLED, true)
        });
        let body = RcDoc::intersperse(
            forms.map(|form| self.form(form)),
            RcDoc::hardline().append(RcDoc::hardline()),
        );

        self.annotation(&module.annotation)
            .append(self.attributes(&module.attributes))
            .append(RcDoc::text("module"))
            .append(RcDoc::space())
            .append(RcDoc::text(module.name.resolve()))
            .append(RcDoc::space())
            .append(RcDoc::text("{"))
            .append(RcDoc::hardline().append(body).nest(INDENT))
            .append(RcDoc::hardline())
            .append(RcDoc::text("}"))
    }

    fn annotation(&self, annotation: &'ast Option<Symbol>) -> RcDoc<'ast> {
        match annotation {
            None => RcDoc::nil(),
            Some(text) => RcDoc::concat(text.resolve().lines().map(|line| {
                RcDoc::text("# ")
                    .append(RcDoc::text(line.to_owned()))
                    .append(RcDoc::hardline())
            })),
        }
    }

    fn attributes(&self, instances: &'ast [AttrInstance]) -> RcDoc<'ast> {
        RcDoc::concat(instances.iter().map(|instance| {
            let selector = match &instance.selector {
                AttrSelector::Any => "*",
                AttrSelector::Target(target) => target.resolve(),
            };
            let value = match &instance.value {
                // a bare key means true
                AttributeValue::Bool(true) => RcDoc::nil(),
                value => RcDoc::text("=").append(self.attr_value(value)),
            };
            RcDoc::text("[")
                .append(RcDoc::text(selector))
                .append(RcDoc::space())
                .append(RcDoc::text(instance.name.resolve()))
                .append(value)
                .append(RcDoc::text("]"))
                .append(RcDoc::hardline())
        }))
    }

    fn attr_value(&self, value: &'ast AttributeValue) -> RcDoc<'ast> {
        match value {
            AttributeValue::Bool(value) => RcDoc::text(value.to_string()),
            AttributeValue::Int(value) => RcDoc::text(value.to_string()),
            AttributeValue::String(value) => RcDoc::text(quote(value.resolve())),
            AttributeValue::Ident(value) => RcDoc::text(value.resolve()),
            AttributeValue::Json(value) => {
                RcDoc::text(serde_json::to_string(value).unwrap_or_default())
            }
        }
    }

    fn form(&self, id: FormId) -> RcDoc<'ast> {
        let form = self.ast.form(id);
        let head = self
            .annotation(&form.annotation)
            .append(self.attributes(&form.attributes));
        match &form.kind {
            FormKind::Enum(data) => {
                let members = RcDoc::intersperse(
                    data.members.iter().map(|member| {
                        self.annotation(&member.annotation)
                            .append(self.attributes(&member.attributes))
                            .append(RcDoc::text(member.name.resolve()))
                            .append(RcDoc::text(" = "))
                            .append(RcDoc::text(member.ordinal.to_string()))
                            .append(RcDoc::text(";"))
                    }),
                    RcDoc::hardline(),
                );
                head.append(RcDoc::text("enum "))
                    .append(RcDoc::text(form.name.resolve()))
                    .append(RcDoc::text(" : "))
                    .append(RcDoc::text(data.base.keyword()))
                    .append(self.body(members, data.members.is_empty()))
            }
            FormKind::Struct(data) => {
                let keyword = match data.kind {
                    StructKind::Record => "record",
                    StructKind::Exception => "exception",
                    StructKind::Variant => "variant",
                    StructKind::Interface => "interface",
                };
                let mut header = RcDoc::text(keyword).append(RcDoc::space());
                if let Some(parent) = form.scope_parent {
                    header = header
                        .append(RcDoc::text(self.ast.form(parent).name.resolve()))
                        .append(RcDoc::text("."));
                }
                header = header
                    .append(RcDoc::text(form.name.resolve()))
                    .append(self.generics(&data.generics));
                // The enclosing variant is implicit in the qualified name.
                let listed = match form.scope_parent {
                    Some(_) => &data.inherits[1..],
                    None => &data.inherits[..],
                };
                if !listed.is_empty() {
                    header = header.append(RcDoc::text(" : ")).append(RcDoc::intersperse(
                        listed
                            .iter()
                            .map(|base| RcDoc::text(self.ast.type_name(base))),
                        RcDoc::text(", "),
                    ));
                }
                let fields = self.fields(&data.fields);
                head.append(header)
                    .append(self.body(fields, data.fields.is_empty()))
            }
            FormKind::Union(data) => {
                let clauses = RcDoc::intersperse(
                    data.clauses.iter().map(|clause| {
                        let ty = match &clause.ty {
                            None => RcDoc::nil(),
                            Some(ty) => {
                                RcDoc::text(": ").append(RcDoc::text(self.ast.type_name(ty)))
                            }
                        };
                        self.annotation(&clause.annotation)
                            .append(RcDoc::text(clause.name.resolve()))
                            .append(ty)
                            .append(RcDoc::text(";"))
                    }),
                    RcDoc::hardline(),
                );
                head.append(RcDoc::text("union "))
                    .append(RcDoc::text(form.name.resolve()))
                    .append(self.generics(&data.generics))
                    .append(self.body(clauses, data.clauses.is_empty()))
            }
            FormKind::Define(data) => head
                .append(RcDoc::text("define "))
                .append(RcDoc::text(form.name.resolve()))
                .append(self.generics(&data.generics))
                .append(RcDoc::space())
                .append(RcDoc::text(self.ast.type_name(&data.ty)))
                .append(RcDoc::text(";")),
            FormKind::Table(data) => {
                let fields = self.fields(&data.fields);
                head.append(RcDoc::text("table "))
                    .append(RcDoc::text(form.name.resolve()))
                    .append(self.body(fields, data.fields.is_empty()))
            }
            FormKind::Service(data) => {
                let functions = RcDoc::intersperse(
                    data.functions.iter().map(|function| self.function(function)),
                    RcDoc::hardline(),
                );
                head.append(RcDoc::text("service "))
                    .append(RcDoc::text(form.name.resolve()))
                    .append(self.body(functions, data.functions.is_empty()))
            }
            FormKind::WebService(data) => {
                let resources = RcDoc::intersperse(
                    data.resources.iter().map(|resource| self.resource(resource)),
                    RcDoc::hardline(),
                );
                head.append(RcDoc::text("webservice "))
                    .append(RcDoc::text(form.name.resolve()))
                    .append(self.body(resources, data.resources.is_empty()))
            }
        }
    }

    fn body(&self, content: RcDoc<'ast>, empty: bool) -> RcDoc<'ast> {
        if empty {
            return RcDoc::text(" {}");
        }
        RcDoc::text(" {")
            .append(RcDoc::hardline().append(content).nest(INDENT))
            .append(RcDoc::hardline())
            .append(RcDoc::text("}"))
    }

    fn generics(&self, generics: &'ast [Symbol]) -> RcDoc<'ast> {
        if generics.is_empty() {
            return RcDoc::nil();
        }
        RcDoc::text("<")
            .append(RcDoc::intersperse(
                generics.iter().map(|name| RcDoc::text(name.resolve())),
                RcDoc::text(", "),
            ))
            .append(RcDoc::text(">"))
    }

    fn fields(&self, fields: &'ast [FieldData]) -> RcDoc<'ast> {
        RcDoc::intersperse(
            fields.iter().map(|field| {
                let tag = if field.is_tag {
                    RcDoc::text("tag ")
                } else {
                    RcDoc::nil()
                };
                let default = match &field.default {
                    None => RcDoc::nil(),
                    Some(value) => RcDoc::text(" = ").append(self.value(value)),
                };
                self.annotation(&field.annotation)
                    .append(self.attributes(&field.attributes))
                    .append(tag)
                    .append(RcDoc::text(self.ast.type_name(&field.ty)))
                    .append(RcDoc::space())
                    .append(RcDoc::text(field.name.resolve()))
                    .append(default)
                    .append(RcDoc::text(";"))
            }),
            RcDoc::hardline(),
        )
    }

    fn function(&self, function: &'ast FunctionData) -> RcDoc<'ast> {
        let direction = match function.direction {
            Direction::ClientToServer => "c->s",
            Direction::ServerToClient => "s->c",
        };
        let mut doc = self
            .annotation(&function.annotation)
            .append(RcDoc::text(direction))
            .append(RcDoc::space())
            .append(RcDoc::text(function.name.resolve()))
            .append(self.params(&function.args));
        if !function.returns.is_empty() {
            doc = doc
                .append(RcDoc::text(" returns "))
                .append(self.params(&function.returns));
        }
        if !function.throws.is_empty() {
            doc = doc.append(RcDoc::text(" throws ")).append(RcDoc::intersperse(
                function
                    .throws
                    .iter()
                    .map(|ty| RcDoc::text(self.ast.type_name(ty))),
                RcDoc::text(", "),
            ));
        }
        doc.append(RcDoc::text(";"))
    }

    fn params(&self, params: &'ast [ParamData]) -> RcDoc<'ast> {
        RcDoc::text("(")
            .append(RcDoc::intersperse(
                params.iter().map(|param| {
                    RcDoc::text(self.ast.type_name(&param.ty))
                        .append(RcDoc::space())
                        .append(RcDoc::text(param.name.resolve()))
                }),
                RcDoc::text(", "),
            ))
            .append(RcDoc::text(")"))
    }

    fn resource(&self, resource: &'ast ResourceData) -> RcDoc<'ast> {
        let mut doc = self
            .annotation(&resource.annotation)
            .append(self.attributes(&resource.attributes))
            .append(RcDoc::text(resource.name.resolve()))
            .append(RcDoc::text(" => "))
            .append(RcDoc::text(resource.verb.resolve()))
            .append(RcDoc::space());
        for segment in &resource.path {
            doc = doc.append(RcDoc::text("/")).append(match segment {
                PathSegment::Literal(text) => RcDoc::text(text.resolve()),
                PathSegment::Param { name, ty } => RcDoc::text("{")
                    .append(RcDoc::text(name.resolve()))
                    .append(RcDoc::text(":"))
                    .append(RcDoc::text(self.ast.type_name(ty)))
                    .append(RcDoc::text("}")),
            });
        }
        if let Some(alias) = &resource.content_as {
            doc = doc
                .append(RcDoc::text(" as "))
                .append(RcDoc::text(alias.resolve()));
        }
        match &resource.response {
            None => {}
            Some(ResponseData::Type(ty)) => {
                doc = doc
                    .append(RcDoc::text(" -> "))
                    .append(RcDoc::text(self.ast.type_name(ty)));
            }
            Some(ResponseData::Status { code, phrase }) => {
                doc = doc
                    .append(RcDoc::text(" -> "))
                    .append(RcDoc::text(code.to_string()))
                    .append(RcDoc::space())
                    .append(RcDoc::text(phrase.resolve()));
            }
        }
        doc.append(RcDoc::text(";"))
    }

    fn value(&self, value: &'ast Value) -> RcDoc<'ast> {
        match value {
            Value::Bool(value) => RcDoc::text(value.to_string()),
            Value::Int(value) => RcDoc::text(value.to_string()),
            Value::Float(value) if value.fract() == 0.0 && value.is_finite() => {
                RcDoc::text(format!("{value:.1}"))
            }
            Value::Float(value) => RcDoc::text(value.to_string()),
            Value::String(value) => RcDoc::text(quote(value.resolve())),
            Value::EnumMember(form, index) => {
                let name = self.member_name(*form, *index);
                RcDoc::text(self.ast.form(*form).name.resolve())
                    .append(RcDoc::text("."))
                    .append(RcDoc::text(name))
            }
            Value::List(items) => RcDoc::text("[")
                .append(RcDoc::intersperse(
                    items.iter().map(|item| self.value(item)),
                    RcDoc::text(", "),
                ))
                .append(RcDoc::text("]")),
            Value::Dict(pairs) if pairs.is_empty() => RcDoc::text("{}"),
            Value::Dict(pairs) => RcDoc::text("{")
                .append(RcDoc::intersperse(
                    pairs.iter().map(|(key, value)| {
                        self.value(key)
                            .append(RcDoc::text(": "))
                            .append(self.value(value))
                    }),
                    RcDoc::text(", "),
                ))
                .append(RcDoc::text("}")),
            Value::EmptyObject => RcDoc::text("{}"),
        }
    }

    fn member_name(&self, form: FormId, index: u32) -> &'ast str {
        match &self.ast.form(form).kind {
            FormKind::Enum(data) => data
                .members
                .get(index as usize)
                .map(|member| member.name.resolve())
                .unwrap_or("?"),
            _ => "?",
        }
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::resolve;
    use crate::files::FileId;
    use crate::surface;

    fn render(source: &str) -> Vec<TargetFile> {
        let file_id = FileId::try_from(1).unwrap();
        let (module, messages) = surface::Module::parse(file_id, source);
        assert!(messages.is_empty(), "syntax errors: {messages:?}");
        let (ast, messages) = resolve::resolve(&[module]);
        assert!(messages.is_empty(), "resolve errors: {messages:?}");
        let modules: Vec<_> = ast.modules().collect();
        SchemaTarget.generate(&ast, &modules, 80)
    }

    #[test]
    fn renders_canonical_schema_text() {
        let files = render(
            "module Demo {
                # Primary colors.
                enum Color { Red; Green; Blue; }
                record Point { int X; int Y = 7; }
            }",
        );
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "Demo.keel");
        let content = &files[0].content;
        assert!(content.starts_with("module Demo {"), "{content}");
        assert!(content.contains("# Primary colors."), "{content}");
        assert!(content.contains("enum Color : int {"), "{content}");
        assert!(content.contains("Red = 0;"), "{content}");
        assert!(content.contains("Blue = 2;"), "{content}");
        assert!(content.contains("record Point {"), "{content}");
        assert!(content.contains("int Y = 7;"), "{content}");
    }

    #[test]
    fn renders_generics_inherits_and_services() {
        let files = render(
            "module Demo {
                interface Named { string Name; }
                record Pair<A, B> : Named { A First; ?B Second; }
                service Calc { c->s Add(int A) returns (int Sum); }
                webservice W { Get => GET /items/{id:int} -> Pair<int, string>; }
            }",
        );
        let content = &files[0].content;
        assert!(content.contains("record Pair<A, B> : Named {"), "{content}");
        assert!(content.contains("?B Second;"), "{content}");
        assert!(
            content.contains("c->s Add(int A) returns (int Sum);"),
            "{content}"
        );
        assert!(
            content.contains("Get => GET /items/{id:int} -> Pair<int, string>;"),
            "{content}"
        );
    }

    #[test]
    fn qualified_children_render_without_the_implicit_ancestor() {
        let files = render(
            "module Demo {
                variant Shape { tag int Kind; }
                record Shape.Circle { float Radius; }
            }",
        );
        let content = &files[0].content;
        assert!(content.contains("record Shape.Circle {"), "{content}");
        assert!(!content.contains("Shape.Circle : "), "{content}");
    }

    #[test]
    fn disabled_forms_are_skipped() {
        let files = render(
            "module Demo {
                [* enabled=false]
                record Hidden { int X; }
                record Shown { int Y; }
            }",
        );
        let content = &files[0].content;
        assert!(!content.contains("Hidden"), "{content}");
        assert!(content.contains("record Shown {"), "{content}");
    }

    #[test]
    fn empty_output_is_flagged() {
        let file = TargetFile {
            path: "a".to_owned(),
            content: "  \n".to_owned(),
        };
        assert!(file.is_empty());
    }
}
