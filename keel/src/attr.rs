//! The attribute system.
//!
//! Attributes are named, typed, optionally-inherited metadata values written
//! in brackets before a declaration: `[csharp namespace="Demo" sealed]`,
//! `[* enabled=false]`. Each recognized key is described by an
//! [`AttributeDescriptor`] owned by a backend target (or by the compiler
//! itself, under the `core` target name). The process-wide descriptor
//! registry is built once at startup and read-only afterwards.
//!
//! Values are parsed eagerly into [`AttributeValue`]s at declaration time;
//! descriptor-driven kind checks happen in one validation pass during
//! resolution.

use std::fmt;

use once_cell::sync::Lazy;

use crate::source::FileRange;
use crate::symbol::Symbol;

/// The kind of declaration an attribute instance is attached to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HostKind {
    Module,
    Enum,
    Record,
    Variant,
    Interface,
    Union,
    Define,
    Table,
    Service,
    WebService,
    Field,
    EnumField,
    UnionClause,
    Function,
    Resource,
}

impl HostKind {
    const fn bit(self) -> u16 {
        1 << self as u16
    }

    pub fn description(self) -> &'static str {
        match self {
            HostKind::Module => "module",
            HostKind::Enum => "enum",
            HostKind::Record => "record",
            HostKind::Variant => "variant",
            HostKind::Interface => "interface",
            HostKind::Union => "union",
            HostKind::Define => "define",
            HostKind::Table => "table",
            HostKind::Service => "service",
            HostKind::WebService => "webservice",
            HostKind::Field => "field",
            HostKind::EnumField => "enum field",
            HostKind::UnionClause => "union clause",
            HostKind::Function => "service function",
            HostKind::Resource => "webservice resource",
        }
    }
}

/// A set of [`HostKind`]s an attribute may be attached to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HostKinds(u16);

impl HostKinds {
    pub const fn of(kinds: &[HostKind]) -> Self {
        let mut bits = 0;
        let mut index = 0;
        while index < kinds.len() {
            bits |= kinds[index].bit();
            index += 1;
        }
        Self(bits)
    }

    pub const ALL: Self = Self(u16::MAX);

    /// All form-level hosts that denote value types.
    pub const TYPE_FORMS: Self = Self::of(&[
        HostKind::Enum,
        HostKind::Record,
        HostKind::Variant,
        HostKind::Interface,
        HostKind::Union,
        HostKind::Define,
    ]);

    pub const fn contains(self, kind: HostKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

/// How an attribute value propagates when it is not declared locally.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Inherit {
    /// No inheritance: local instance or the default.
    None,
    /// Walk the lexical containment chain: field → form → module.
    Scope,
    /// Walk the declared-ancestor chain of a record or variant.
    Type,
}

/// The value kind a descriptor expects.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    String,
    /// A bare identifier drawn from a fixed set of alternatives.
    Enum(&'static [&'static str]),
    Json,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bool => f.write_str("bool"),
            ValueKind::Int => f.write_str("integer"),
            ValueKind::String => f.write_str("string"),
            ValueKind::Enum(alternatives) => {
                write!(f, "one of {}", alternatives.join(", "))
            }
            ValueKind::Json => f.write_str("json"),
        }
    }
}

/// An attribute value, parsed once at declaration time.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    String(Symbol),
    /// A bare identifier, e.g. `[erlang codec=manual]`.
    Ident(Symbol),
    Json(serde_json::Value),
}

impl AttributeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<Symbol> {
        match self {
            AttributeValue::String(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<Symbol> {
        match self {
            AttributeValue::Ident(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            AttributeValue::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Int(_) => "integer",
            AttributeValue::String(_) => "string",
            AttributeValue::Ident(_) => "identifier",
            AttributeValue::Json(_) => "json",
        }
    }

    /// Check this value against the kind a descriptor expects.
    pub fn matches_kind(&self, kind: ValueKind) -> bool {
        match (self, kind) {
            (AttributeValue::Bool(_), ValueKind::Bool) => true,
            (AttributeValue::Int(_), ValueKind::Int) => true,
            (AttributeValue::String(_), ValueKind::String) => true,
            (AttributeValue::Ident(name), ValueKind::Enum(alternatives)) => {
                alternatives.iter().any(|alt| *alt == name.resolve())
            }
            (AttributeValue::Json(_), ValueKind::Json) => true,
            (_, _) => false,
        }
    }
}

/// Describes one recognized attribute key.
#[derive(Debug)]
pub struct AttributeDescriptor {
    /// Name of the target this key belongs to (`core` for built-ins).
    pub target: &'static str,
    pub name: &'static str,
    pub hosts: HostKinds,
    pub inherit: Inherit,
    pub kind: ValueKind,
}

/// The target selector written before an attribute name.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttrSelector {
    /// `[* name]` — applies to every target that knows the key.
    Any,
    /// `[csharp name]` — applies to one named target.
    Target(Symbol),
}

/// One attribute occurrence attached to a declaration.
#[derive(Debug, Clone)]
pub struct AttrInstance {
    pub range: FileRange,
    pub selector: AttrSelector,
    pub name: Symbol,
    pub value: AttributeValue,
}

impl AttrInstance {
    /// Whether this instance supplies a value for `descriptor`.
    pub fn matches(&self, descriptor: &AttributeDescriptor) -> bool {
        self.name.resolve() == descriptor.name
            && match self.selector {
                AttrSelector::Any => true,
                AttrSelector::Target(target) => target.resolve() == descriptor.target,
            }
    }
}

/// Find the value a local attribute list supplies for `descriptor`, if any.
pub fn find_local<'a>(
    instances: &'a [AttrInstance],
    descriptor: &AttributeDescriptor,
) -> Option<&'a AttributeValue> {
    instances
        .iter()
        .find(|instance| instance.matches(descriptor))
        .map(|instance| &instance.value)
}

/// Built-in attributes owned by the compiler itself.
pub mod core {
    use super::*;

    /// Whether a declaration participates in compilation at all.
    pub static ENABLED: AttributeDescriptor = AttributeDescriptor {
        target: "core",
        name: "enabled",
        hosts: HostKinds::ALL,
        inherit: Inherit::Scope,
        kind: ValueKind::Bool,
    };

    /// Whether a type form supports the json serialization format.
    pub static JSON_ENABLED: AttributeDescriptor = AttributeDescriptor {
        target: "core",
        name: "json.enabled",
        hosts: HostKinds::TYPE_FORMS,
        inherit: Inherit::Type,
        kind: ValueKind::Bool,
    };

    /// Whether a type form supports the binary serialization format.
    pub static BINARY_ENABLED: AttributeDescriptor = AttributeDescriptor {
        target: "core",
        name: "binary.enabled",
        hosts: HostKinds::TYPE_FORMS,
        inherit: Inherit::Type,
        kind: ValueKind::Bool,
    };

    /// Marks a table field as part of the primary key.
    pub static KEY: AttributeDescriptor = AttributeDescriptor {
        target: "core",
        name: "key",
        hosts: HostKinds::of(&[HostKind::Field]),
        inherit: Inherit::None,
        kind: ValueKind::Bool,
    };

    pub static ALL: &[&AttributeDescriptor] = &[&ENABLED, &JSON_ENABLED, &BINARY_ENABLED, &KEY];
}

/// The process-wide descriptor registry: the core set plus every key
/// registered by a backend target. Built once, never mutated.
pub fn registry() -> &'static [&'static AttributeDescriptor] {
    static REGISTRY: Lazy<Vec<&'static AttributeDescriptor>> = Lazy::new(|| {
        let mut descriptors = Vec::from(core::ALL);
        for target in crate::target::targets() {
            descriptors.extend_from_slice(target.attributes());
        }
        descriptors
    });
    &REGISTRY
}

/// Look up the descriptor an attribute instance refers to.
///
/// A `*` selector matches any target that registers the key; a named
/// selector only matches that target's descriptor.
pub fn lookup(
    selector: AttrSelector,
    name: Symbol,
) -> Option<&'static AttributeDescriptor> {
    registry().iter().copied().find(|descriptor| {
        descriptor.name == name.resolve()
            && match selector {
                AttrSelector::Any => true,
                AttrSelector::Target(target) => target.resolve() == descriptor.target,
            }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileId;
    use crate::source::ByteRange;

    fn instance(selector: AttrSelector, name: &str, value: AttributeValue) -> AttrInstance {
        AttrInstance {
            range: FileRange::new(
                FileId::try_from(1).unwrap(),
                ByteRange::new(0, 0),
            ),
            selector,
            name: Symbol::intern(name),
            value,
        }
    }

    #[test]
    fn host_kind_sets() {
        assert!(HostKinds::TYPE_FORMS.contains(HostKind::Record));
        assert!(!HostKinds::TYPE_FORMS.contains(HostKind::Service));
        assert!(HostKinds::ALL.contains(HostKind::Resource));
    }

    #[test]
    fn star_selector_matches_core_keys() {
        let attr = instance(AttrSelector::Any, "enabled", AttributeValue::Bool(false));
        assert!(attr.matches(&core::ENABLED));
        assert_eq!(
            find_local(&[attr], &core::ENABLED),
            Some(&AttributeValue::Bool(false))
        );
    }

    #[test]
    fn named_selector_must_match_target() {
        let attr = instance(
            AttrSelector::Target(Symbol::intern("csharp")),
            "enabled",
            AttributeValue::Bool(false),
        );
        assert!(!attr.matches(&core::ENABLED));
        assert_eq!(find_local(&[attr], &core::ENABLED), None);
    }

    #[test]
    fn kind_checks() {
        assert!(AttributeValue::Bool(true).matches_kind(ValueKind::Bool));
        assert!(!AttributeValue::Int(3).matches_kind(ValueKind::Bool));
        assert!(AttributeValue::Ident(Symbol::intern("manual"))
            .matches_kind(ValueKind::Enum(&["auto", "manual"])));
        assert!(!AttributeValue::Ident(Symbol::intern("bogus"))
            .matches_kind(ValueKind::Enum(&["auto", "manual"])));
        assert!(AttributeValue::Json(serde_json::json!({"a": 1})).matches_kind(ValueKind::Json));
    }

    #[test]
    fn registry_resolves_core_and_target_keys() {
        assert!(lookup(AttrSelector::Any, Symbol::intern("enabled")).is_some());
        assert!(lookup(AttrSelector::Any, Symbol::intern("nonsense")).is_none());
        // the built-in schema target registers `width`
        assert!(lookup(
            AttrSelector::Target(Symbol::intern("schema")),
            Symbol::intern("width")
        )
        .is_some());
    }
}
