//! Backend target dispatch.
//!
//! A [`Target`] consumes the resolved [`Ast`] and renders output files. The
//! registry is built once at startup and read-only afterwards; external
//! language backends plug in here, while the built-in `schema` target
//! renders canonical schema text.

use once_cell::sync::Lazy;

use crate::ast::{Ast, ModuleId};
use crate::attr::AttributeDescriptor;

pub mod schema;

/// One file of generated output.
#[derive(Debug)]
pub struct TargetFile {
    pub path: String,
    pub content: String,
}

impl TargetFile {
    /// Empty files are reported but not written.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// A named backend consuming resolved declarations.
///
/// The driver guarantees the [`Ast`] crossing this boundary resolved
/// without errors.
pub trait Target: Sync {
    fn name(&self) -> &'static str;

    /// Attribute keys this target contributes to the registry.
    fn attributes(&self) -> &'static [&'static AttributeDescriptor] {
        &[]
    }

    /// Render output for the given modules. `emit_width` is the render
    /// width to use when a module does not override it.
    fn generate(&self, ast: &Ast, modules: &[ModuleId], emit_width: usize) -> Vec<TargetFile>;
}

/// Every registered target, in presentation order.
pub fn targets() -> &'static [&'static dyn Target] {
    static TARGETS: Lazy<Vec<&'static dyn Target>> =
        Lazy::new(|| vec![&schema::SchemaTarget]);
    &TARGETS
}

/// Find a target by its registered name.
pub fn find(name: &str) -> Option<&'static dyn Target> {
    targets()
        .iter()
        .copied()
        .find(|target| target.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_target_is_registered() {
        assert!(find("schema").is_some());
        assert!(find("bogus").is_none());
    }
}
