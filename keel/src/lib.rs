//! A compiler for the keel interface definition language.
//!
//! Schema sources are scanned and parsed into an untyped declaration tree
//! ([`surface`]), then resolved into a fully linked declaration graph
//! ([`ast`]) that backend [`target`]s walk to produce output files.

pub mod ast;
pub mod attr;
pub mod driver;
pub mod files;
pub mod reporting;
pub mod source;
pub mod surface;
pub mod symbol;
pub mod target;

pub use driver::{Driver, Status};

pub const BUG_REPORT_URL: &str = "https://github.com/keel-lang/keel/issues/new";
