//! Schemadoc Core - WebExtension API schema documentation engine
//!
//! This crate provides the core functionality:
//! - Schema: loading, merge engine, and the merged bundle model
//! - Resolve: reference canonicalization against a page namespace
//! - Closure: transitive collection of the types a page embeds
//! - Render: RST synthesis of one page per namespace
//! - Permissions: locale-driven permission description table
//! - Template: conditional and placeholder text filters
//! - Diagnostics: advisory problem reporting

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema module - fragment loading, merging, and the bundle model
pub mod schema;

/// Reference resolution - canonical keys, anchors, and link markup
pub mod resolve;

/// Type closure - fixed-point collection of page-embedded types
pub mod closure;

/// Rendering module - annotations, inline markup, version tracking, writer
pub mod render;

/// Permission descriptions - locale parsing and lookup
pub mod permissions;

/// Template filters - condition blocks and placeholder substitution
pub mod template;

/// Advisory diagnostics collected across a run
pub mod diagnostics;

pub use closure::ClosureCollector;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use permissions::PermissionTable;
pub use render::{RenderedPage, Writer};
pub use resolve::{RefResolver, RenderContext};
pub use schema::{build_bundle, load_schema_dir, SchemaBundle, SchemaError, SchemaFile};
