//! Schema data model, loading and merge engine.

mod equal;
mod load;
mod merge;
mod model;
mod shape;

pub use equal::structurally_equal;
pub use load::{load_schema_dir, load_schema_file, SchemaError};
pub use merge::{build_bundle, extend_global_type, merge_entry};
pub use model::{
    is_global_namespace, JsonMap, NamespaceEntry, SchemaBundle, SchemaFile, GLOBAL_SOURCE_STEMS,
    GLOBAL_TYPE_PREFIXES, MANIFEST_NAMESPACE,
};
pub use shape::FieldShape;
