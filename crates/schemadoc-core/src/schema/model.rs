//! The merged schema data model.
//!
//! Schema fragments are open-world JSON trees; a fragment may carry fields
//! this tool has never heard of and the merge rules must still apply. The
//! model therefore wraps `serde_json` maps with typed accessors instead of
//! closing the field set with structs.

use std::collections::BTreeMap;

use serde_json::Value;

/// A JSON object, as parsed from a schema fragment.
pub type JsonMap = serde_json::Map<String, Value>;

/// File stems whose `types` lists populate the global type map instead of
/// per-namespace types.
pub const GLOBAL_SOURCE_STEMS: [&str; 5] =
    ["manifest", "extension_types", "types", "events", "experiments"];

/// The namespace name used by manifest sub-fragments.
pub const MANIFEST_NAMESPACE: &str = "manifest";

/// Namespace prefixes of global types. References under these prefixes get
/// re-anchored into the page that embeds them.
pub const GLOBAL_TYPE_PREFIXES: [&str; 2] = ["manifest", "extensionTypes"];

/// Whether `name` is a global holding namespace rather than a documented
/// API surface. Global namespaces contribute types to other pages and do
/// not get pages of their own.
#[must_use]
pub fn is_global_namespace(name: &str) -> bool {
    GLOBAL_SOURCE_STEMS.contains(&name)
        || GLOBAL_TYPE_PREFIXES.contains(&name)
        || name == MANIFEST_NAMESPACE
}

/// One namespace-entry-shaped object from a schema fragment, or the merged
/// authoritative entry after merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceEntry {
    fields: JsonMap,
}

impl NamespaceEntry {
    /// Wrap a raw fragment object. Returns `None` when the object carries
    /// no `namespace` field.
    pub fn from_map(fields: JsonMap) -> Option<Self> {
        fields.get("namespace").and_then(Value::as_str)?;
        Some(Self { fields })
    }

    /// The namespace name.
    pub fn name(&self) -> &str {
        self.fields
            .get("namespace")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Whether this entry is a manifest sub-fragment.
    pub fn is_manifest(&self) -> bool {
        self.name() == MANIFEST_NAMESPACE
    }

    /// The namespace description, if any.
    pub fn description(&self) -> Option<&str> {
        self.fields.get("description").and_then(Value::as_str)
    }

    /// Declared types, in declaration order.
    pub fn types(&self) -> &[Value] {
        self.array_field("types")
    }

    /// Declared functions, in declaration order.
    pub fn functions(&self) -> &[Value] {
        self.array_field("functions")
    }

    /// Declared events, in declaration order.
    pub fn events(&self) -> &[Value] {
        self.array_field("events")
    }

    /// Namespace-level properties (`name` → property definition).
    pub fn properties(&self) -> Option<&JsonMap> {
        self.fields.get("properties").and_then(Value::as_object)
    }

    /// Namespace-level permission strings.
    pub fn permissions(&self) -> Vec<&str> {
        self.array_field("permissions")
            .iter()
            .filter_map(Value::as_str)
            .collect()
    }

    /// Look up a declared type by its `id`.
    pub fn type_by_id(&self, id: &str) -> Option<&Value> {
        self.types()
            .iter()
            .find(|t| t.get("id").and_then(Value::as_str) == Some(id))
    }

    /// The raw field map.
    pub fn fields(&self) -> &JsonMap {
        &self.fields
    }

    /// The raw field map, mutably. Used by the merge engine only.
    pub(crate) fn fields_mut(&mut self) -> &mut JsonMap {
        &mut self.fields
    }

    fn array_field(&self, key: &str) -> &[Value] {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }
}

/// One parsed schema source file: an ordered list of namespace-entry
/// objects.
#[derive(Debug, Clone)]
pub struct SchemaFile {
    /// The file stem, e.g. `"mail"` for `mail.json`. Designated stems mark
    /// global type sources.
    pub stem: String,
    /// Entries in file order.
    pub entries: Vec<NamespaceEntry>,
}

impl SchemaFile {
    /// Whether this file's declared types populate the global type map.
    pub fn is_global_source(&self) -> bool {
        GLOBAL_SOURCE_STEMS.contains(&self.stem.as_str())
    }
}

/// Everything the merge phase produces, consumed read-only by rendering.
#[derive(Debug, Default)]
pub struct SchemaBundle {
    /// One authoritative entry per namespace name (manifest excluded).
    pub namespaces: BTreeMap<String, NamespaceEntry>,

    /// The shared manifest model, merged from every fragment's manifest
    /// sub-fragment.
    pub manifest: Option<NamespaceEntry>,

    /// Per-namespace local manifest entries: the manifest sub-fragments of
    /// exactly the source files that declared the namespace.
    pub local_manifests: BTreeMap<String, NamespaceEntry>,

    /// Global types, keyed `"namespace.id"`.
    pub global_types: BTreeMap<String, Value>,

    /// Namespaces originating from the same source file, keyed by
    /// namespace name. Used for reference disambiguation.
    pub related: BTreeMap<String, Vec<String>>,
}

impl SchemaBundle {
    /// All known namespace names, including dotted sub-namespaces.
    pub fn known_namespaces(&self) -> Vec<&str> {
        self.namespaces.keys().map(String::as_str).collect()
    }

    /// Related namespaces of `namespace`, excluding itself.
    pub fn related_of(&self, namespace: &str) -> &[String] {
        self.related
            .get(namespace)
            .map_or(&[], Vec::as_slice)
    }

    /// Look up a global type by its qualified key.
    pub fn global_type(&self, key: &str) -> Option<&Value> {
        self.global_types.get(key)
    }

    /// Look up a type declared locally in `namespace`.
    pub fn local_type(&self, namespace: &str, id: &str) -> Option<&Value> {
        self.namespaces.get(namespace)?.type_by_id(id)
    }
}
