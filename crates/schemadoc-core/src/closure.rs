//! Type-closure collection.
//!
//! Starting from the directly-referenced types recorded while rendering a
//! namespace's functions, events, properties and manifest extensions, the
//! collector discovers every transitively-referenced type the page must
//! embed. It repeatedly scans the used-types set for keys without a
//! definition, resolves them, and feeds each resolved definition's own
//! references back into the set until a full pass adds nothing.
//!
//! Termination: the set only grows, and every expansion step either
//! resolves a key into the finite universe of declared types or parks it
//! as missing; missing keys are never re-expanded, so invented ids cannot
//! cycle.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde_json::Value;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::resolve::{RefResolver, RenderContext, REF_MENTION_PATTERN};
use crate::schema::{SchemaBundle, GLOBAL_TYPE_PREFIXES, MANIFEST_NAMESPACE};

/// Collects the transitive closure of types used by one page.
pub struct ClosureCollector {
    resolved: BTreeMap<String, Value>,
    missing: BTreeSet<String>,
    ref_mention: Regex,
}

impl Default for ClosureCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ClosureCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self {
            resolved: BTreeMap::new(),
            missing: BTreeSet::new(),
            ref_mention: Regex::new(REF_MENTION_PATTERN).expect("valid ref pattern"),
        }
    }

    /// Run to the fixed point over the seeded used-types set in `ctx`.
    pub fn collect(
        &mut self,
        bundle: &SchemaBundle,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) {
        loop {
            let pending: Vec<String> = ctx
                .used_types
                .iter()
                .filter(|key| !self.resolved.contains_key(*key) && !self.missing.contains(*key))
                .cloned()
                .collect();

            if pending.is_empty() {
                break;
            }

            for key in pending {
                match lookup_definition(bundle, &key) {
                    Some(definition) => {
                        self.expand(&definition, resolver, ctx, diag);
                        self.resolved.insert(key, definition);
                    }
                    None => {
                        self.missing.insert(key);
                    }
                }
            }
        }
    }

    /// Definitions resolved so far, keyed by canonical reference.
    pub fn resolved(&self) -> &BTreeMap<String, Value> {
        &self.resolved
    }

    /// Final report-only pass: emit a diagnostic for every tracked key
    /// that resolved to nothing and belongs to the page namespace (the
    /// local-looking best guesses).
    pub fn report_missing(&self, namespace: &str, diag: &mut Diagnostics) {
        let local_prefix = format!("{namespace}.");
        for key in &self.missing {
            if let Some(id) = key.strip_prefix(&local_prefix) {
                diag.report(Diagnostic::MissingType {
                    namespace: namespace.to_string(),
                    id: id.to_string(),
                });
            }
        }
    }

    /// Feed a definition's own references into the used-types set:
    /// `$ref` fields anywhere in the tree, plus `$(ref:...)` mentions in
    /// description strings.
    fn expand(
        &self,
        definition: &Value,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) {
        match definition {
            Value::Object(map) => {
                for (key, value) in map {
                    match (key.as_str(), value) {
                        ("$ref", Value::String(reference)) => {
                            resolver.resolve(reference, ctx, diag);
                        }
                        ("description", Value::String(text)) => {
                            for capture in self.ref_mention.captures_iter(text) {
                                resolver.resolve(&capture[1], ctx, diag);
                            }
                        }
                        _ => self.expand(value, resolver, ctx, diag),
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.expand(item, resolver, ctx, diag);
                }
            }
            _ => {}
        }
    }
}

/// Resolve a canonical key into a definition: global type map, then the
/// local namespace type list, then the manifest type list, then a last
/// chance under the conventional global prefixes.
fn lookup_definition(bundle: &SchemaBundle, key: &str) -> Option<Value> {
    if let Some(definition) = bundle.global_type(key) {
        return Some(definition.clone());
    }

    if let Some((namespace, id)) = split_known(bundle, key) {
        if let Some(definition) = bundle.local_type(&namespace, &id) {
            return Some(definition.clone());
        }

        if let Some(manifest) = &bundle.manifest {
            if let Some(definition) = manifest.type_by_id(&id) {
                return Some(definition.clone());
            }
        }

        for prefix in GLOBAL_TYPE_PREFIXES {
            if let Some(definition) = bundle.global_type(&format!("{prefix}.{id}")) {
                return Some(definition.clone());
            }
        }
    }

    None
}

/// Split a canonical key at its longest known namespace prefix, falling
/// back to the last dot.
fn split_known(bundle: &SchemaBundle, key: &str) -> Option<(String, String)> {
    let mut best: Option<&str> = None;
    for name in bundle
        .namespaces
        .keys()
        .map(String::as_str)
        .chain([MANIFEST_NAMESPACE])
        .chain(GLOBAL_TYPE_PREFIXES)
    {
        if key.len() > name.len()
            && key.starts_with(name)
            && key.as_bytes()[name.len()] == b'.'
            && best.map_or(true, |b| name.len() > b.len())
        {
            best = Some(name);
        }
    }

    match best {
        Some(name) => Some((name.to_string(), key[name.len() + 1..].to_string())),
        None => key
            .rsplit_once('.')
            .map(|(ns, id)| (ns.to_string(), id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{build_bundle, NamespaceEntry, SchemaFile};
    use serde_json::json;

    fn entry(value: Value) -> NamespaceEntry {
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        NamespaceEntry::from_map(map).expect("entry with namespace")
    }

    fn bundle() -> SchemaBundle {
        let mut diag = Diagnostics::default();
        build_bundle(
            &[
                SchemaFile {
                    stem: "mail".to_string(),
                    entries: vec![entry(json!({
                        "namespace": "mail",
                        "types": [
                            {
                                "id": "Folder",
                                "type": "object",
                                "properties": {
                                    "parent": { "$ref": "Folder", "optional": true },
                                    "owner": { "$ref": "Account" }
                                }
                            },
                            {
                                "id": "Account",
                                "type": "object",
                                "description": "See $(ref:Quota) for limits."
                            },
                            { "id": "Quota", "type": "object" }
                        ]
                    }))],
                },
                SchemaFile {
                    stem: "extension_types".to_string(),
                    entries: vec![entry(json!({
                        "namespace": "extensionTypes",
                        "types": [{ "id": "Details", "type": "object" }]
                    }))],
                },
            ],
            &mut diag,
        )
    }

    #[test]
    fn test_transitive_closure() {
        let bundle = bundle();
        let resolver = RefResolver::new(&bundle, "mail");
        let mut ctx = RenderContext::default();
        let mut diag = Diagnostics::default();

        // Seed with the directly-referenced type only.
        resolver.resolve("Folder", &mut ctx, &mut diag);

        let mut collector = ClosureCollector::new();
        collector.collect(&bundle, &resolver, &mut ctx, &mut diag);

        // Folder pulls Account via $ref, Account pulls Quota via a
        // description mention.
        let keys: Vec<&str> = collector.resolved().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["mail.Account", "mail.Folder", "mail.Quota"]);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_fixed_point_is_stable() {
        let bundle = bundle();
        let resolver = RefResolver::new(&bundle, "mail");
        let mut ctx = RenderContext::default();
        let mut diag = Diagnostics::default();
        resolver.resolve("Folder", &mut ctx, &mut diag);

        let mut collector = ClosureCollector::new();
        collector.collect(&bundle, &resolver, &mut ctx, &mut diag);
        let first: Vec<String> = collector.resolved().keys().cloned().collect();
        let tracked_after_first = ctx.used_types.clone();

        // Running again over the same seed changes nothing.
        collector.collect(&bundle, &resolver, &mut ctx, &mut diag);
        let second: Vec<String> = collector.resolved().keys().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(tracked_after_first, ctx.used_types);
    }

    #[test]
    fn test_missing_local_type_is_reported() {
        let bundle = bundle();
        let resolver = RefResolver::new(&bundle, "mail");
        let mut ctx = RenderContext::default();
        let mut diag = Diagnostics::default();

        // Defaults locally (with an ambiguity advisory), then fails to
        // resolve into a definition.
        resolver.resolve("Phantom", &mut ctx, &mut diag);

        let mut collector = ClosureCollector::new();
        collector.collect(&bundle, &resolver, &mut ctx, &mut diag);
        collector.report_missing("mail", &mut diag);

        assert!(diag.entries().iter().any(|d| matches!(
            d,
            Diagnostic::MissingType { namespace, id }
                if namespace == "mail" && id == "Phantom"
        )));
    }

    #[test]
    fn test_global_types_resolve_by_prefix() {
        let bundle = bundle();
        let resolver = RefResolver::new(&bundle, "mail");
        let mut ctx = RenderContext::default();
        let mut diag = Diagnostics::default();

        resolver.resolve("extensionTypes.Details", &mut ctx, &mut diag);

        let mut collector = ClosureCollector::new();
        collector.collect(&bundle, &resolver, &mut ctx, &mut diag);
        assert!(collector.resolved().contains_key("extensionTypes.Details"));
    }
}
