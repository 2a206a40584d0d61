//! The schema merge engine.
//!
//! Combines per-file namespace fragments into one authoritative entry per
//! namespace, merges manifest sub-fragments into a shared manifest model,
//! and applies `$extend` merges against the global type map.
//!
//! Field-wise rules (see [`FieldShape`]): scalars are last-write-wins,
//! empty arrays are no-ops, primitive arrays merge as a deduplicated
//! union, object arrays append entries that are not structurally equal to
//! an existing one, objects merge recursively. During a `$extend` merge a
//! field literally named `choices` is merged member-wise by discriminant
//! (`enum` presence or `$ref` target) so a later fragment augments an
//! alternative instead of duplicating it.

use serde_json::Value;

use super::equal::structurally_equal;
use super::model::{JsonMap, NamespaceEntry, SchemaBundle, SchemaFile, GLOBAL_TYPE_PREFIXES};
use super::shape::FieldShape;
use crate::diagnostics::{Diagnostic, Diagnostics};

/// How a recursive merge treats union-choice lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeMode {
    /// Plain fragment merge: `choices` is an ordinary object array.
    Fragment,
    /// `$extend` merge: `choices` entries merge by discriminant.
    Extend,
}

/// Merge `incoming` into the map already held for its namespace, or insert
/// it verbatim. The fragment's manifest sub-fragment is handled by the
/// caller ([`build_bundle`]).
pub fn merge_entry(existing: &mut NamespaceEntry, incoming: &NamespaceEntry, diag: &mut Diagnostics) {
    let path = incoming.name().to_string();
    merge_maps(
        existing.fields_mut(),
        incoming.fields(),
        &path,
        MergeMode::Fragment,
        diag,
    );
}

/// Deep-merge `extension` (a type definition carrying `$extend`) into the
/// global type it names. Unexpected field shapes degrade to best-effort
/// overwrites plus a diagnostic; never fatal.
pub fn extend_global_type(
    target: &mut JsonMap,
    extension: &JsonMap,
    target_key: &str,
    diag: &mut Diagnostics,
) {
    for (key, value) in extension {
        if key == "$extend" {
            continue;
        }
        merge_field(target, key, value, target_key, MergeMode::Extend, diag);
    }
}

/// Build the merged bundle from parsed schema files, in file order.
///
/// Later fragments augment earlier ones; `$extend` types are collected
/// during the pass over all files and applied afterwards, so extension
/// fragments may precede the file declaring their target.
pub fn build_bundle(files: &[SchemaFile], diag: &mut Diagnostics) -> SchemaBundle {
    let mut bundle = SchemaBundle::default();
    // ($extend owner namespace, type definition)
    let mut extensions: Vec<(String, JsonMap)> = Vec::new();

    for file in files {
        let siblings: Vec<String> = file
            .entries
            .iter()
            .filter(|e| !e.is_manifest())
            .map(|e| e.name().to_string())
            .collect();

        for name in &siblings {
            let related = bundle.related.entry(name.clone()).or_default();
            for other in &siblings {
                if other != name && !related.contains(other) {
                    related.push(other.clone());
                }
            }
        }

        for entry in &file.entries {
            for type_def in entry.types() {
                let Some(map) = type_def.as_object() else {
                    continue;
                };
                if map.contains_key("$extend") {
                    extensions.push((entry.name().to_string(), map.clone()));
                } else if file.is_global_source() || entry.is_manifest() {
                    register_global_type(&mut bundle, entry.name(), map, diag);
                }
            }

            if entry.is_manifest() {
                merge_into_slot(&mut bundle.manifest, entry, diag);
                for name in &siblings {
                    let slot = bundle.local_manifests.entry(name.clone()).or_default();
                    if slot.fields().is_empty() {
                        *slot = entry.clone();
                    } else {
                        merge_entry(slot, entry, diag);
                    }
                }
            } else {
                // Global source files also declare real namespaces
                // (e.g. extensionTypes); keep them addressable.
                insert_namespace(&mut bundle, entry, diag);
            }
        }
    }

    for (namespace, extension) in extensions {
        apply_extension(&mut bundle, &namespace, &extension, diag);
    }

    bundle
}

fn insert_namespace(bundle: &mut SchemaBundle, entry: &NamespaceEntry, diag: &mut Diagnostics) {
    if let Some(existing) = bundle.namespaces.get_mut(entry.name()) {
        merge_entry(existing, entry, diag);
    } else {
        bundle.namespaces.insert(entry.name().to_string(), entry.clone());
    }
}

fn merge_into_slot(slot: &mut Option<NamespaceEntry>, entry: &NamespaceEntry, diag: &mut Diagnostics) {
    match slot {
        Some(existing) => merge_entry(existing, entry, diag),
        None => *slot = Some(entry.clone()),
    }
}

fn register_global_type(
    bundle: &mut SchemaBundle,
    namespace: &str,
    type_def: &JsonMap,
    diag: &mut Diagnostics,
) {
    let Some(id) = type_def.get("id").and_then(Value::as_str) else {
        return;
    };
    let key = format!("{namespace}.{id}");
    match bundle.global_types.get_mut(&key) {
        Some(Value::Object(existing)) => {
            merge_maps(existing, type_def, &key, MergeMode::Fragment, diag);
        }
        _ => {
            bundle
                .global_types
                .insert(key, Value::Object(type_def.clone()));
        }
    }
}

fn apply_extension(
    bundle: &mut SchemaBundle,
    namespace: &str,
    extension: &JsonMap,
    diag: &mut Diagnostics,
) {
    let Some(target) = extension.get("$extend").and_then(Value::as_str) else {
        return;
    };

    let mut candidates = vec![format!("{namespace}.{target}")];
    for prefix in GLOBAL_TYPE_PREFIXES {
        candidates.push(format!("{prefix}.{target}"));
    }

    for key in &candidates {
        if let Some(Value::Object(existing)) = bundle.global_types.get_mut(key) {
            extend_global_type(existing, extension, key, diag);
            return;
        }
    }

    diag.report(Diagnostic::UnknownExtendTarget {
        target: format!("{namespace}.{target}"),
    });
}

fn merge_maps(
    existing: &mut JsonMap,
    incoming: &JsonMap,
    path: &str,
    mode: MergeMode,
    diag: &mut Diagnostics,
) {
    for (key, value) in incoming {
        merge_field(existing, key, value, path, mode, diag);
    }
}

fn merge_field(
    existing: &mut JsonMap,
    key: &str,
    value: &Value,
    path: &str,
    mode: MergeMode,
    diag: &mut Diagnostics,
) {
    let Some(current) = existing.get_mut(key) else {
        existing.insert(key.to_string(), value.clone());
        return;
    };

    match FieldShape::of(value) {
        FieldShape::Scalar => {
            if !structurally_equal(current, value) {
                diag.report(Diagnostic::ScalarConflict {
                    path: format!("{path}.{key}"),
                    previous: current.to_string(),
                    current: value.to_string(),
                });
                *current = value.clone();
            }
        }
        FieldShape::EmptyArray => {}
        FieldShape::PrimitiveArray | FieldShape::ObjectArray => {
            let incoming_items = value.as_array().expect("classified as array");
            match current {
                Value::Array(items) => {
                    if mode == MergeMode::Extend && key == "choices" {
                        merge_choices(items, incoming_items, path, diag);
                    } else {
                        let nested = format!("{path}.{key}");
                        merge_array(items, incoming_items, &nested, mode, diag);
                    }
                }
                _ => {
                    if mode == MergeMode::Extend {
                        diag.report(Diagnostic::ExtendShapeMismatch {
                            target: path.to_string(),
                            field: key.to_string(),
                        });
                    }
                    *current = value.clone();
                }
            }
        }
        FieldShape::Object => {
            let incoming_map = value.as_object().expect("classified as object");
            match current {
                Value::Object(map) => {
                    let nested = format!("{path}.{key}");
                    merge_maps(map, incoming_map, &nested, mode, diag);
                }
                _ => {
                    if mode == MergeMode::Extend {
                        diag.report(Diagnostic::ExtendShapeMismatch {
                            target: path.to_string(),
                            field: key.to_string(),
                        });
                    }
                    *current = value.clone();
                }
            }
        }
    }
}

/// Array merge covering both the deduplicated primitive union and the
/// object-array rule. An incoming object carrying an `id` or `name`
/// discriminant merges member-wise into the element with the same
/// discriminant; everything else appends at the end unless a structurally
/// equal element already exists, preserving first-seen instances and their
/// order.
fn merge_array(
    items: &mut Vec<Value>,
    incoming: &[Value],
    path: &str,
    mode: MergeMode,
    diag: &mut Diagnostics,
) {
    for item in incoming {
        if let Some(key) = element_key(item) {
            if let Some(Value::Object(existing)) = items
                .iter_mut()
                .find(|e| element_key(e).as_deref() == Some(&key))
            {
                let nested = format!("{path}.{key}");
                let map = item.as_object().expect("keyed element is an object");
                merge_maps(existing, map, &nested, mode, diag);
                continue;
            }
        }
        if !items.iter().any(|existing| structurally_equal(existing, item)) {
            items.push(item.clone());
        }
    }
}

/// The discriminant of a named array element: its `id` (types) or `name`
/// (functions, events, parameters).
fn element_key(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    map.get("id")
        .or_else(|| map.get("name"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

/// Member-wise union-choice merge. An incoming alternative with an `enum`
/// discriminant merges into the existing enum alternative; one with a
/// `$ref` discriminant merges into the alternative referencing the same
/// target; anything else appends if structurally new.
fn merge_choices(existing: &mut Vec<Value>, incoming: &[Value], path: &str, diag: &mut Diagnostics) {
    for choice in incoming {
        let Some(choice_map) = choice.as_object() else {
            if !existing.iter().any(|c| structurally_equal(c, choice)) {
                existing.push(choice.clone());
            }
            continue;
        };

        let slot = if choice_map.contains_key("enum") {
            existing
                .iter_mut()
                .find(|c| c.as_object().is_some_and(|m| m.contains_key("enum")))
        } else if let Some(target) = choice_map.get("$ref") {
            existing.iter_mut().find(|c| {
                c.as_object()
                    .and_then(|m| m.get("$ref"))
                    .is_some_and(|r| r == target)
            })
        } else {
            None
        };

        match slot {
            Some(Value::Object(map)) => {
                let nested = format!("{path}.choices");
                merge_maps(map, choice_map, &nested, MergeMode::Extend, diag);
            }
            _ => {
                if !existing.iter().any(|c| structurally_equal(c, choice)) {
                    existing.push(choice.clone());
                }
            }
        }
    }
}
