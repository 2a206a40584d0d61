//! Per-namespace page synthesis.
//!
//! Renders one merged namespace into an ordered sequence of RST blocks:
//! title, optional MDN hint, description, manifest properties,
//! permissions, functions, events, types, properties. Sections are
//! computed independently and concatenated in fixed order; a sidebar
//! records which sections turned out non-empty. Entity members are
//! emitted as `api-member` directives understood by the documentation
//! build's directive extension.

use std::fmt::Write;

use serde_json::Value;

use super::annotations::{Annotations, Block};
use super::inline::InlineFormatter;
use super::version::VersionTracker;
use crate::closure::ClosureCollector;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::permissions::PermissionTable;
use crate::resolve::{RefResolver, RenderContext};
use crate::schema::{JsonMap, NamespaceEntry, SchemaBundle};

/// A rendered namespace page.
#[derive(Debug)]
pub struct RenderedPage {
    /// The namespace this page documents.
    pub namespace: String,
    /// Final RST content.
    pub content: String,
    /// Titles of the non-empty sections, for the sidebar.
    pub sections: Vec<String>,
}

/// Renders one namespace against the merged bundle.
pub struct Writer<'a> {
    bundle: &'a SchemaBundle,
    entry: &'a NamespaceEntry,
    namespace: &'a str,
    permissions: &'a PermissionTable,
    inline: InlineFormatter,
}

impl<'a> Writer<'a> {
    /// Create a writer for `namespace`, if the bundle knows it.
    pub fn new(
        bundle: &'a SchemaBundle,
        namespace: &'a str,
        permissions: &'a PermissionTable,
    ) -> Option<Self> {
        let entry = bundle.namespaces.get(namespace)?;
        Some(Self {
            bundle,
            entry,
            namespace,
            permissions,
            inline: InlineFormatter::new(),
        })
    }

    /// Render the page.
    pub fn render(&self, diag: &mut Diagnostics) -> RenderedPage {
        let resolver = RefResolver::new(self.bundle, self.namespace);
        let mut ctx = RenderContext::default();
        for permission in self.entry.permissions() {
            ctx.permissions.insert(permission.to_string());
        }

        // The header and the sections that seed the used-types set come
        // first; the closure and the permission aggregate are completed
        // before their sections are emitted, then everything is
        // assembled in fixed order.
        let mut out = String::new();
        self.write_header(&mut out, &resolver, &mut ctx, diag);

        let manifest = self.render_manifest(&resolver, &mut ctx, diag);
        let functions = self.render_callables(self.entry.functions(), &resolver, &mut ctx, diag);
        let events = self.render_callables(self.entry.events(), &resolver, &mut ctx, diag);
        let properties = self.render_namespace_properties(&resolver, &mut ctx, diag);

        let mut collector = ClosureCollector::new();
        collector.collect(self.bundle, &resolver, &mut ctx, diag);
        let types = self.render_types(&collector, &resolver, &mut ctx, diag);
        collector.report_missing(self.namespace, diag);

        let permissions = self.render_permissions(&ctx, diag);

        let mut sections = Vec::new();
        for (title, body) in [
            ("Manifest file properties", manifest),
            ("Permissions", permissions),
            ("Functions", functions),
            ("Events", events),
            ("Types", types),
            ("Properties", properties),
        ] {
            let Some(body) = body else { continue };
            sections.push(title.to_string());
            writeln!(out, "{title}").unwrap();
            writeln!(out, "{}", "-".repeat(title.len())).unwrap();
            writeln!(out).unwrap();
            writeln!(out, "{body}").unwrap();
        }

        RenderedPage {
            namespace: self.namespace.to_string(),
            content: collapse_blank_lines(&out),
            sections,
        }
    }

    fn write_header(
        &self,
        out: &mut String,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) {
        writeln!(out, ".. _{}:", self.namespace).unwrap();
        writeln!(out).unwrap();
        let bar = "=".repeat(self.namespace.len().max(3));
        writeln!(out, "{bar}").unwrap();
        writeln!(out, "{}", self.namespace).unwrap();
        writeln!(out, "{bar}").unwrap();
        writeln!(out).unwrap();

        let annotations = Annotations::of(self.entry.fields());
        if let Some(url) = &annotations.mdn_url {
            writeln!(out, ".. hint::").unwrap();
            writeln!(
                out,
                "   A related API exists on other platforms; see the `MDN documentation <{url}>`__."
            )
            .unwrap();
            writeln!(out).unwrap();
        }
        if let Some(version) = annotations.version_added() {
            writeln!(out, "*Added in Thunderbird {version}.*").unwrap();
            writeln!(out).unwrap();
        }

        if let Some(description) = self.entry.description() {
            let text = self.inline.format(description, resolver, ctx, diag);
            writeln!(out, "{text}").unwrap();
            writeln!(out).unwrap();
        }
        self.write_blocks(out, &annotations.blocks, 0);
    }

    /// Manifest-properties section: the properties contributed by this
    /// namespace's own manifest fragments via `$extend`.
    fn render_manifest(
        &self,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) -> Option<String> {
        let manifest = self.bundle.local_manifests.get(self.namespace)?;
        let mut out = String::new();
        let mut tracker = VersionTracker::new();

        for type_def in manifest.types() {
            let Some(map) = type_def.as_object() else {
                continue;
            };
            if !map.contains_key("$extend") {
                continue;
            }
            let Some(properties) = map.get("properties").and_then(Value::as_object) else {
                continue;
            };
            self.write_object_properties(&mut out, properties, 0, &mut tracker, resolver, ctx, diag);
        }

        (!out.trim().is_empty()).then_some(out)
    }

    /// Functions and events share one rendering path.
    fn render_callables(
        &self,
        entries: &[Value],
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) -> Option<String> {
        let mut callables: Vec<&JsonMap> = entries
            .iter()
            .filter_map(Value::as_object)
            .filter(|map| !Annotations::of(map).is_unsupported())
            .collect();
        if callables.is_empty() {
            return None;
        }
        callables.sort_by_key(|map| name_of(map));

        let mut out = String::new();
        for map in callables {
            let name = name_of(map);
            let annotations = Annotations::of(map);
            let mut tracker = VersionTracker::new();
            let show_version = tracker.observe(0, annotations.version_added());

            let signature = self.signature(&name, map);
            writeln!(out, ".. _{}.{}:", self.namespace, name).unwrap();
            writeln!(out).unwrap();
            writeln!(out, "{signature}").unwrap();
            writeln!(out, "{}", "~".repeat(signature.chars().count().max(3))).unwrap();
            writeln!(out).unwrap();

            if show_version {
                if let Some(version) = annotations.version_added() {
                    writeln!(out, "-- [Added in TB {version}]").unwrap();
                    writeln!(out).unwrap();
                }
            }

            if let Some(description) = description_of(map) {
                let text = self.inline.format(description, resolver, ctx, diag);
                writeln!(out, "{text}").unwrap();
                writeln!(out).unwrap();
            }
            self.write_blocks(&mut out, &annotations.blocks, 0);

            if let Some(parameters) = map.get("parameters").and_then(Value::as_array) {
                // Parameters are positional; declaration order is kept.
                for parameter in parameters {
                    let Some(parameter) = parameter.as_object() else {
                        continue;
                    };
                    let parameter_name = name_of(parameter);
                    let anchor = format!("{}.{}.{}", self.namespace, name, parameter_name);
                    self.write_member(
                        &mut out,
                        &parameter_name,
                        parameter,
                        Some(&anchor),
                        1,
                        &mut tracker,
                        resolver,
                        ctx,
                        diag,
                    );
                }
            }

            if let Some(returns) = map.get("returns").and_then(Value::as_object) {
                self.write_member(
                    &mut out,
                    "return value",
                    returns,
                    None,
                    1,
                    &mut tracker,
                    resolver,
                    ctx,
                    diag,
                );
            }

            self.track_permissions(map, ctx);
        }

        Some(out)
    }

    /// Types section: the closure-collected definitions, sorted by their
    /// page-local display id.
    fn render_types(
        &self,
        collector: &ClosureCollector,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) -> Option<String> {
        let mut entries: Vec<(String, String, &Value)> = collector
            .resolved()
            .iter()
            .map(|(key, definition)| {
                let resolved = resolver.resolve(key, ctx, diag);
                (resolved.label, resolved.anchor, definition)
            })
            .collect();
        if entries.is_empty() {
            return None;
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = String::new();
        for (label, anchor, definition) in entries {
            let Some(map) = definition.as_object() else {
                continue;
            };
            let annotations = Annotations::of(map);
            if annotations.is_unsupported() {
                continue;
            }
            let mut tracker = VersionTracker::new();
            let show_version = tracker.observe(0, annotations.version_added());

            writeln!(out, ".. _{anchor}:").unwrap();
            writeln!(out).unwrap();
            writeln!(out, "{label}").unwrap();
            writeln!(out, "{}", "~".repeat(label.chars().count().max(3))).unwrap();
            writeln!(out).unwrap();

            if show_version {
                if let Some(version) = annotations.version_added() {
                    writeln!(out, "-- [Added in TB {version}]").unwrap();
                    writeln!(out).unwrap();
                }
            }

            self.write_type_body(&mut out, map, &mut tracker, resolver, ctx, diag);
            self.track_permissions(map, ctx);
        }

        (!out.trim().is_empty()).then_some(out)
    }

    fn render_namespace_properties(
        &self,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) -> Option<String> {
        let properties = self.entry.properties()?;
        let mut out = String::new();
        let mut tracker = VersionTracker::new();
        self.write_object_properties(&mut out, properties, 0, &mut tracker, resolver, ctx, diag);
        (!out.trim().is_empty()).then_some(out)
    }

    /// Permissions section: everything the namespace and its rendered
    /// entities mentioned, deduplicated and sorted.
    fn render_permissions(&self, ctx: &RenderContext, diag: &mut Diagnostics) -> Option<String> {
        if ctx.permissions.is_empty() {
            return None;
        }
        let known = self.bundle.known_namespaces();
        let mut out = String::new();

        for permission in &ctx.permissions {
            let description = self.permissions.describe(permission, &known);
            if description.is_none() {
                diag.report(Diagnostic::MissingPermissionDescription {
                    permission: permission.clone(),
                });
            }
            write_api_member(
                &mut out,
                &MemberDirective {
                    name: Some(format!("``{permission}``")),
                    depth: 0,
                    ..MemberDirective::default()
                },
                description.as_deref().unwrap_or_default(),
            );
        }

        Some(out)
    }

    /// The body of a type definition, dispatched on its variant.
    fn write_type_body(
        &self,
        out: &mut String,
        map: &JsonMap,
        tracker: &mut VersionTracker,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) {
        let (description, harvested) = match description_of(map) {
            Some(text) => self.inline_with_harvest(text, resolver, ctx, diag),
            None => (String::new(), Default::default()),
        };
        if !description.is_empty() {
            writeln!(out, "{description}").unwrap();
            writeln!(out).unwrap();
        }
        self.write_blocks(out, &Annotations::of(map).blocks, 0);

        if let Some(choices) = map.get("choices").and_then(Value::as_array) {
            self.write_choices(out, &name_of(map), choices, None, 0, tracker, resolver, ctx, diag);
        } else if let Some(values) = map.get("enum").and_then(Value::as_array) {
            self.write_enum(out, map, values, &harvested, 1, tracker);
        } else if let Some(properties) = map.get("properties").and_then(Value::as_object) {
            self.write_object_properties(out, properties, 1, tracker, resolver, ctx, diag);
        } else if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            let markup = resolver.resolve(reference, ctx, diag).markup();
            writeln!(out, "{markup}").unwrap();
            writeln!(out).unwrap();
        } else if let Some(kind) = self.simple_type(map, resolver, ctx, diag) {
            writeln!(out, "{kind}").unwrap();
            writeln!(out).unwrap();
        }
    }

    /// Object properties split required-first, optional-second, each
    /// sublist sorted lexicographically.
    #[allow(clippy::too_many_arguments)]
    fn write_object_properties(
        &self,
        out: &mut String,
        properties: &JsonMap,
        depth: usize,
        tracker: &mut VersionTracker,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) {
        let mut required: Vec<(&String, &JsonMap)> = Vec::new();
        let mut optional: Vec<(&String, &JsonMap)> = Vec::new();
        for (name, definition) in properties {
            let Some(map) = definition.as_object() else {
                continue;
            };
            if map.get("optional").and_then(Value::as_bool) == Some(true) {
                optional.push((name, map));
            } else {
                required.push((name, map));
            }
        }
        required.sort_by_key(|(name, _)| (*name).clone());
        optional.sort_by_key(|(name, _)| (*name).clone());

        for (name, map) in required.into_iter().chain(optional) {
            self.write_member(out, name, map, None, depth, tracker, resolver, ctx, diag);
        }
    }

    /// One entity member as an `api-member` directive, recursing into
    /// nested objects, choices and enums. `anchor` labels the member so
    /// references can target it directly.
    #[allow(clippy::too_many_arguments)]
    fn write_member(
        &self,
        out: &mut String,
        name: &str,
        map: &JsonMap,
        anchor: Option<&str>,
        depth: usize,
        tracker: &mut VersionTracker,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) {
        let annotations = Annotations::of(map);
        if annotations.is_unsupported() {
            return;
        }

        if let Some(choices) = map.get("choices").and_then(Value::as_array) {
            self.write_choices(out, name, choices, anchor, depth, tracker, resolver, ctx, diag);
            return;
        }

        let show_version = tracker.observe(depth, annotations.version_added());
        let annotation = member_annotation(&annotations, show_version);

        let (description, harvested) = match description_of(map) {
            Some(text) => self.inline_with_harvest(text, resolver, ctx, diag),
            None => (String::new(), Default::default()),
        };

        let mut body = description;
        self.track_permissions(map, ctx);

        if let Some(anchor) = anchor {
            writeln!(out, ".. _{anchor}:").unwrap();
            writeln!(out).unwrap();
        }

        write_api_member(
            out,
            &MemberDirective {
                name: Some(format!("``{name}``")),
                type_annotation: self.simple_type(map, resolver, ctx, diag),
                annotation,
                refid: anchor.map(ToString::to_string),
                refname: anchor.map(|_| name.to_string()),
                depth,
                ..MemberDirective::default()
            },
            &body_with_blocks(&mut body, &annotations.blocks),
        );

        if let Some(values) = map.get("enum").and_then(Value::as_array) {
            self.write_enum(out, map, values, &harvested, depth + 1, tracker);
        }
        if let Some(properties) = map.get("properties").and_then(Value::as_object) {
            self.write_object_properties(out, properties, depth + 1, tracker, resolver, ctx, diag);
        }
        if let Some(items) = map.get("items").and_then(Value::as_object) {
            if items.contains_key("properties") || items.contains_key("choices") {
                self.write_member(out, "items", items, None, depth + 1, tracker, resolver, ctx, diag);
            }
        }
    }

    /// Union alternatives in declaration order, separated by an OR marker.
    /// The member anchor lands on the first supported alternative.
    #[allow(clippy::too_many_arguments)]
    fn write_choices(
        &self,
        out: &mut String,
        name: &str,
        choices: &[Value],
        anchor: Option<&str>,
        depth: usize,
        tracker: &mut VersionTracker,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) {
        let supported: Vec<&JsonMap> = choices
            .iter()
            .filter_map(Value::as_object)
            .filter(|choice| !Annotations::of(choice).is_unsupported())
            .collect();

        for (index, choice) in supported.iter().enumerate() {
            if index > 0 {
                writeln!(out, ".. container:: api-member-inline-changes").unwrap();
                writeln!(out).unwrap();
                writeln!(out, "   OR").unwrap();
                writeln!(out).unwrap();
            }
            // Each alternative renders as the member itself; an
            // alternative that is itself a union recurses into its own
            // (shorter) alternative list.
            let anchor = if index == 0 { anchor } else { None };
            self.write_member(out, name, choice, anchor, depth, tracker, resolver, ctx, diag);
        }
    }

    /// Enumerated values, sorted, with per-value metadata from the
    /// parallel `enums` map or harvested from the owning description.
    fn write_enum(
        &self,
        out: &mut String,
        owner: &JsonMap,
        values: &[Value],
        harvested: &std::collections::BTreeMap<String, String>,
        depth: usize,
        tracker: &mut VersionTracker,
    ) {
        let metadata = owner.get("enums").and_then(Value::as_object);

        let mut names: Vec<&str> = values.iter().filter_map(Value::as_str).collect();
        names.sort_unstable();

        for value in names {
            let meta = metadata
                .and_then(|m| m.get(value))
                .and_then(Value::as_object);
            let annotations = meta.map(Annotations::of).unwrap_or_default();
            if annotations.is_unsupported() {
                continue;
            }
            let show_version = tracker.observe(depth, annotations.version_added());
            let description = meta
                .and_then(description_of)
                .map(ToString::to_string)
                .or_else(|| harvested.get(value).cloned())
                .unwrap_or_default();

            write_api_member(
                out,
                &MemberDirective {
                    name: Some(format!("``{value}``")),
                    annotation: member_annotation(&annotations, show_version),
                    depth,
                    ..MemberDirective::default()
                },
                &description,
            );
        }
    }

    /// A short display string for a member's type, tracking references it
    /// names. Returns `None` for shapes rendered structurally (choices).
    fn simple_type(
        &self,
        map: &JsonMap,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) -> Option<String> {
        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            return Some(resolver.resolve(reference, ctx, diag).markup());
        }
        let kind = map.get("type").and_then(Value::as_str)?;
        if kind == "array" {
            let inner = map
                .get("items")
                .and_then(Value::as_object)
                .and_then(|items| self.simple_type(items, resolver, ctx, diag))
                .unwrap_or_else(|| "any".to_string());
            return Some(format!("array of {inner}"));
        }
        Some(kind.to_string())
    }

    /// Function/event signature with optional parameters bracketed.
    fn signature(&self, name: &str, map: &JsonMap) -> String {
        let parameters = map
            .get("parameters")
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice);

        let rendered: Vec<String> = parameters
            .iter()
            .filter_map(Value::as_object)
            .filter(|p| !Annotations::of(p).is_unsupported())
            .map(|p| {
                let parameter = name_of(p);
                if p.get("optional").and_then(Value::as_bool) == Some(true) {
                    format!("[{parameter}]")
                } else {
                    parameter
                }
            })
            .collect();

        format!("{name}({})", rendered.join(", "))
    }

    fn inline_with_harvest(
        &self,
        text: &str,
        resolver: &RefResolver<'_>,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) -> (String, std::collections::BTreeMap<String, String>) {
        let (cleaned, harvested) = self.inline.harvest_definition_list(text);
        (self.inline.format(&cleaned, resolver, ctx, diag), harvested)
    }

    fn write_blocks(&self, out: &mut String, blocks: &[Block], indent: usize) {
        let pad = " ".repeat(indent);
        for block in blocks {
            match block {
                Block::Text(text) => {
                    writeln!(out, "{pad}{text}").unwrap();
                    writeln!(out).unwrap();
                }
                Block::Code { language, content } => {
                    writeln!(out, "{pad}.. code-block:: {language}").unwrap();
                    writeln!(out).unwrap();
                    for line in content.lines() {
                        writeln!(out, "{pad}   {line}").unwrap();
                    }
                    writeln!(out).unwrap();
                }
                Block::List(items) => {
                    for item in items {
                        writeln!(out, "{pad}- {item}").unwrap();
                    }
                    writeln!(out).unwrap();
                }
                Block::Admonition { kind, text } => {
                    writeln!(out, "{pad}.. {}::", kind.directive()).unwrap();
                    writeln!(out).unwrap();
                    writeln!(out, "{pad}   {text}").unwrap();
                    writeln!(out).unwrap();
                }
            }
        }
    }

    /// Entity-level permissions feed the page aggregation.
    fn track_permissions(&self, map: &JsonMap, ctx: &mut RenderContext) {
        if let Some(permissions) = map.get("permissions").and_then(Value::as_array) {
            for permission in permissions.iter().filter_map(Value::as_str) {
                ctx.permissions.insert(permission.to_string());
            }
        }
    }
}

/// Options of one `api-member` directive. `refid`/`refname` pair with a
/// preceding `.. _refid:` label so `$(ref:ns.func.param)` links can land
/// on individual members.
#[derive(Debug, Default)]
struct MemberDirective {
    name: Option<String>,
    type_annotation: Option<String>,
    annotation: Option<String>,
    refid: Option<String>,
    refname: Option<String>,
    depth: usize,
}

fn write_api_member(out: &mut String, directive: &MemberDirective, body: &str) {
    writeln!(out, ".. api-member::").unwrap();
    if let Some(name) = &directive.name {
        writeln!(out, "   :name: {name}").unwrap();
    }
    if let Some(kind) = &directive.type_annotation {
        writeln!(out, "   :type: ({kind})").unwrap();
    }
    if let Some(annotation) = &directive.annotation {
        writeln!(out, "   :annotation: {annotation}").unwrap();
    }
    if let Some(refid) = &directive.refid {
        writeln!(out, "   :refid: {refid}").unwrap();
    }
    if let Some(refname) = &directive.refname {
        writeln!(out, "   :refname: {refname}").unwrap();
    }
    if directive.depth > 0 {
        writeln!(out, "   :depth: {}", directive.depth).unwrap();
    }
    writeln!(out).unwrap();

    if !body.trim().is_empty() {
        for line in body.lines() {
            if line.trim().is_empty() {
                writeln!(out).unwrap();
            } else {
                writeln!(out, "   {line}").unwrap();
            }
        }
        writeln!(out).unwrap();
    }
}

fn member_annotation(annotations: &Annotations, show_version: bool) -> Option<String> {
    let mut parts = Vec::new();
    if show_version {
        if let Some(version) = annotations.version_added() {
            parts.push(format!("[Added in TB {version}]"));
        }
    }
    if annotations.deprecated.is_some() {
        parts.push("[Deprecated]".to_string());
    }
    (!parts.is_empty()).then(|| format!("-- {}", parts.join(" ")))
}

fn body_with_blocks(body: &mut String, blocks: &[Block]) -> String {
    let mut out = std::mem::take(body);
    for block in blocks {
        match block {
            Block::Text(text) => {
                out.push_str("\n\n");
                out.push_str(text);
            }
            Block::Admonition { kind, text } => {
                out.push_str(&format!("\n\n.. {}::\n\n   {}", kind.directive(), text));
            }
            Block::Code { language, content } => {
                out.push_str(&format!("\n\n.. code-block:: {language}\n\n"));
                for line in content.lines() {
                    out.push_str(&format!("   {line}\n"));
                }
            }
            Block::List(items) => {
                out.push_str("\n\n");
                for item in items {
                    out.push_str(&format!("- {item}\n"));
                }
            }
        }
    }
    out
}

fn name_of(map: &JsonMap) -> String {
    map.get("name")
        .or_else(|| map.get("id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn description_of(map: &JsonMap) -> Option<&str> {
    map.get("description").and_then(Value::as_str)
}

/// Collapse runs of blank lines to one and end with a single newline.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_pending = false;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_pending = true;
            continue;
        }
        if blank_pending && !out.is_empty() {
            out.push('\n');
        }
        blank_pending = false;
        out.push_str(line);
        out.push('\n');
    }
    out
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

    fn render(files: Vec<SchemaFile>, namespace: &str) -> (RenderedPage, Diagnostics) {
        let mut diag = Diagnostics::default();
        let bundle = build_bundle(&files, &mut diag);
        let table = PermissionTable::default();
        let writer = Writer::new(&bundle, namespace, &table).expect("known namespace");
        let page = writer.render(&mut diag);
        (page, diag)
    }

    fn mail_files() -> Vec<SchemaFile> {
        vec![SchemaFile {
            stem: "mail".to_string(),
            entries: vec![
                entry(json!({
                    "namespace": "manifest",
                    "types": [{
                        "id": "WebExtensionManifest",
                        "type": "object",
                        "properties": {}
                    }]
                })),
                entry(json!({
                    "namespace": "manifest",
                    "types": [{
                        "$extend": "WebExtensionManifest",
                        "properties": {
                            "mail_settings": {
                                "type": "string",
                                "optional": true,
                                "description": "Mail settings."
                            }
                        }
                    }]
                })),
                entry(json!({
                    "namespace": "mail",
                    "description": "Mail handling, see $(ref:Folder).",
                    "permissions": ["accountsRead"],
                    "types": [
                        {
                            "id": "Folder",
                            "type": "object",
                            "description": "A mail folder.",
                            "properties": {
                                "name": { "type": "string", "description": "Folder name." },
                                "special": {
                                    "type": "boolean",
                                    "optional": true,
                                    "annotations": [{ "version_added": "91" }]
                                }
                            }
                        },
                        {
                            "id": "Hidden",
                            "type": "object",
                            "annotations": [{ "version_added": false }]
                        }
                    ],
                    "functions": [
                        {
                            "name": "getFolder",
                            "type": "function",
                            "description": "Get a folder.",
                            "annotations": [{ "version_added": "91" }],
                            "parameters": [
                                { "name": "id", "type": "string" },
                                {
                                    "name": "details",
                                    "optional": true,
                                    "$ref": "Folder",
                                    "annotations": [{ "version_added": "91" }]
                                }
                            ]
                        },
                        { "name": "dropped", "type": "function", "unsupported": true }
                    ]
                })),
            ],
        }]
    }

    #[test]
    fn test_section_order_and_sidebar() {
        let (page, _) = render(mail_files(), "mail");

        let manifest = page.content.find("Manifest file properties").unwrap();
        let permissions = page.content.find("Permissions").unwrap();
        let functions = page.content.find("Functions").unwrap();
        let types = page.content.find("Types").unwrap();
        assert!(manifest < permissions && permissions < functions && functions < types);

        assert_eq!(
            page.sections,
            vec!["Manifest file properties", "Permissions", "Functions", "Types"]
        );
    }

    #[test]
    fn test_unsupported_entities_are_absent() {
        let (page, _) = render(mail_files(), "mail");
        assert!(!page.content.contains("dropped"));
        assert!(!page.content.contains("Hidden"));
    }

    #[test]
    fn test_version_annotation_suppressed_for_matching_child() {
        let (page, _) = render(mail_files(), "mail");
        // getFolder prints [Added in TB 91] once; its `details` parameter
        // carries the same version and is suppressed.
        let occurrences = page.content.matches("[Added in TB 91]").count();
        // One for the function, one for Folder.special (different entity,
        // fresh tracker, no annotated ancestor).
        assert_eq!(occurrences, 2);
    }

    #[test]
    fn test_types_closure_embeds_referenced_type() {
        let (page, _) = render(mail_files(), "mail");
        // Folder is referenced by the namespace description and the
        // getFolder parameter, so the page embeds its definition.
        assert!(page.content.contains(".. _mail.Folder:"));
        assert!(page.content.contains("A mail folder."));
        // Required first: `name` precedes the optional `special`.
        let name_pos = page.content.find("``name``").unwrap();
        let special_pos = page.content.find("``special``").unwrap();
        assert!(name_pos < special_pos);
    }

    #[test]
    fn test_manifest_properties_rendered() {
        let (page, _) = render(mail_files(), "mail");
        assert!(page.content.contains("``mail_settings``"));
        assert!(page.content.contains("Mail settings."));
    }

    #[test]
    fn test_signature_brackets_optional_parameters() {
        let (page, _) = render(mail_files(), "mail");
        assert!(page.content.contains("getFolder(id, [details])"));
    }

    #[test]
    fn test_permission_without_description_is_diagnosed() {
        let (page, diag) = render(mail_files(), "mail");
        assert!(page.content.contains("``accountsRead``"));
        assert!(diag.entries().iter().any(|d| matches!(
            d,
            Diagnostic::MissingPermissionDescription { permission } if permission == "accountsRead"
        )));
    }

    #[test]
    fn test_choices_render_with_or_marker() {
        let files = vec![SchemaFile {
            stem: "compose".to_string(),
            entries: vec![entry(json!({
                "namespace": "compose",
                "functions": [{
                    "name": "setBody",
                    "type": "function",
                    "parameters": [{
                        "name": "body",
                        "choices": [
                            { "type": "string" },
                            { "type": "object", "properties": {
                                "html": { "type": "string" }
                            } }
                        ]
                    }]
                }]
            }))],
        }];
        let (page, _) = render(files, "compose");
        let first = page.content.find("``body``").unwrap();
        let or = page.content.find("   OR").unwrap();
        let second = page.content.rfind("``body``").unwrap();
        assert!(first < or && or < second);
    }

    #[test]
    fn test_parameters_carry_member_anchors() {
        let (page, _) = render(mail_files(), "mail");
        // Each function parameter is labeled and carries the refid and
        // refname pair the directive needs to anchor it.
        assert!(page.content.contains(".. _mail.getFolder.details:"));
        assert!(page.content.contains(":refid: mail.getFolder.details"));
        assert!(page.content.contains(":refname: details"));
        // Nested object properties are not individually anchored.
        assert!(!page.content.contains(":refid: mail.Folder.name"));
    }

    #[test]
    fn test_nested_union_alternatives_all_render() {
        let files = vec![SchemaFile {
            stem: "compose".to_string(),
            entries: vec![entry(json!({
                "namespace": "compose",
                "functions": [{
                    "name": "attach",
                    "type": "function",
                    "parameters": [{
                        "name": "source",
                        "choices": [
                            { "type": "string" },
                            { "choices": [
                                { "type": "integer" },
                                { "type": "object", "properties": {
                                    "path": { "type": "string" }
                                } }
                            ] }
                        ]
                    }]
                }]
            }))],
        }];
        let (page, _) = render(files, "compose");
        // The inner union is preserved: all three leaf alternatives
        // appear, with OR markers between them.
        assert!(page.content.contains("(string)"));
        assert!(page.content.contains("(integer)"));
        assert!(page.content.contains("``path``"));
        assert_eq!(page.content.matches("   OR").count(), 2);
    }

    #[test]
    fn test_enum_values_sorted_with_harvested_descriptions() {
        let files = vec![SchemaFile {
            stem: "shot".to_string(),
            entries: vec![entry(json!({
                "namespace": "shot",
                "types": [{
                    "id": "Format",
                    "type": "string",
                    "description": "Image format. <dl><dt>png</dt><dd>Lossless.</dd><dt>jpeg</dt><dd>Lossy.</dd></dl>",
                    "enum": ["png", "jpeg"]
                }],
                "functions": [{
                    "name": "capture",
                    "type": "function",
                    "parameters": [{ "name": "format", "$ref": "Format" }]
                }]
            }))],
        }];
        let (page, _) = render(files, "shot");
        let jpeg = page.content.find("``jpeg``").unwrap();
        let png = page.content.find("``png``").unwrap();
        assert!(jpeg < png);
        assert!(page.content.contains("Lossless."));
        assert!(page.content.contains("Lossy."));
        // The harvested list is removed from the display description.
        assert!(!page.content.contains("<dl>"));
    }

    #[test]
    fn test_blank_lines_collapse() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb\n\n"), "a\n\nb\n");
        assert_eq!(collapse_blank_lines("\n\na\n"), "a\n");
    }
}
