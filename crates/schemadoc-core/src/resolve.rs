//! Reference resolution.
//!
//! Turns a possibly under-qualified type reference into a canonical
//! namespace-qualified id, applying the fixed external-link exceptions and
//! recording the types a page must embed. Resolution never fails a run;
//! ambiguous references degrade to a best guess plus a diagnostic.

use std::collections::BTreeSet;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::schema::{SchemaBundle, GLOBAL_TYPE_PREFIXES, MANIFEST_NAMESPACE};

/// External platform types that link out instead of being embedded.
pub const EXTERNAL_TYPES: [(&str, &str); 3] = [
    (
        "File",
        "https://developer.mozilla.org/en-US/docs/Web/API/File",
    ),
    (
        "Date",
        "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/Date",
    ),
    (
        "runtime.Port",
        "https://developer.mozilla.org/en-US/docs/Mozilla/Add-ons/WebExtensions/API/runtime/Port",
    ),
];

/// Pattern of a `$(ref:...)` reference mention inside description text.
pub(crate) const REF_MENTION_PATTERN: &str = r"\$\(ref:([^)]+)\)";

/// Mutable per-page accumulators, threaded explicitly through rendering.
#[derive(Debug, Default)]
pub struct RenderContext {
    /// Canonical keys of types this page must embed.
    pub used_types: BTreeSet<String>,
    /// Permissions mentioned by the namespace or any rendered entity.
    pub permissions: BTreeSet<String>,
}

/// A resolved reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    /// True canonical key, used for closure tracking.
    pub lookup_key: String,
    /// Anchor used for the rendered link. Global-type prefixes are
    /// rewritten to the current namespace so the anchor is locally
    /// reachable.
    pub anchor: String,
    /// Short display label.
    pub label: String,
    /// External hyperlink target, for the fixed exception table.
    pub external_url: Option<String>,
    /// Whether the reference was recorded in the used-types set.
    pub tracked: bool,
}

impl ResolvedRef {
    /// The RST markup for this reference.
    pub fn markup(&self) -> String {
        match &self.external_url {
            Some(url) => format!("`{} <{}>`__", self.label, url),
            None => format!(":ref:`{} <{}>`", self.label, self.anchor),
        }
    }
}

/// Resolves references against one namespace's context.
pub struct RefResolver<'a> {
    bundle: &'a SchemaBundle,
    namespace: &'a str,
}

impl<'a> RefResolver<'a> {
    /// Create a resolver for the given page namespace.
    pub fn new(bundle: &'a SchemaBundle, namespace: &'a str) -> Self {
        Self { bundle, namespace }
    }

    /// The page namespace this resolver serves.
    pub fn namespace(&self) -> &str {
        self.namespace
    }

    /// Resolve a reference string, tracking it in `ctx` when the type must
    /// be embedded in this page.
    pub fn resolve(
        &self,
        reference: &str,
        ctx: &mut RenderContext,
        diag: &mut Diagnostics,
    ) -> ResolvedRef {
        if let Some((name, url)) = EXTERNAL_TYPES
            .iter()
            .find(|(name, _)| *name == reference)
        {
            return ResolvedRef {
                lookup_key: (*name).to_string(),
                anchor: String::new(),
                label: (*name).to_string(),
                external_url: Some((*url).to_string()),
                tracked: false,
            };
        }

        let canonical = self.canonicalize(reference, diag);
        let (prefix, id) = self.split(&canonical);

        let is_global_prefix = GLOBAL_TYPE_PREFIXES.contains(&prefix.as_str());
        let anchor = if is_global_prefix {
            format!("{}.{}", self.namespace, id)
        } else {
            canonical.clone()
        };

        let tracked = prefix == self.namespace || is_global_prefix;
        if tracked {
            ctx.used_types.insert(canonical.clone());
        }

        ResolvedRef {
            lookup_key: canonical,
            anchor,
            label: id,
            external_url: None,
            tracked,
        }
    }

    /// Determine the canonical namespace-qualified form of a reference.
    fn canonicalize(&self, reference: &str, diag: &mut Diagnostics) -> String {
        // Already qualified with a known namespace prefix.
        if self.known_prefix_of(reference).is_some() {
            return reference.to_string();
        }

        let short_id = reference.rsplit('.').next().unwrap_or(reference);

        if self.bundle.local_type(self.namespace, short_id).is_some() {
            return format!("{}.{}", self.namespace, short_id);
        }

        for related in self.bundle.related_of(self.namespace) {
            if self.bundle.local_type(related, short_id).is_some() {
                return format!("{related}.{short_id}");
            }
        }

        diag.report(Diagnostic::AmbiguousRef {
            namespace: self.namespace.to_string(),
            reference: reference.to_string(),
        });
        format!("{}.{}", self.namespace, short_id)
    }

    /// The longest known namespace that prefixes `reference`, if any.
    fn known_prefix_of(&self, reference: &str) -> Option<String> {
        let mut best: Option<&str> = None;
        let mut consider = |name: &'a str| {
            if reference.len() > name.len()
                && reference.starts_with(name)
                && reference.as_bytes()[name.len()] == b'.'
                && best.map_or(true, |b| name.len() > b.len())
            {
                best = Some(name);
            }
        };

        for name in self.bundle.namespaces.keys() {
            consider(name);
        }
        consider(MANIFEST_NAMESPACE);
        for prefix in GLOBAL_TYPE_PREFIXES {
            consider(prefix);
        }

        best.map(ToString::to_string)
    }

    /// Split a canonical reference into namespace prefix and type id.
    fn split(&self, canonical: &str) -> (String, String) {
        if let Some(prefix) = self.known_prefix_of(canonical) {
            let id = canonical[prefix.len() + 1..].to_string();
            return (prefix, id);
        }
        match canonical.rsplit_once('.') {
            Some((prefix, id)) => (prefix.to_string(), id.to_string()),
            None => (String::new(), canonical.to_string()),
        }
    }
}
