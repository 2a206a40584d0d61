//! Advisory diagnostics for merge, resolution and rendering.
//!
//! Nothing in here aborts a run. The core records what it could not do
//! cleanly (ambiguous references, missing type definitions, permission
//! strings without a description) and the caller decides whether to print
//! the entries or fail a strict check on them.

use std::fmt;

/// A single advisory diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A type reference could not be confidently namespace-qualified and
    /// was defaulted to the current namespace.
    AmbiguousRef {
        namespace: String,
        reference: String,
    },

    /// A tracked reference resolved to no definition after the closure
    /// fixed point.
    MissingType { namespace: String, id: String },

    /// A permission has no locale, builtin or namespace-derived description.
    MissingPermissionDescription { permission: String },

    /// Two fragments disagreed on a scalar field; the later value won.
    ScalarConflict {
        path: String,
        previous: String,
        current: String,
    },

    /// A `$extend` value named no known global type.
    UnknownExtendTarget { target: String },

    /// A field had an unexpected shape during a `$extend` merge and was
    /// overwritten best-effort.
    ExtendShapeMismatch { target: String, field: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::AmbiguousRef {
                namespace,
                reference,
            } => write!(
                f,
                "ambiguous reference `{reference}` in `{namespace}`, defaulting to local type"
            ),
            Diagnostic::MissingType { namespace, id } => {
                write!(f, "missing type definition `{id}` used by `{namespace}`")
            }
            Diagnostic::MissingPermissionDescription { permission } => {
                write!(f, "no description for permission `{permission}`")
            }
            Diagnostic::ScalarConflict {
                path,
                previous,
                current,
            } => write!(
                f,
                "fragments disagree on `{path}`: `{previous}` replaced by `{current}`"
            ),
            Diagnostic::UnknownExtendTarget { target } => {
                write!(f, "$extend target `{target}` is not a known global type")
            }
            Diagnostic::ExtendShapeMismatch { target, field } => write!(
                f,
                "unexpected shape for field `{field}` while extending `{target}`"
            ),
        }
    }
}

/// Collector for advisory diagnostics.
///
/// Entries are always recorded; they are echoed to stderr only when the
/// collector is verbose.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    verbose: bool,
}

impl Diagnostics {
    /// Create a collector that prints entries as they are recorded.
    pub fn verbose() -> Self {
        Self {
            entries: Vec::new(),
            verbose: true,
        }
    }

    /// Record a diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        if self.verbose {
            eprintln!("schemadoc: {diagnostic}");
        }
        self.entries.push(diagnostic);
    }

    /// All recorded entries, in recording order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of missing-type diagnostics, for strict checks.
    pub fn missing_type_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| matches!(d, Diagnostic::MissingType { .. }))
            .count()
    }

    /// Whether anything was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
