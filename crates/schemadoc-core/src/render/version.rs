//! Per-depth suppression of "added in version" annotations.
//!
//! A child whose version equals its nearest annotated ancestor's version
//! must not repeat the annotation. The tracker is an explicit stack
//! indexed by nesting depth; whenever a shallower level records a value,
//! everything deeper is discarded.

/// Version-annotation suppression state for one top-level entity.
#[derive(Debug, Default)]
pub struct VersionTracker {
    stack: Vec<Option<String>>,
}

impl VersionTracker {
    /// Create a fresh tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the version observed at `depth` and return whether its
    /// annotation should be printed.
    pub fn observe(&mut self, depth: usize, version: Option<&str>) -> bool {
        // A new entity at this depth invalidates everything deeper.
        self.stack.truncate(depth);

        let inherited = self.stack.iter().rev().find_map(|v| v.as_deref());
        let print = version.is_some() && version != inherited;

        while self.stack.len() < depth {
            self.stack.push(None);
        }
        self.stack.push(version.map(ToString::to_string));

        print
    }
}
