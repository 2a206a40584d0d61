//! Entity annotations.
//!
//! Most schema entities carry an `annotations` list of tagged objects
//! (`version_added`, `unsupported`, `deprecated`, `mdn_documentation_url`,
//! free text, code and list blocks, admonitions). A few older fragments
//! put `unsupported` and `deprecated` directly on the entity; both
//! spellings are honored.

use serde_json::Value;

use crate::schema::JsonMap;

/// Tri-state introduction flag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VersionFlag {
    /// Introduced in the given version.
    Added(String),
    /// Unsupported; the entity is omitted from output entirely.
    Unsupported,
    /// Always supported, no annotation.
    #[default]
    Supported,
}

/// Admonition kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Note,
    Hint,
    Warning,
}

impl NoteKind {
    /// The RST directive name.
    pub fn directive(self) -> &'static str {
        match self {
            NoteKind::Note => "note",
            NoteKind::Hint => "hint",
            NoteKind::Warning => "warning",
        }
    }
}

/// A free-standing annotation block rendered after the description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Text(String),
    Code { language: String, content: String },
    List(Vec<String>),
    Admonition { kind: NoteKind, text: String },
}

/// Parsed annotations of one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    pub version: VersionFlag,
    /// Deprecation message; empty when flagged without one.
    pub deprecated: Option<String>,
    pub mdn_url: Option<String>,
    pub blocks: Vec<Block>,
}

impl Annotations {
    /// Parse the annotations of an entity map.
    pub fn of(entity: &JsonMap) -> Self {
        let mut annotations = Annotations::default();

        if entity.get("unsupported").and_then(Value::as_bool) == Some(true) {
            annotations.version = VersionFlag::Unsupported;
        }
        match entity.get("deprecated") {
            Some(Value::Bool(true)) => annotations.deprecated = Some(String::new()),
            Some(Value::String(message)) => annotations.deprecated = Some(message.clone()),
            _ => {}
        }

        let entries = entity
            .get("annotations")
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice);

        for entry in entries {
            let Some(map) = entry.as_object() else {
                continue;
            };
            annotations.apply(map);
        }

        annotations
    }

    fn apply(&mut self, entry: &JsonMap) {
        match entry.get("version_added") {
            Some(Value::String(version)) => self.version = VersionFlag::Added(version.clone()),
            Some(Value::Bool(false)) => self.version = VersionFlag::Unsupported,
            _ => {}
        }
        if entry.get("unsupported").and_then(Value::as_bool) == Some(true) {
            self.version = VersionFlag::Unsupported;
        }
        match entry.get("deprecated") {
            Some(Value::Bool(true)) => self.deprecated = Some(String::new()),
            Some(Value::String(message)) => self.deprecated = Some(message.clone()),
            _ => {}
        }
        if let Some(url) = entry.get("mdn_documentation_url").and_then(Value::as_str) {
            self.mdn_url = Some(url.to_string());
        }
        if let Some(text) = entry.get("text").and_then(Value::as_str) {
            self.blocks.push(Block::Text(text.to_string()));
        }
        if let Some(code) = entry.get("code").and_then(Value::as_str) {
            let language = entry
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("json")
                .to_string();
            self.blocks.push(Block::Code {
                language,
                content: code.to_string(),
            });
        }
        if let Some(items) = entry.get("list").and_then(Value::as_array) {
            let items = items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect();
            self.blocks.push(Block::List(items));
        }
        for (key, kind) in [
            ("note", NoteKind::Note),
            ("hint", NoteKind::Hint),
            ("warning", NoteKind::Warning),
        ] {
            if let Some(text) = entry.get(key).and_then(Value::as_str) {
                self.blocks.push(Block::Admonition {
                    kind,
                    text: text.to_string(),
                });
            }
        }
    }

    /// Whether the entity is omitted from output entirely.
    pub fn is_unsupported(&self) -> bool {
        self.version == VersionFlag::Unsupported
    }

    /// The version string, when introduced in a specific version.
    pub fn version_added(&self) -> Option<&str> {
        match &self.version {
            VersionFlag::Added(version) => Some(version),
            _ => None,
        }
    }
}
