//! Schema directory loading.
//!
//! Enumerates `*.json` files, strips the `//` and `/* */` license-header
//! comments the upstream schema files carry, and parses each file into an
//! ordered list of namespace entries. Failures here are fatal; no partial
//! output is considered valid.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use super::model::{NamespaceEntry, SchemaFile};

/// Errors raised while loading schema fragments. All of them abort the run.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid schema pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("schema file {path} is not an array of namespace entries")]
    NotAnArray { path: PathBuf },
}

/// Load every `*.json` file under `dir`, sorted by file name so the merge
/// order is deterministic. A directory that cannot be read is fatal; a
/// glob over a missing path would otherwise match nothing and silently
/// succeed.
pub fn load_schema_dir(dir: &Path) -> Result<Vec<SchemaFile>, SchemaError> {
    fs::read_dir(dir).map_err(|source| SchemaError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let pattern = dir.join("*.json");
    let mut paths: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
        .filter_map(Result::ok)
        .collect();
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(load_schema_file(&path)?);
    }
    Ok(files)
}

/// Load and parse one schema file.
pub fn load_schema_file(path: &Path) -> Result<SchemaFile, SchemaError> {
    let text = fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let stripped = strip_comments(&text);
    let value: Value =
        serde_json::from_str(&stripped).map_err(|source| SchemaError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let Value::Array(raw_entries) = value else {
        return Err(SchemaError::NotAnArray {
            path: path.to_path_buf(),
        });
    };

    let entries = raw_entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(map) => NamespaceEntry::from_map(map),
            _ => None,
        })
        .collect();

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    Ok(SchemaFile { stem, entries })
}

/// Remove `//` line comments and `/* */` block comments outside of string
/// literals.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    // Keep line numbers stable for parse errors.
                    if skipped == '\n' {
                        out.push('\n');
                    }
                    prev = skipped;
                }
            }
            _ => out.push(c),
        }
    }

    out
}
