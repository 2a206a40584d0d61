//! Schema validation for `schemadoc check`.
//!
//! Runs the whole merge, resolution and rendering pipeline without
//! keeping any output, so every advisory diagnostic the generator would
//! record is surfaced. With `--strict`, unresolved type references turn
//! into a non-zero exit.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use schemadoc_core::schema::is_global_namespace;
use schemadoc_core::{build_bundle, load_schema_dir, Diagnostics, PermissionTable, Writer};

/// Run the check. Returns the process exit code.
pub fn run(schema_dir: &Path, locale: Option<&Path>, strict: bool) -> Result<i32> {
    let mut diag = Diagnostics::verbose();

    let files = load_schema_dir(schema_dir)
        .with_context(|| format!("Failed to load schema directory `{}`", schema_dir.display()))?;
    let bundle = build_bundle(&files, &mut diag);

    let permissions = match locale {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read locale file `{}`", path.display()))?;
            PermissionTable::from_locale(&text)
        }
        None => PermissionTable::default(),
    };

    let mut page_count = 0usize;
    for name in bundle.namespaces.keys() {
        if is_global_namespace(name) {
            continue;
        }
        if let Some(writer) = Writer::new(&bundle, name, &permissions) {
            let _ = writer.render(&mut diag);
            page_count += 1;
        }
    }

    let missing = diag.missing_type_count();
    if diag.is_empty() {
        println!("ok: {page_count} namespace(s), no problems");
    } else {
        println!(
            "{} namespace(s), {} problem(s), {} unresolved type(s)",
            page_count,
            diag.entries().len(),
            missing
        );
    }

    Ok(i32::from(strict && missing > 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_dir(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("mail.json"), content).unwrap();
        dir
    }

    #[test]
    fn test_clean_schema_exits_zero() {
        let dir = schema_dir(
            r#"[{"namespace": "mail", "types": [{"id": "Folder", "type": "object"}]}]"#,
        );
        let exit = run(dir.path(), None, true).expect("check succeeds");
        assert_eq!(exit, 0);
    }

    #[test]
    fn test_strict_fails_on_unresolved_reference() {
        let dir = schema_dir(
            r#"[{"namespace": "mail", "functions": [{
                "name": "get", "type": "function",
                "parameters": [{"name": "folder", "$ref": "NoSuchType"}]
            }]}]"#,
        );
        let exit = run(dir.path(), None, true).expect("check succeeds");
        assert_eq!(exit, 1);
    }

    #[test]
    fn test_non_strict_always_exits_zero() {
        let dir = schema_dir(
            r#"[{"namespace": "mail", "functions": [{
                "name": "get", "type": "function",
                "parameters": [{"name": "folder", "$ref": "NoSuchType"}]
            }]}]"#,
        );
        let exit = run(dir.path(), None, false).expect("check succeeds");
        assert_eq!(exit, 0);
    }
}
