//! Page generation for `schemadoc generate`.

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use schemadoc_core::schema::is_global_namespace;
use schemadoc_core::template::{condition_filter, substitute_placeholder, TemplateConfig};
use schemadoc_core::{build_bundle, load_schema_dir, Diagnostics, PermissionTable, Writer};

/// Placeholder token replaced by the sorted page list in template files.
const PAGE_LIST_TOKEN: &str = "{{api_pages}}";

/// Options for page generation.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Directory holding the `*.json` schema fragments.
    pub schema_dir: PathBuf,

    /// Static template tree copied into the output directory.
    pub template_dir: Option<PathBuf>,

    /// Output directory; cleared and recreated on every run.
    pub out_dir: PathBuf,

    /// Locale file with permission description strings.
    pub locale: Option<PathBuf>,

    /// Target manifest version for template condition blocks.
    pub manifest_version: Option<u32>,

    /// Release channel for template condition blocks.
    pub channel: Option<String>,

    /// Write the combined raw schema input to this file.
    pub dump_schema: Option<PathBuf>,

    /// Print diagnostics as they are recorded.
    pub verbose: bool,
}

/// Merge the schema directory and write one RST page per namespace.
pub fn run(options: &GenerateOptions) -> Result<()> {
    let mut diag = if options.verbose {
        Diagnostics::verbose()
    } else {
        Diagnostics::default()
    };

    let files = load_schema_dir(&options.schema_dir).with_context(|| {
        format!(
            "Failed to load schema directory `{}`",
            options.schema_dir.display()
        )
    })?;
    let bundle = build_bundle(&files, &mut diag);
    let permissions = load_permissions(options.locale.as_deref())?;

    if options.out_dir.exists() {
        fs::remove_dir_all(&options.out_dir).with_context(|| {
            format!(
                "Failed to clear output directory `{}`",
                options.out_dir.display()
            )
        })?;
    }
    fs::create_dir_all(&options.out_dir).with_context(|| {
        format!(
            "Failed to create output directory `{}`",
            options.out_dir.display()
        )
    })?;

    let mut pages = Vec::new();
    for name in bundle.namespaces.keys() {
        if is_global_namespace(name) {
            continue;
        }
        let Some(writer) = Writer::new(&bundle, name, &permissions) else {
            continue;
        };
        let page = writer.render(&mut diag);
        let path = options.out_dir.join(format!("{name}.rst"));
        fs::write(&path, &page.content)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
        pages.push(name.clone());
    }

    if let Some(template_dir) = &options.template_dir {
        let config = template_config(options);
        copy_template(template_dir, &options.out_dir, &config, &pages)?;
    }

    if let Some(dump_path) = &options.dump_schema {
        dump_schema(&files, dump_path)?;
    }

    if !diag.is_empty() {
        eprintln!(
            "schemadoc: {} problem(s) recorded across {} page(s)",
            diag.entries().len(),
            pages.len()
        );
    }

    Ok(())
}

fn load_permissions(locale: Option<&Path>) -> Result<PermissionTable> {
    match locale {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read locale file `{}`", path.display()))?;
            Ok(PermissionTable::from_locale(&text))
        }
        None => Ok(PermissionTable::default()),
    }
}

fn template_config(options: &GenerateOptions) -> TemplateConfig {
    let mut config = TemplateConfig::new();
    if let Some(version) = options.manifest_version {
        config.insert("manifest_version".to_string(), version.to_string());
    }
    if let Some(channel) = &options.channel {
        config.insert("channel".to_string(), channel.clone());
    }
    config
}

/// Copy the template tree into the output directory. RST files pass
/// through the condition filter and the page-list placeholder; anything
/// else is copied byte for byte.
fn copy_template(
    src: &Path,
    dst: &Path,
    config: &TemplateConfig,
    pages: &[String],
) -> Result<()> {
    for entry in fs::read_dir(src)
        .with_context(|| format!("Failed to read template directory `{}`", src.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        let target = dst.join(entry.file_name());

        if path.is_dir() {
            fs::create_dir_all(&target)?;
            copy_template(&path, &target, config, pages)?;
        } else if path.extension().and_then(OsStr::to_str) == Some("rst") {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template file `{}`", path.display()))?;
            let filtered = condition_filter(&text, config);
            let substituted = substitute_placeholder(&filtered, PAGE_LIST_TOKEN, pages);
            fs::write(&target, substituted)
                .with_context(|| format!("Failed to write `{}`", target.display()))?;
        } else {
            fs::copy(&path, &target)
                .with_context(|| format!("Failed to copy `{}`", path.display()))?;
        }
    }
    Ok(())
}

/// Write the combined raw input as one JSON document, keyed by file stem.
fn dump_schema(files: &[schemadoc_core::SchemaFile], path: &Path) -> Result<()> {
    let mut combined = serde_json::Map::new();
    for file in files {
        let entries: Vec<serde_json::Value> = file
            .entries
            .iter()
            .map(|entry| serde_json::Value::Object(entry.fields().clone()))
            .collect();
        combined.insert(file.stem.clone(), serde_json::Value::Array(entries));
    }
    let text = serde_json::to_string_pretty(&serde_json::Value::Object(combined))?;
    fs::write(path, text)
        .with_context(|| format!("Failed to write schema dump `{}`", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_writes_pages_and_skips_global_namespaces() {
        let root = tempfile::tempdir().expect("tempdir");
        let schema_dir = root.path().join("schemas");
        fs::create_dir(&schema_dir).unwrap();
        fs::write(
            schema_dir.join("mail.json"),
            r#"[{"namespace": "mail", "functions": [{"name": "get", "type": "function"}]}]"#,
        )
        .unwrap();
        fs::write(
            schema_dir.join("manifest.json"),
            r#"[{"namespace": "manifest", "types": []}]"#,
        )
        .unwrap();

        let out_dir = root.path().join("out");
        let options = GenerateOptions {
            schema_dir,
            out_dir: out_dir.clone(),
            ..GenerateOptions::default()
        };
        run(&options).expect("generate succeeds");

        assert!(out_dir.join("mail.rst").exists());
        assert!(!out_dir.join("manifest.rst").exists());
        let content = fs::read_to_string(out_dir.join("mail.rst")).unwrap();
        assert!(content.contains("get()"));
    }

    #[test]
    fn test_out_dir_is_recreated() {
        let root = tempfile::tempdir().expect("tempdir");
        let schema_dir = root.path().join("schemas");
        fs::create_dir(&schema_dir).unwrap();
        fs::write(schema_dir.join("a.json"), r#"[{"namespace": "a"}]"#).unwrap();

        let out_dir = root.path().join("out");
        fs::create_dir(&out_dir).unwrap();
        fs::write(out_dir.join("stale.rst"), "old").unwrap();

        let options = GenerateOptions {
            schema_dir,
            out_dir: out_dir.clone(),
            ..GenerateOptions::default()
        };
        run(&options).expect("generate succeeds");

        assert!(!out_dir.join("stale.rst").exists());
    }

    #[test]
    fn test_template_filters_apply() {
        let root = tempfile::tempdir().expect("tempdir");
        let schema_dir = root.path().join("schemas");
        fs::create_dir(&schema_dir).unwrap();
        fs::write(schema_dir.join("mail.json"), r#"[{"namespace": "mail"}]"#).unwrap();

        let template_dir = root.path().join("template");
        fs::create_dir(&template_dir).unwrap();
        fs::write(
            template_dir.join("index.rst"),
            "{{CONDITION: manifest_version=2}}legacy\n{{/CONDITION}}.. toctree::\n\n   {{api_pages}}\n",
        )
        .unwrap();
        fs::write(template_dir.join("conf.py"), "project = 'docs'\n").unwrap();

        let out_dir = root.path().join("out");
        let options = GenerateOptions {
            schema_dir,
            template_dir: Some(template_dir),
            out_dir: out_dir.clone(),
            manifest_version: Some(3),
            ..GenerateOptions::default()
        };
        run(&options).expect("generate succeeds");

        let index = fs::read_to_string(out_dir.join("index.rst")).unwrap();
        assert!(!index.contains("legacy"));
        assert!(index.contains("   mail"));
        assert!(out_dir.join("conf.py").exists());
    }

    #[test]
    fn test_dump_schema_combines_inputs() {
        let root = tempfile::tempdir().expect("tempdir");
        let schema_dir = root.path().join("schemas");
        fs::create_dir(&schema_dir).unwrap();
        fs::write(schema_dir.join("mail.json"), r#"[{"namespace": "mail"}]"#).unwrap();

        let dump = root.path().join("dump.json");
        let options = GenerateOptions {
            schema_dir,
            out_dir: root.path().join("out"),
            dump_schema: Some(dump.clone()),
            ..GenerateOptions::default()
        };
        run(&options).expect("generate succeeds");

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dump).unwrap()).unwrap();
        assert_eq!(value["mail"][0]["namespace"], "mail");
    }
}
