//! Template stage: precompile Handlebars sources into namespaced
//! registrations for the bundle.

use std::path::{Component, Path};

use pipewright_hbs::Declarer;

use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::record::{read_records, FileRecord, TEMPLATES_GROUP};
use crate::templates::{TemplateEngine, TEMPLATE_WRAP};

/// Registrations produced by one run of the template stage.
#[derive(Debug, Default)]
pub struct CompiledTemplates {
    /// One record per template, in discovery order
    pub records: Vec<FileRecord>,

    /// Templates that could not be read or failed to compile
    pub failed: Vec<String>,
}

/// Template name for a path relative to the template root: the extension
/// is dropped and directories become dotted namespaces.
pub fn template_name(relative: &Path) -> String {
    let stem = relative.with_extension("");
    stem.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Compile every template under the configured template root.
///
/// A template that can't be read or fails to compile is logged and skipped.
/// Namespace objects are declared once per run.
pub fn run(config: &BuildConfig, engine: &TemplateEngine) -> Result<CompiledTemplates, BuildError> {
    let sources = read_records(&config.templates_dir, &[], TEMPLATES_GROUP);
    let mut declarer = Declarer::new(&config.template_namespace);
    let mut compiled = CompiledTemplates {
        failed: sources.unreadable,
        ..Default::default()
    };

    for source in sources.records {
        let spec = match pipewright_hbs::precompile(&source.contents) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::error!("{}: {}", source.path.display(), e);
                compiled.failed.push(source.path.display().to_string());
                continue;
            }
        };

        let wrapped = engine
            .wrap(TEMPLATE_WRAP, &spec)
            .map_err(|e| BuildError::TemplateError(e.to_string()))?;
        let name = template_name(&source.path);
        tracing::debug!("Compiled template {}", name);

        compiled.records.push(FileRecord::new(
            source.path.with_extension("js"),
            declarer.declare(&name, &wrapped),
            TEMPLATES_GROUP,
        ));
    }

    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn derives_template_names() {
        assert_eq!(template_name(Path::new("main.handlebars")), "main");
        assert_eq!(
            template_name(Path::new("operation/param_list.handlebars")),
            "operation.param_list"
        );
        assert_eq!(template_name(Path::new("README")), "README");
    }

    #[test]
    fn registers_templates_under_namespace() {
        let temp = tempdir().unwrap();
        let config = BuildConfig::rooted(temp.path());
        fs::create_dir_all(&config.templates_dir).unwrap();
        fs::write(config.templates_dir.join("main.handlebars"), "<b>{{title}}</b>").unwrap();
        fs::write(config.templates_dir.join("status.handlebars"), "{{code}}").unwrap();

        let compiled = run(&config, &TemplateEngine::new()).unwrap();

        assert!(compiled.failed.is_empty());
        assert_eq!(compiled.records.len(), 2);
        let first = &compiled.records[0].contents;
        assert!(first.starts_with("this[\"Handlebars\"] = this[\"Handlebars\"] || {};\n"));
        assert!(first.contains("this[\"Handlebars\"][\"templates\"][\"main\"] = Handlebars.template({\"compiler\":[8,\">= 4.3.0\"]"));

        let second = &compiled.records[1].contents;
        assert!(second.starts_with("this[\"Handlebars\"][\"templates\"][\"status\"] = "));
        assert!(compiled.records.iter().all(|r| r.group == TEMPLATES_GROUP));
    }

    #[test]
    fn skips_templates_that_fail_to_compile() {
        let temp = tempdir().unwrap();
        let config = BuildConfig::rooted(temp.path());
        fs::create_dir_all(&config.templates_dir).unwrap();
        fs::write(config.templates_dir.join("bad.handlebars"), "{{#each items}}").unwrap();
        fs::write(config.templates_dir.join("good.handlebars"), "ok").unwrap();

        let compiled = run(&config, &TemplateEngine::new()).unwrap();

        assert_eq!(compiled.records.len(), 1);
        assert_eq!(compiled.failed, vec!["bad.handlebars".to_string()]);
    }

    #[test]
    fn skips_unreadable_files_beside_templates() {
        let temp = tempdir().unwrap();
        let config = BuildConfig::rooted(temp.path());
        fs::create_dir_all(&config.templates_dir).unwrap();
        fs::write(config.templates_dir.join(".DS_Store"), b"\x00\xff\xfe\x00").unwrap();
        fs::write(config.templates_dir.join("main.handlebars"), "{{title}}").unwrap();

        let compiled = run(&config, &TemplateEngine::new()).unwrap();

        assert_eq!(compiled.records.len(), 1);
        assert_eq!(compiled.records[0].path, Path::new("main.js"));
        assert_eq!(compiled.failed, vec![".DS_Store".to_string()]);
    }

    #[test]
    fn missing_template_root_yields_nothing() {
        let temp = tempdir().unwrap();
        let config = BuildConfig::rooted(temp.path());

        let compiled = run(&config, &TemplateEngine::new()).unwrap();

        assert!(compiled.records.is_empty());
    }
}
