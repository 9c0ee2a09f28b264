//! Script tasks: lint first-party sources, build the bundle.

use std::fs;
use std::path::PathBuf;

use pipewright_js::{lint, minify};

use crate::config::{BuildConfig, PackageInfo};
use crate::error::BuildError;
use crate::precompile;
use crate::record::{concat, order_groups, read_records, FileRecord, BUNDLE_ORDER, SCRIPTS_GROUP};
use crate::templates::{TemplateEngine, BUNDLE_WRAP};

/// Totals from a lint run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LintSummary {
    pub files: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// Lint every first-party script and print a report per file with findings.
///
/// Findings never fail the task. Unreadable files are logged and skipped.
pub fn lint_sources(config: &BuildConfig) -> Result<LintSummary, BuildError> {
    let sources = read_records(&config.scripts_dir, &["js"], SCRIPTS_GROUP);
    let mut summary = LintSummary::default();

    for source in &sources.records {
        let report = lint(&source.path.display().to_string(), &source.contents);
        summary.files += 1;
        summary.errors += report.error_count();
        summary.warnings += report.warning_count();
        if !report.is_clean() {
            tracing::warn!("\n{}", report);
        }
    }

    if summary.errors + summary.warnings > 0 {
        tracing::warn!(
            "{} problems ({} errors, {} warnings) in {} files",
            summary.errors + summary.warnings,
            summary.errors,
            summary.warnings,
            summary.files
        );
    }

    Ok(summary)
}

/// Result of building the bundle.
#[derive(Debug)]
pub struct DistSummary {
    /// Readable bundle
    pub bundle: PathBuf,

    /// Minified bundle, absent when minification failed
    pub minified: Option<PathBuf>,

    /// Script records bundled (first-party and vendored)
    pub scripts: usize,

    /// Template registrations bundled
    pub templates: usize,

    /// Files left out of the bundle because they could not be read or compiled
    pub skipped: Vec<String>,
}

impl DistSummary {
    pub fn is_success(&self) -> bool {
        self.minified.is_some() && self.skipped.is_empty()
    }
}

/// Gather scripts, vendored libraries and template registrations in bundle
/// order, along with the first-party files that had to be left out.
pub fn collect(
    config: &BuildConfig,
    engine: &TemplateEngine,
) -> Result<(Vec<FileRecord>, Vec<String>), BuildError> {
    let scripts = read_records(&config.scripts_dir, &["js"], SCRIPTS_GROUP);
    let mut records = scripts.records;
    let mut skipped = scripts.unreadable;

    for vendor in &config.vendor_scripts {
        match fs::read_to_string(vendor) {
            Ok(contents) => records.push(FileRecord::new(vendor.clone(), contents, SCRIPTS_GROUP)),
            Err(e) => tracing::warn!("Skipping vendored script {}: {}", vendor.display(), e),
        }
    }

    let templates = precompile::run(config, engine)?;
    records.extend(templates.records);
    skipped.extend(templates.failed);

    Ok((order_groups(records, &BUNDLE_ORDER), skipped))
}

/// Build the readable and minified bundles into the output directory.
pub fn dist(config: &BuildConfig, engine: &TemplateEngine) -> Result<DistSummary, BuildError> {
    let pkg = PackageInfo::load(&config.package_file)?;
    let (records, skipped) = collect(config, engine)?;
    let templates = records
        .iter()
        .filter(|r| r.group != SCRIPTS_GROUP)
        .count();

    let bundle = concat(&records, &config.bundle_name);
    let wrapped = engine
        .wrap(BUNDLE_WRAP, &bundle.contents)
        .map_err(|e| BuildError::TemplateError(e.to_string()))?;
    let banner = engine
        .banner(&pkg)
        .map_err(|e| BuildError::TemplateError(e.to_string()))?;

    fs::create_dir_all(&config.output_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;

    let bundle_path = config.output_dir.join(&config.bundle_name);
    fs::write(&bundle_path, format!("{}{}", banner, wrapped))
        .map_err(|e| BuildError::WriteError(e.to_string()))?;
    tracing::info!("Wrote {}", bundle_path.display());

    let minified = match minify(&wrapped) {
        Ok(code) => {
            let path = config.output_dir.join(config.minified_name());
            fs::write(&path, format!("{}{}", banner, code))
                .map_err(|e| BuildError::WriteError(e.to_string()))?;
            tracing::info!("Wrote {}", path.display());
            Some(path)
        }
        Err(e) => {
            tracing::error!("Failed to minify {}: {}", config.bundle_name, e);
            None
        }
    };

    Ok(DistSummary {
        bundle: bundle_path,
        minified,
        scripts: records.len() - templates,
        templates,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PACKAGE: &str = r#"{
        "name": "swagger-ui",
        "description": "API explorer",
        "version": "2.1.4",
        "homepage": "http://swagger.io",
        "license": "Apache-2.0"
    }"#;

    fn project() -> (tempfile::TempDir, BuildConfig) {
        let temp = tempdir().unwrap();
        let config = BuildConfig::rooted(temp.path());
        fs::write(&config.package_file, PACKAGE).unwrap();
        fs::create_dir_all(&config.scripts_dir).unwrap();
        fs::create_dir_all(&config.templates_dir).unwrap();
        (temp, config)
    }

    #[test]
    fn lint_counts_findings_without_failing() {
        let (_temp, config) = project();
        fs::write(config.scripts_dir.join("a.js"), "var a = 1;\n").unwrap();
        fs::write(config.scripts_dir.join("b.js"), "debugger;\nif (x == null) {}\n").unwrap();

        let summary = lint_sources(&config).unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.warnings, 2);
        assert_eq!(summary.errors, 0);
    }

    #[test]
    fn bundles_scripts_before_templates() {
        let (_temp, config) = project();
        fs::write(config.scripts_dir.join("view.js"), "var view = 'VIEW';").unwrap();
        fs::write(config.templates_dir.join("main.handlebars"), "<h1>{{title}}</h1>").unwrap();
        let vendor = &config.vendor_scripts[0];
        fs::create_dir_all(vendor.parent().unwrap()).unwrap();
        fs::write(vendor, "var client = 'CLIENT';").unwrap();

        let summary = dist(&config, &TemplateEngine::new()).unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.scripts, 2);
        assert_eq!(summary.templates, 1);

        let bundle = fs::read_to_string(&summary.bundle).unwrap();
        assert!(bundle.starts_with("/**\n * swagger-ui - API explorer\n * @version v2.1.4\n"));
        assert!(bundle.contains("(function(){var view = 'VIEW';\nvar client = 'CLIENT';\nthis[\"Handlebars\"]"));
        assert!(bundle.ends_with("}).call(this);"));
        let view = bundle.find("VIEW").unwrap();
        let client = bundle.find("CLIENT").unwrap();
        let template = bundle.find("Handlebars.template(").unwrap();
        assert!(view < client && client < template);
    }

    #[test]
    fn writes_minified_bundle_with_banner() {
        let (_temp, config) = project();
        fs::write(
            config.scripts_dir.join("app.js"),
            "function greet(name) {\n  var message = 'hello ' + name;\n  return message;\n}\nwindow.greet = greet;\n",
        )
        .unwrap();

        let summary = dist(&config, &TemplateEngine::new()).unwrap();

        let minified = fs::read_to_string(summary.minified.unwrap()).unwrap();
        assert!(minified.starts_with("/**\n * swagger-ui"));
        assert!(minified.contains("@license Apache-2.0"));
        assert!(minified.contains("window.greet"));
        let readable = fs::read_to_string(&summary.bundle).unwrap();
        assert!(minified.len() < readable.len());
        assert_eq!(
            config.output_dir.join("swagger-ui.min.js"),
            config.output_dir.join(config.minified_name())
        );
    }

    #[test]
    fn keeps_readable_bundle_when_minify_fails() {
        let (_temp, config) = project();
        fs::write(config.scripts_dir.join("broken.js"), "var = ;").unwrap();

        let summary = dist(&config, &TemplateEngine::new()).unwrap();

        assert!(summary.bundle.exists());
        assert!(summary.minified.is_none());
        assert!(!config.output_dir.join("swagger-ui.min.js").exists());
        assert!(!summary.is_success());
    }

    #[test]
    fn writes_bundle_past_unreadable_sources() {
        let (_temp, config) = project();
        fs::write(config.scripts_dir.join("app.js"), "var app = 'APP';").unwrap();
        fs::write(config.scripts_dir.join("cache.js"), b"\xff\xfe\x00").unwrap();
        fs::write(config.templates_dir.join(".DS_Store"), b"\x00\xff\xfe\x00").unwrap();
        fs::write(config.templates_dir.join("main.handlebars"), "<h1>{{title}}</h1>").unwrap();

        let summary = dist(&config, &TemplateEngine::new()).unwrap();

        assert!(summary.bundle.exists());
        assert!(summary.minified.is_some());
        assert_eq!(summary.scripts, 1);
        assert_eq!(summary.templates, 1);
        assert_eq!(
            summary.skipped,
            vec!["cache.js".to_string(), ".DS_Store".to_string()]
        );
        assert!(!summary.is_success());

        let bundle = fs::read_to_string(&summary.bundle).unwrap();
        assert!(bundle.contains("var app = 'APP';"));
        assert!(bundle.contains("this[\"Handlebars\"][\"templates\"][\"main\"] = "));
    }

    #[test]
    fn lint_skips_unreadable_scripts() {
        let (_temp, config) = project();
        fs::write(config.scripts_dir.join("a.js"), "var a = 1;\n").unwrap();
        fs::write(config.scripts_dir.join("b.js"), b"\xff\xfe\x00").unwrap();

        let summary = lint_sources(&config).unwrap();

        assert_eq!(summary.files, 1);
    }

    #[test]
    fn missing_package_metadata_fails() {
        let (_temp, config) = project();
        fs::remove_file(&config.package_file).unwrap();

        let result = dist(&config, &TemplateEngine::new());

        assert!(matches!(result, Err(BuildError::PackageError(_))));
    }
}
