//! Build configuration and package metadata.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Default specification document name.
pub const DEFAULT_INPUT_FILE: &str = "swagger.yaml";

/// Configuration for a build.
///
/// Relative paths are resolved against the process working directory.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Distribution directory, wiped by `clean`
    pub output_dir: PathBuf,

    /// YAML specification document
    pub input_file: PathBuf,

    /// Package metadata used for the banner
    pub package_file: PathBuf,

    /// First-party scripts, linted and bundled
    pub scripts_dir: PathBuf,

    /// Vendored client libraries bundled after first-party scripts
    pub vendor_scripts: Vec<PathBuf>,

    /// Handlebars template sources
    pub templates_dir: PathBuf,

    /// Namespace precompiled templates register under
    pub template_namespace: String,

    /// Stylesheet sources
    pub styles_dir: PathBuf,

    /// Stylesheet entry points, compiled in this order
    pub styles: Vec<String>,

    /// Where compiled stylesheets are written
    pub styles_output: PathBuf,

    /// Static HTML/CSS assets copied to the output root
    pub html_dir: PathBuf,

    /// Prebuilt libraries copied to `lib/`
    pub lib_dir: PathBuf,

    /// Translations copied to `lang/`
    pub lang_dir: PathBuf,

    /// Tree watched for changes in watch mode
    pub watch_dir: PathBuf,

    /// Bundle file name
    pub bundle_name: String,

    /// Embed a content hash in the converted specification's file name
    pub revision: bool,

    /// Manifest file name inside the output directory
    pub manifest_name: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::rooted(Path::new("."))
    }
}

impl BuildConfig {
    /// Default layout relative to a project root.
    pub fn rooted(root: &Path) -> Self {
        Self {
            output_dir: root.join("dist"),
            input_file: root.join(DEFAULT_INPUT_FILE),
            package_file: root.join("package.json"),
            scripts_dir: root.join("src/main/javascript"),
            vendor_scripts: vec![root.join("node_modules/swagger-client/browser/swagger-client.js")],
            templates_dir: root.join("src/main/template"),
            template_namespace: "Handlebars.templates".to_string(),
            styles_dir: root.join("src/main/less"),
            styles: ["screen.less", "print.less", "reset.less", "style.less"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            styles_output: root.join("src/main/html/css"),
            html_dir: root.join("src/main/html"),
            lib_dir: root.join("lib"),
            lang_dir: root.join("lang"),
            watch_dir: root.join("src"),
            bundle_name: "swagger-ui.js".to_string(),
            revision: false,
            manifest_name: "rev-manifest.json".to_string(),
        }
    }

    /// Output directory under `output_path`, the way `OUTPUT_PATH` is applied.
    pub fn output_under(output_path: &Path) -> PathBuf {
        output_path.join("dist")
    }

    /// Input document path from `INPUT_PATH` and `INPUT_FILE`.
    pub fn input_from(input_path: &Path, input_file: Option<&str>) -> PathBuf {
        input_path.join(input_file.unwrap_or(DEFAULT_INPUT_FILE))
    }

    /// Minified bundle file name (`name.js` -> `name.min.js`).
    pub fn minified_name(&self) -> String {
        let path = Path::new(&self.bundle_name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("bundle");
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.min.{}", stem, ext),
            None => format!("{}.min", stem),
        }
    }
}

/// Package metadata interpolated into the banner.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PackageInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub license: String,
}

impl PackageInfo {
    /// Load metadata from a `package.json` file.
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let content = fs::read_to_string(path)
            .map_err(|e| BuildError::PackageError(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| BuildError::PackageError(format!("{}: {}", path.display(), e)))
    }
}
