//! Configuration file (pipewright.toml) and its layering over defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pipewright_pipeline::BuildConfig;
use pipewright_server::DevServerConfig;
use serde::Deserialize;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub paths: PathsConfig,
    pub bundle: BundleConfig,
    pub spec: SpecConfig,
    pub server: ServerConfig,
}

/// Source and output locations. Relative paths resolve against `root`.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PathsConfig {
    pub root: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub package: Option<PathBuf>,
    pub scripts: Option<PathBuf>,
    pub vendor: Option<Vec<PathBuf>>,
    pub templates: Option<PathBuf>,
    pub styles: Option<PathBuf>,
    pub styles_output: Option<PathBuf>,
    pub html: Option<PathBuf>,
    pub lib: Option<PathBuf>,
    pub lang: Option<PathBuf>,
    pub watch: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct BundleConfig {
    /// Bundle file name
    pub name: Option<String>,
    /// Namespace templates register under
    pub template_namespace: Option<String>,
    /// Stylesheet entry points, in order
    pub styles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SpecConfig {
    /// YAML specification document
    pub input: Option<PathBuf>,
    /// Content-hash the converted file name
    pub hash: bool,
    /// Manifest file name
    pub manifest: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub open: bool,
}

/// Environment and command-line values, applied last.
#[derive(Debug, Default)]
pub struct Overrides {
    pub output_path: Option<PathBuf>,
    pub input_path: Option<PathBuf>,
    pub input_file: Option<String>,
    pub rev: bool,
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!("Loaded config from {}", path.display());

    Ok(config)
}

impl ConfigFile {
    /// Defaults, then this file, then `overrides`.
    pub fn build_config(&self, overrides: &Overrides) -> BuildConfig {
        let root = self.paths.root.clone().unwrap_or_else(|| PathBuf::from("."));
        let mut config = BuildConfig::rooted(&root);
        let at_root = |path: &PathBuf| root.join(path);

        let paths = &self.paths;
        if let Some(p) = &paths.output {
            config.output_dir = at_root(p);
        }
        if let Some(p) = &paths.package {
            config.package_file = at_root(p);
        }
        if let Some(p) = &paths.scripts {
            config.scripts_dir = at_root(p);
        }
        if let Some(vendor) = &paths.vendor {
            config.vendor_scripts = vendor.iter().map(at_root).collect();
        }
        if let Some(p) = &paths.templates {
            config.templates_dir = at_root(p);
        }
        if let Some(p) = &paths.styles {
            config.styles_dir = at_root(p);
        }
        if let Some(p) = &paths.styles_output {
            config.styles_output = at_root(p);
        }
        if let Some(p) = &paths.html {
            config.html_dir = at_root(p);
        }
        if let Some(p) = &paths.lib {
            config.lib_dir = at_root(p);
        }
        if let Some(p) = &paths.lang {
            config.lang_dir = at_root(p);
        }
        if let Some(p) = &paths.watch {
            config.watch_dir = at_root(p);
        }

        if let Some(name) = &self.bundle.name {
            config.bundle_name = name.clone();
        }
        if let Some(namespace) = &self.bundle.template_namespace {
            config.template_namespace = namespace.clone();
        }
        if let Some(styles) = &self.bundle.styles {
            config.styles = styles.clone();
        }

        if let Some(input) = &self.spec.input {
            config.input_file = at_root(input);
        }
        if let Some(manifest) = &self.spec.manifest {
            config.manifest_name = manifest.clone();
        }
        config.revision = self.spec.hash || overrides.rev;

        if let Some(output_path) = &overrides.output_path {
            config.output_dir = BuildConfig::output_under(output_path);
        }
        if overrides.input_path.is_some() || overrides.input_file.is_some() {
            let input_path = overrides
                .input_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("."));
            config.input_file = BuildConfig::input_from(&input_path, overrides.input_file.as_deref());
        }

        config
    }

    /// Server settings: command-line values win over the file.
    pub fn server_config(
        &self,
        overrides: &Overrides,
        port: Option<u16>,
        host: Option<String>,
        open: bool,
    ) -> DevServerConfig {
        let defaults = DevServerConfig::default();
        DevServerConfig {
            root: self.build_config(overrides).output_dir,
            port: port.or(self.server.port).unwrap_or(defaults.port),
            host: host
                .or_else(|| self.server.host.clone())
                .unwrap_or(defaults.host),
            open: open || self.server.open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();

        let file = load_config(&temp.path().join("pipewright.toml")).unwrap();
        let config = file.build_config(&Overrides::default());

        assert_eq!(config.output_dir, PathBuf::from("./dist"));
        assert_eq!(config.input_file, PathBuf::from("./swagger.yaml"));
        assert_eq!(config.bundle_name, "swagger-ui.js");
        assert!(!config.revision);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("pipewright.toml");
        fs::write(&path, "[paths\nroot = 1").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn file_overrides_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("pipewright.toml");
        fs::write(
            &path,
            r#"
[paths]
root = "web"
output = "public"
vendor = []

[bundle]
name = "api-ui.js"
styles = ["main.less"]

[spec]
input = "api/openapi.yaml"
hash = true
manifest = "assets.json"

[server]
port = 3000
"#,
        )
        .unwrap();

        let file = load_config(&path).unwrap();
        let config = file.build_config(&Overrides::default());

        assert_eq!(config.output_dir, PathBuf::from("web/public"));
        assert_eq!(config.scripts_dir, PathBuf::from("web/src/main/javascript"));
        assert!(config.vendor_scripts.is_empty());
        assert_eq!(config.bundle_name, "api-ui.js");
        assert_eq!(config.minified_name(), "api-ui.min.js");
        assert_eq!(config.styles, vec!["main.less".to_string()]);
        assert_eq!(config.input_file, PathBuf::from("web/api/openapi.yaml"));
        assert_eq!(config.manifest_name, "assets.json");
        assert!(config.revision);

        let server = file.server_config(&Overrides::default(), None, None, false);
        assert_eq!(server.port, 3000);
        assert_eq!(server.host, "localhost");
        assert_eq!(server.root, PathBuf::from("web/public"));
    }

    #[test]
    fn environment_overrides_file() {
        let file: ConfigFile = toml::from_str("[spec]\ninput = \"spec.yaml\"\n").unwrap();
        let overrides = Overrides {
            output_path: Some(PathBuf::from("/srv/site")),
            input_path: Some(PathBuf::from("/srv/specs")),
            input_file: None,
            rev: true,
        };

        let config = file.build_config(&overrides);

        assert_eq!(config.output_dir, PathBuf::from("/srv/site/dist"));
        assert_eq!(config.input_file, PathBuf::from("/srv/specs/swagger.yaml"));
        assert!(config.revision);
    }

    #[test]
    fn command_line_server_flags_win() {
        let file: ConfigFile = toml::from_str("[server]\nport = 3000\nhost = \"0.0.0.0\"\n").unwrap();

        let server = file.server_config(&Overrides::default(), Some(9000), None, true);

        assert_eq!(server.port, 9000);
        assert_eq!(server.host, "0.0.0.0");
        assert!(server.open);
    }
}
