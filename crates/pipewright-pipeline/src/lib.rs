//! Build tasks for the pipewright front-end pipeline.
//!
//! Converts the API specification from YAML to JSON, compiles stylesheets,
//! precompiles templates, bundles and minifies scripts and copies static
//! assets, all sequenced by a small dependency-ordered task runner.

pub mod config;
pub mod copy;
pub mod error;
pub mod manifest;
pub mod precompile;
pub mod record;
pub mod scripts;
pub mod styles;
pub mod tasks;
pub mod templates;
pub mod yaml;

pub use config::{BuildConfig, PackageInfo, DEFAULT_INPUT_FILE};
pub use error::BuildError;
pub use record::FileRecord;
pub use tasks::{
    standard_graph, GraphError, Orchestrator, ReloadNotifier, RunSummary, Target, TaskError,
    TaskGraph,
};
pub use yaml::{convert_yaml_to_json, ConvertedSpec, YamlError};
