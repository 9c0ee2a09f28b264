//! Errors shared by the build tasks.

/// Errors that can occur while running a build task.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read {0}")]
    ReadError(String),

    #[error("Failed to write output: {0}")]
    WriteError(String),

    #[error("Failed to load package metadata: {0}")]
    PackageError(String),

    #[error("Failed to render template: {0}")]
    TemplateError(String),

    #[error("Failed to update manifest: {0}")]
    ManifestError(String),
}
