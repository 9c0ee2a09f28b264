//! Script linting and minification.
//!
//! Both operations run on the oxc toolchain: sources are parsed once per
//! call, semantic analysis feeds the lint rules, and the minifier output is
//! printed by the oxc code generator.

pub mod lint;
pub mod minify;

pub use lint::{lint, LintIssue, LintReport, Severity};
pub use minify::{minify, MinifyError};
