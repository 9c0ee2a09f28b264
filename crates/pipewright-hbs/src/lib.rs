//! Handlebars template precompiler.
//!
//! Parses Handlebars templates and emits the JavaScript template spec the
//! browser runtime registers with `Handlebars.template(...)`, so templates
//! ship precompiled inside the script bundle.

pub mod ast;
pub mod codegen;
pub mod declare;
pub mod parser;

pub use ast::{Call, Literal, Node, Param, PathExpr, Program};
pub use codegen::{generate, js_string};
pub use declare::Declarer;
pub use parser::{parse, CompileError};

/// Compile template source into a JavaScript template spec object.
pub fn precompile(source: &str) -> Result<String, CompileError> {
    let program = parse(source)?;
    Ok(generate(&program))
}
