//! Script minification.

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;

/// Errors that can occur while minifying.
#[derive(Debug, thiserror::Error)]
pub enum MinifyError {
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Compress, mangle and reprint a classic browser script.
///
/// Top-level names are left untouched so globals keep their meaning.
pub fn minify(source: &str) -> Result<String, MinifyError> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();

    if parsed.panicked || !parsed.errors.is_empty() {
        let messages: Vec<String> = parsed.errors.iter().map(|e| e.message.to_string()).collect();
        return Err(MinifyError::ParseError(messages.join("; ")));
    }

    let mut program = parsed.program;
    let minified = Minifier::new(MinifierOptions::default()).build(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&program)
        .code;

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shrinks_whitespace_and_locals() {
        let source = r#"
(function () {
    var longLocalName = 40;
    window.answer = longLocalName + 2;
}).call(this);
"#;

        let out = minify(source).unwrap();

        assert!(out.len() < source.len());
        assert!(out.contains("window.answer"));
        assert!(!out.contains("longLocalName"));
    }

    #[test]
    fn keeps_top_level_names() {
        let out = minify("function publicApi() { return 1; }\n").unwrap();

        assert!(out.contains("publicApi"));
    }

    #[test]
    fn rejects_invalid_scripts() {
        assert!(matches!(
            minify("function ("),
            Err(MinifyError::ParseError(_))
        ));
    }
}
