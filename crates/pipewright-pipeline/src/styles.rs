//! Stylesheet compilation.
//!
//! Sources are written in a small Less subset: line comments, `@import`
//! inlining, `@name: value;` variables and nested rules. All of it is
//! resolved here, with nested selectors joined to their parents the way Less
//! does it (`&-suffix` included); lightningcss then validates and prints the
//! flat result.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use regex::{Captures, Regex};

use crate::config::BuildConfig;
use crate::error::BuildError;

/// Limit on variables referring to variables.
const MAX_VARIABLE_DEPTH: usize = 16;

/// At-rules whose bodies hold rules that inherit the enclosing selector.
const CONDITIONAL_AT_RULES: [&str; 5] = ["media", "supports", "container", "layer", "document"];

/// Errors that can occur when compiling a stylesheet.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("Failed to read {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Cannot import {import} from {from}: file not found")]
    ImportError { import: String, from: String },

    #[error("Invalid stylesheet {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Failed to print {path}: {message}")]
    PrintError { path: String, message: String },

    #[error("Variable @{0} is too deeply nested")]
    VariableDepth(String),
}

/// Result of compiling every configured entry point.
#[derive(Debug, Default)]
pub struct StylesSummary {
    /// Stylesheets written
    pub compiled: Vec<PathBuf>,

    /// Entry points that failed, with the reason
    pub failed: Vec<(String, String)>,
}

impl StylesSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Compile every configured entry point into the styles output directory.
///
/// Entries compile independently: a failing entry is logged and skipped.
pub fn run(config: &BuildConfig) -> Result<StylesSummary, BuildError> {
    fs::create_dir_all(&config.styles_output)
        .map_err(|e| BuildError::WriteError(e.to_string()))?;

    let mut summary = StylesSummary::default();

    for entry in &config.styles {
        let source = config.styles_dir.join(entry);
        match compile_file(&source) {
            Ok(css) => {
                let name = Path::new(entry).with_extension("css");
                let output = config.styles_output.join(name);
                if let Some(parent) = output.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| BuildError::WriteError(e.to_string()))?;
                }
                fs::write(&output, css).map_err(|e| BuildError::WriteError(e.to_string()))?;
                tracing::debug!("Compiled {} -> {}", source.display(), output.display());
                summary.compiled.push(output);
            }
            Err(e) => {
                tracing::error!("{}", e);
                summary.failed.push((entry.clone(), e.to_string()));
            }
        }
    }

    Ok(summary)
}

/// Compile one entry point to flat CSS.
pub fn compile_file(path: &Path) -> Result<String, StyleError> {
    let mut seen = HashSet::new();
    let source = inline_imports(path, &mut seen)?;
    compile(&source, &path.display().to_string())
}

/// Compile already-inlined source text to flat CSS.
pub fn compile(source: &str, filename: &str) -> Result<String, StyleError> {
    let (body, variables) = extract_variables(source);
    let expanded = substitute_variables(&body, &variables)?;
    let items = parse_items(&expanded).map_err(|message| StyleError::ParseError {
        path: filename.to_string(),
        message,
    })?;

    let mut flat = String::with_capacity(expanded.len());
    flatten(&items, &[], &mut flat);
    lower(&flat, filename)
}

/// Parse flat CSS and print it normalized.
fn lower(css: &str, filename: &str) -> Result<String, StyleError> {
    let stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_string(),
            ..Default::default()
        },
    )
    .map_err(|e| StyleError::ParseError {
        path: filename.to_string(),
        message: e.to_string(),
    })?;

    let printed = stylesheet
        .to_css(PrinterOptions::default())
        .map_err(|e| StyleError::PrintError {
            path: filename.to_string(),
            message: e.to_string(),
        })?;

    Ok(printed.code)
}

/// Remove `//` comments that are not inside strings, block comments or
/// parentheses (so `url(http://...)` survives).
pub fn strip_line_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;
    let mut in_block = false;
    let mut parens = 0usize;

    while let Some(c) = chars.next() {
        if in_block {
            out.push(c);
            if c == '*' && chars.peek() == Some(&'/') {
                out.push('/');
                chars.next();
                in_block = false;
            }
            continue;
        }

        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '(' => {
                parens += 1;
                out.push(c);
            }
            ')' => {
                parens = parens.saturating_sub(1);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'*') => {
                in_block = true;
                out.push(c);
                out.push('*');
                chars.next();
            }
            '/' if parens == 0 && chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    Code,
    Quoted(char),
    Comment,
}

/// Split `text` into runs of code, quoted strings (quotes included) and
/// block comments.
fn spans(text: &str) -> Vec<(Span, &str)> {
    let mut out = Vec::new();
    let mut kind = Span::Code;
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match kind {
            Span::Code => {
                let opened = match c {
                    '"' | '\'' => Some(Span::Quoted(c)),
                    '/' if chars.peek().is_some_and(|(_, n)| *n == '*') => {
                        chars.next();
                        Some(Span::Comment)
                    }
                    _ => None,
                };
                if let Some(opened) = opened {
                    if i > start {
                        out.push((Span::Code, &text[start..i]));
                    }
                    start = i;
                    kind = opened;
                }
            }
            Span::Quoted(q) => {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    out.push((kind, &text[start..i + 1]));
                    start = i + 1;
                    kind = Span::Code;
                }
            }
            Span::Comment => {
                if c == '*' && chars.peek().is_some_and(|(_, n)| *n == '/') {
                    chars.next();
                    out.push((kind, &text[start..i + 2]));
                    start = i + 2;
                    kind = Span::Code;
                }
            }
        }
    }

    if start < text.len() {
        out.push((kind, &text[start..]));
    }
    out
}

/// A statement or block of a stylesheet before nesting is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// Declaration or at-statement, without its `;`
    Statement(String),

    /// `prelude { children }`
    Block { prelude: String, children: Vec<Item> },
}

/// Parse source into statements and blocks. Block comments are dropped.
fn parse_items(source: &str) -> Result<Vec<Item>, String> {
    fn finish(current: &mut String, items: &mut Vec<Item>) {
        let text = std::mem::take(current);
        let text = text.trim();
        if !text.is_empty() {
            items.push(Item::Statement(text.to_string()));
        }
    }

    let mut stack: Vec<(String, Vec<Item>)> = vec![(String::new(), Vec::new())];
    let mut current = String::new();
    let mut parens = 0usize;

    for (kind, text) in spans(source) {
        match kind {
            Span::Comment => continue,
            Span::Quoted(q) => {
                if !text.ends_with(q) || text.len() < 2 {
                    return Err("unterminated string".to_string());
                }
                current.push_str(text);
                continue;
            }
            Span::Code => {}
        }

        for c in text.chars() {
            match c {
                '(' => {
                    parens += 1;
                    current.push(c);
                }
                ')' => {
                    parens = parens.saturating_sub(1);
                    current.push(c);
                }
                ';' if parens == 0 => {
                    let (_, items) = stack.last_mut().ok_or("unbalanced braces")?;
                    finish(&mut current, items);
                }
                '{' if parens == 0 => {
                    let prelude = std::mem::take(&mut current).trim().to_string();
                    stack.push((prelude, Vec::new()));
                }
                '}' if parens == 0 => {
                    let (prelude, mut children) = match stack.pop() {
                        Some(frame) if !stack.is_empty() => frame,
                        _ => return Err("unexpected '}'".to_string()),
                    };
                    finish(&mut current, &mut children);
                    let (_, items) = stack.last_mut().ok_or("unbalanced braces")?;
                    items.push(Item::Block { prelude, children });
                }
                _ => current.push(c),
            }
        }
    }

    if stack.len() > 1 {
        return Err("unclosed block".to_string());
    }
    let (_, mut items) = stack.pop().ok_or("unbalanced braces")?;
    finish(&mut current, &mut items);
    Ok(items)
}

/// Split a selector list on commas outside parentheses, brackets and strings.
fn split_selectors(prelude: &str) -> Vec<String> {
    let mut selectors = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for (kind, text) in spans(prelude) {
        if kind != Span::Code {
            current.push_str(text);
            continue;
        }
        for c in text.chars() {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    selectors.push(std::mem::take(&mut current).trim().to_string());
                    continue;
                }
                _ => {}
            }
            current.push(c);
        }
    }

    selectors.push(current.trim().to_string());
    selectors.retain(|s| !s.is_empty());
    selectors
}

/// Join a nested selector list to its parents. `&` stands for the parent and
/// may be followed directly by a suffix (`&-active`); a selector without `&`
/// becomes a descendant of the parent.
fn resolve_selectors(parents: &[String], prelude: &str) -> Vec<String> {
    let own = split_selectors(prelude);
    if parents.is_empty() {
        return own;
    }

    parents
        .iter()
        .flat_map(|parent| {
            own.iter().map(move |selector| {
                if selector.contains('&') {
                    selector.replace('&', parent)
                } else {
                    format!("{} {}", parent, selector)
                }
            })
        })
        .collect()
}

fn at_rule_name(prelude: &str) -> Option<&str> {
    let rest = prelude.strip_prefix('@')?;
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '-'))
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Write `items` as flat CSS. Declarations of a rule come first, under its
/// resolved selectors, followed by its nested rules in source order.
fn flatten(items: &[Item], parents: &[String], out: &mut String) {
    let declarations: Vec<&str> = items
        .iter()
        .filter_map(|item| match item {
            Item::Statement(text) => Some(text.as_str()),
            Item::Block { .. } => None,
        })
        .collect();

    if !declarations.is_empty() {
        if parents.is_empty() {
            for declaration in &declarations {
                out.push_str(&format!("{};\n", declaration));
            }
        } else {
            out.push_str(&format!("{} {{\n", parents.join(", ")));
            for declaration in &declarations {
                out.push_str(&format!("  {};\n", declaration));
            }
            out.push_str("}\n");
        }
    }

    for item in items {
        let Item::Block { prelude, children } = item else {
            continue;
        };
        match at_rule_name(prelude) {
            Some(name) => {
                // `-moz-document` and friends
                let base = name.rsplit('-').next().unwrap_or(name);
                out.push_str(&format!("{} {{\n", prelude));
                if CONDITIONAL_AT_RULES.contains(&base) {
                    flatten(children, parents, out);
                } else {
                    write_verbatim(children, out);
                }
                out.push_str("}\n");
            }
            None => flatten(children, &resolve_selectors(parents, prelude), out),
        }
    }
}

/// Write a block body unchanged, as for `@font-face` or `@keyframes`.
fn write_verbatim(items: &[Item], out: &mut String) {
    for item in items {
        match item {
            Item::Statement(text) => out.push_str(&format!("{};\n", text)),
            Item::Block { prelude, children } => {
                out.push_str(&format!("{} {{\n", prelude));
                write_verbatim(children, out);
                out.push_str("}\n");
            }
        }
    }
}

fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*@import[ \t]*(?:\(([^)]*)\)[ \t]*)?(?:"([^"]+)"|'([^']+)')[ \t]*;"#)
            .expect("import pattern is valid")
    })
}

/// Read `path`, strip line comments and recursively inline its imports.
/// Each file is included at most once.
fn inline_imports(path: &Path, seen: &mut HashSet<PathBuf>) -> Result<String, StyleError> {
    let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if !seen.insert(key) {
        return Ok(String::new());
    }

    let source = fs::read_to_string(path).map_err(|e| StyleError::ReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let source = strip_line_comments(&source);
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut out = String::with_capacity(source.len());
    let mut last = 0;

    for caps in import_pattern().captures_iter(&source) {
        let Some(whole) = caps.get(0) else { continue };
        let options = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let Some(target) = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str()) else {
            continue;
        };

        out.push_str(&source[last..whole.start()]);
        last = whole.end();

        if options.split(',').any(|o| o.trim() == "css") || target.ends_with(".css") {
            out.push_str(&format!("@import \"{}\";", target));
            continue;
        }

        let mut import = base.join(target);
        if import.extension().is_none() {
            import.set_extension("less");
        }
        if !import.exists() {
            return Err(StyleError::ImportError {
                import: target.to_string(),
                from: path.display().to_string(),
            });
        }

        out.push_str(&inline_imports(&import, seen)?);
    }

    out.push_str(&source[last..]);
    Ok(out)
}

fn definition_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*@([A-Za-z0-9_-]+)[ \t]*:[ \t]*([^;{}]+);[ \t]*\n?")
            .expect("definition pattern is valid")
    })
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"@\{([A-Za-z0-9_-]+)\}|@([A-Za-z0-9_-]+)")
            .expect("reference pattern is valid")
    })
}

/// Inside strings only the `@{name}` form is interpolated.
fn interpolation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"@\{([A-Za-z0-9_-]+)\}").expect("interpolation pattern is valid")
    })
}

/// Remove variable definitions, returning the remaining text and the
/// variables. Later definitions win.
fn extract_variables(source: &str) -> (String, HashMap<String, String>) {
    let mut variables = HashMap::new();
    for caps in definition_pattern().captures_iter(source) {
        variables.insert(caps[1].to_string(), caps[2].trim().to_string());
    }
    let body = definition_pattern().replace_all(source, "").into_owned();
    (body, variables)
}

/// Replace references to defined variables. Unknown at-keywords such as
/// `@media` are left alone.
fn substitute_variables(
    text: &str,
    variables: &HashMap<String, String>,
) -> Result<String, StyleError> {
    substitute_at_depth(text, variables, 0)
}

fn substitute_at_depth(
    text: &str,
    variables: &HashMap<String, String>,
    depth: usize,
) -> Result<String, StyleError> {
    let mut out = String::with_capacity(text.len());
    for (kind, span) in spans(text) {
        let replaced = match kind {
            Span::Code => replace_references(span, reference_pattern(), variables, depth)?,
            Span::Quoted(_) => replace_references(span, interpolation_pattern(), variables, depth)?,
            Span::Comment => span.to_string(),
        };
        out.push_str(&replaced);
    }
    Ok(out)
}

fn replace_references(
    text: &str,
    pattern: &Regex,
    variables: &HashMap<String, String>,
    depth: usize,
) -> Result<String, StyleError> {
    let mut error = None;

    let replaced = pattern.replace_all(text, |caps: &Captures| {
        let whole = caps[0].to_string();
        let Some(name) = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()) else {
            return whole;
        };
        let Some(value) = variables.get(name) else {
            return whole;
        };
        if depth >= MAX_VARIABLE_DEPTH {
            error = Some(StyleError::VariableDepth(name.to_string()));
            return whole;
        }
        match substitute_at_depth(value, variables, depth + 1) {
            Ok(resolved) => resolved,
            Err(e) => {
                error = Some(e);
                whole
            }
        }
    });

    match error {
        Some(e) => Err(e),
        None => Ok(replaced.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn squash(css: &str) -> String {
        css.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn strips_line_comments_only_outside_strings_and_urls() {
        let source = "a { color: red; } // trailing\n\
                      b { background: url(http://example.com/x.png); }\n\
                      c { content: \"//not a comment\"; }\n\
                      /* block // kept */\n";

        let stripped = strip_line_comments(source);

        assert!(!stripped.contains("trailing"));
        assert!(stripped.contains("url(http://example.com/x.png)"));
        assert!(stripped.contains("\"//not a comment\""));
        assert!(stripped.contains("/* block // kept */"));
    }

    #[test]
    fn resolves_variables() {
        let source = "@base: #333;\n@text: @base;\n@name: header;\n.@{name} { color: @text; }\n";

        let css = compile(source, "vars.less").unwrap();

        assert_eq!(squash(&css), ".header { color: #333; }");
    }

    #[test]
    fn later_definitions_win() {
        let css = compile("@c: #123456;\n@c: #654321;\na { color: @c; }\n", "x.less").unwrap();

        assert!(css.contains("#654321"));
        assert!(!css.contains("#123456"));
    }

    #[test]
    fn leaves_at_rules_alone() {
        let css = compile(
            "@w: 600px;\n@media (max-width: @w) { a { color: red; } }\n",
            "media.less",
        )
        .unwrap();

        assert!(css.contains("@media"));
        assert!(css.contains("600px"));
    }

    #[test]
    fn flattens_nested_rules() {
        let css = compile(".swagger-ui { .info { margin: 0; } }\n", "nest.less").unwrap();

        assert!(squash(&css).contains(".swagger-ui .info { margin: 0; }"));
    }

    #[test]
    fn leaves_bare_references_in_strings() {
        let css = compile(
            "@x: 1px;\n@name: logo;\na { content: \"@x\"; background: url('@{name}.png'); width: @x; }\n",
            "strings.less",
        )
        .unwrap();

        assert!(css.contains("\"@x\""), "{css}");
        assert!(css.contains("logo.png"), "{css}");
        assert!(css.contains("width: 1px"), "{css}");
    }

    #[test]
    fn joins_parent_selector_suffixes() {
        let css = compile(
            ".btn { color: #000; &-primary { color: #222; } &:hover { color: #333; } }\n",
            "bem.less",
        )
        .unwrap();

        assert_eq!(
            squash(&css),
            ".btn { color: #000; } .btn-primary { color: #222; } .btn:hover { color: #333; }"
        );
    }

    #[test]
    fn joins_suffixes_for_each_parent_selector() {
        let css = compile(".a, .b { &-x, .c { margin: 0; } }\n", "list.less").unwrap();

        assert_eq!(squash(&css), ".a-x, .a .c, .b-x, .b .c { margin: 0; }");
    }

    #[test]
    fn keeps_parent_declarations_before_nested_rules() {
        let css = compile(
            ".btn { &-primary { color: #222; } color: #000; }\n",
            "order.less",
        )
        .unwrap();

        assert_eq!(squash(&css), ".btn { color: #000; } .btn-primary { color: #222; }");
    }

    #[test]
    fn nests_media_queries_under_parent_selector() {
        let css = compile(
            ".panel { @media (max-width: 600px) { padding: 0; &-body { margin: 0; } } }\n",
            "media.less",
        )
        .unwrap();

        assert_eq!(
            squash(&css),
            "@media (max-width: 600px) { .panel { padding: 0; } .panel-body { margin: 0; } }"
        );
    }

    #[test]
    fn rejects_unbalanced_braces() {
        assert!(matches!(
            compile(".a { color: red;\n", "open.less"),
            Err(StyleError::ParseError { .. })
        ));
        assert!(matches!(
            compile(".a { }\n}\n", "close.less"),
            Err(StyleError::ParseError { .. })
        ));
    }

    #[test]
    fn detects_self_referencing_variables() {
        let result = compile("@a: @a;\nb { color: @a; }\n", "loop.less");

        assert!(matches!(result, Err(StyleError::VariableDepth(_))));
    }

    #[test]
    fn reports_invalid_css() {
        let result = compile("..a { color: red; }\n", "broken.less");

        assert!(result.is_err());
    }

    #[test]
    fn inlines_imports_once() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("colors.less"), "@brand: #89bf04;\n").unwrap();
        fs::write(
            temp.path().join("screen.less"),
            "@import \"colors\";\n@import 'colors.less';\n@import (css) \"fonts.css\";\n.logo { color: @brand; }\n",
        )
        .unwrap();

        let css = compile_file(&temp.path().join("screen.less")).unwrap();

        assert!(css.contains("#89bf04"));
        assert!(css.contains("fonts.css"));
    }

    #[test]
    fn missing_import_is_an_error() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("screen.less"), "@import \"absent\";\n").unwrap();

        let result = compile_file(&temp.path().join("screen.less"));

        assert!(matches!(result, Err(StyleError::ImportError { .. })));
    }

    #[test]
    fn compiles_each_entry_independently() {
        let temp = tempdir().unwrap();
        let config = BuildConfig::rooted(temp.path());
        fs::create_dir_all(&config.styles_dir).unwrap();
        fs::write(config.styles_dir.join("screen.less"), ".a { .b { color: red; } }\n").unwrap();
        fs::write(config.styles_dir.join("print.less"), "@import \"gone\";\n").unwrap();
        fs::write(config.styles_dir.join("style.less"), "body { margin: 0; }\n").unwrap();

        let summary = run(&config).unwrap();

        assert!(config.styles_output.join("screen.css").exists());
        assert!(config.styles_output.join("style.css").exists());
        assert!(!config.styles_output.join("print.css").exists());
        assert_eq!(summary.compiled.len(), 2);
        let failed: Vec<&str> = summary.failed.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(failed, vec!["print.less", "reset.less"]);
        assert!(!summary.is_success());
    }
}
