//! Static checks for browser scripts.

use std::fmt;

use oxc_allocator::Allocator;
use oxc_ast::ast::{BinaryOperator, Expression};
use oxc_ast::AstKind;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single lint finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    /// 1-indexed line
    pub line: usize,
    /// 1-indexed column
    pub column: usize,
    pub severity: Severity,
    pub message: String,
}

/// All findings for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintReport {
    pub file: String,
    pub issues: Vec<LintIssue>,
}

impl LintReport {
    /// No findings.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }
}

/// Stylish output: the file name, then one indented line per finding.
impl fmt::Display for LintReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.file)?;
        for issue in &self.issues {
            let label = match issue.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            writeln!(
                f,
                "  line {} col {}  {}  {}",
                issue.line, issue.column, label, issue.message
            )?;
        }
        let problems = self.issues.len();
        write!(
            f,
            "  {} {}",
            problems,
            if problems == 1 { "problem" } else { "problems" }
        )
    }
}

/// Lint a classic (non-module) browser script.
pub fn lint(file: &str, source: &str) -> LintReport {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();
    let lines = LineIndex::new(source);

    let mut issues: Vec<LintIssue> = parsed
        .errors
        .iter()
        .map(|e| diagnostic_issue(e, &lines))
        .collect();

    if parsed.panicked {
        return finish(file, issues);
    }

    let semantic = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(&parsed.program);
    issues.extend(semantic.errors.iter().map(|e| diagnostic_issue(e, &lines)));

    for node in semantic.semantic.nodes().iter() {
        match node.kind() {
            AstKind::DebuggerStatement(stmt) => {
                issues.push(warning(&lines, stmt.span.start, "Forgotten 'debugger' statement."));
            }
            AstKind::WithStatement(stmt) => {
                issues.push(warning(&lines, stmt.span.start, "Don't use 'with'."));
            }
            AstKind::BinaryExpression(expr) => {
                let strict = match expr.operator {
                    BinaryOperator::Equality => "===",
                    BinaryOperator::Inequality => "!==",
                    _ => continue,
                };
                let literal = loose_literal(&expr.left).or_else(|| loose_literal(&expr.right));
                if let Some(literal) = literal {
                    issues.push(warning(
                        &lines,
                        expr.span.start,
                        &format!("Use '{}' to compare with '{}'.", strict, literal),
                    ));
                }
            }
            _ => {}
        }
    }

    finish(file, issues)
}

fn finish(file: &str, mut issues: Vec<LintIssue>) -> LintReport {
    issues.sort_by_key(|i| (i.line, i.column));
    LintReport {
        file: file.to_string(),
        issues,
    }
}

/// Operands that make `==` coerce surprisingly.
fn loose_literal(expr: &Expression<'_>) -> Option<&'static str> {
    match expr {
        Expression::NullLiteral(_) => Some("null"),
        Expression::BooleanLiteral(b) if b.value => Some("true"),
        Expression::BooleanLiteral(_) => Some("false"),
        Expression::NumericLiteral(n) if n.value == 0.0 => Some("0"),
        Expression::StringLiteral(s) if s.value.is_empty() => Some("''"),
        Expression::Identifier(id) if id.name == "undefined" => Some("undefined"),
        _ => None,
    }
}

fn warning(lines: &LineIndex, offset: u32, message: &str) -> LintIssue {
    let (line, column) = lines.position(offset as usize);
    LintIssue {
        line,
        column,
        severity: Severity::Warning,
        message: message.to_string(),
    }
}

fn diagnostic_issue(diagnostic: &oxc_diagnostics::OxcDiagnostic, lines: &LineIndex) -> LintIssue {
    let offset = diagnostic
        .labels
        .as_ref()
        .and_then(|labels| labels.first())
        .map(|label| label.offset())
        .unwrap_or(0);
    let (line, column) = lines.position(offset);
    LintIssue {
        line,
        column,
        severity: Severity::Error,
        message: diagnostic.message.to_string(),
    }
}

/// Byte offset to line/column lookup.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        (line + 1, offset - self.starts[line] + 1)
    }
}
