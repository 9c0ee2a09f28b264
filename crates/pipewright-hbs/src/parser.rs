//! Template parser.
//!
//! Splits the source into text and `{{ }}` tags, applies standalone-line and `~`
//! whitespace control, then folds the tag stream into a [`Program`].

use crate::ast::{Call, Literal, Node, Param, PathExpr, Program};

/// Errors that can occur when parsing a template.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("Unclosed tag at line {line}, column {column}")]
    UnclosedTag { line: usize, column: usize },

    #[error("Unclosed block '{name}' opened at line {line}, column {column}")]
    UnclosedBlock {
        name: String,
        line: usize,
        column: usize,
    },

    #[error("'{found}' doesn't match '{expected}' at line {line}, column {column}")]
    MismatchedClose {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },

    #[error("Unexpected '{tag}' at line {line}, column {column}")]
    Unexpected {
        tag: String,
        line: usize,
        column: usize,
    },

    #[error("Invalid expression at line {line}, column {column}: {message}")]
    InvalidExpression {
        message: String,
        line: usize,
        column: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Comment,
    Mustache,
    Raw,
    Open,
    Inverse,
    Else,
    Close,
    Partial,
}

#[derive(Debug, Clone)]
struct Tag {
    kind: TagKind,
    body: String,
    strip_left: bool,
    strip_right: bool,
    line: usize,
    column: usize,
}

#[derive(Debug, Clone)]
enum Token {
    Text(String),
    Tag(Tag),
}

/// Parse template source into a program.
pub fn parse(source: &str) -> Result<Program, CompileError> {
    let mut tokens = tokenize(source)?;
    apply_whitespace_control(&mut tokens);
    build(tokens)
}

fn position(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while let Some(found) = source[pos..].find("{{") {
        let start = pos + found;

        // `\{{` renders the braces literally
        if start > 0 && source.as_bytes()[start - 1] == b'\\' {
            text.push_str(&source[pos..start - 1]);
            text.push_str("{{");
            pos = start + 2;
            continue;
        }

        text.push_str(&source[pos..start]);
        if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(&mut text)));
        }

        let (line, column) = position(source, start);
        let (tag, end) = read_tag(source, start, line, column)?;
        tokens.push(Token::Tag(tag));
        pos = end;
    }

    text.push_str(&source[pos..]);
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }

    Ok(tokens)
}

/// Read one tag starting at `start` (pointing at `{{`). Returns the tag and
/// the offset just past its closing braces.
fn read_tag(
    source: &str,
    start: usize,
    line: usize,
    column: usize,
) -> Result<(Tag, usize), CompileError> {
    let unclosed = CompileError::UnclosedTag { line, column };
    let mut cursor = start + 2;
    let rest = &source[cursor..];

    let strip_left = rest.starts_with('~');
    if strip_left {
        cursor += 1;
    }
    let rest = &source[cursor..];

    // Comments may contain `}}` in the long form, so they are delimited first
    if let Some(body) = rest.strip_prefix("!--") {
        let (close, strip_right) = first_of(body, "--}}", "--~}}").ok_or(unclosed)?;
        let end = cursor + 3 + close + if strip_right { 5 } else { 4 };
        return Ok((
            Tag {
                kind: TagKind::Comment,
                body: body[..close].to_string(),
                strip_left,
                strip_right,
                line,
                column,
            },
            end,
        ));
    }

    if let Some(inner) = rest.strip_prefix('{') {
        let (close, strip_right) = first_of(inner, "}}}", "}~}}").ok_or(unclosed)?;
        let end = cursor + 1 + close + if strip_right { 4 } else { 3 };
        return Ok((
            Tag {
                kind: TagKind::Raw,
                body: inner[..close].trim().to_string(),
                strip_left,
                strip_right,
                line,
                column,
            },
            end,
        ));
    }

    let close = rest.find("}}").ok_or(unclosed)?;
    let mut body = &rest[..close];
    let strip_right = body.ends_with('~');
    if strip_right {
        body = &body[..body.len() - 1];
    }
    let end = cursor + close + 2;

    let trimmed = body.trim_start();
    let (kind, body) = match trimmed.chars().next() {
        Some('!') => (TagKind::Comment, &trimmed[1..]),
        Some('#') => (TagKind::Open, &trimmed[1..]),
        Some('/') => (TagKind::Close, &trimmed[1..]),
        Some('>') => (TagKind::Partial, &trimmed[1..]),
        Some('&') => (TagKind::Raw, &trimmed[1..]),
        Some('^') if trimmed[1..].trim().is_empty() => (TagKind::Else, ""),
        Some('^') => (TagKind::Inverse, &trimmed[1..]),
        _ if trimmed.trim_end() == "else" => (TagKind::Else, ""),
        _ if trimmed.starts_with("else ") => (TagKind::Else, &trimmed[5..]),
        _ => (TagKind::Mustache, trimmed),
    };

    Ok((
        Tag {
            kind,
            body: body.trim().to_string(),
            strip_left,
            strip_right,
            line,
            column,
        },
        end,
    ))
}

/// Offset of the earliest of two closing delimiters, and whether it was the
/// stripping variant.
fn first_of(haystack: &str, plain: &str, stripping: &str) -> Option<(usize, bool)> {
    match (haystack.find(plain), haystack.find(stripping)) {
        (Some(a), Some(b)) if b < a => Some((b, true)),
        (Some(a), _) => Some((a, false)),
        (None, Some(b)) => Some((b, true)),
        (None, None) => None,
    }
}

fn apply_whitespace_control(tokens: &mut [Token]) {
    strip_standalone_lines(tokens);

    for i in 0..tokens.len() {
        let (strip_left, strip_right) = match &tokens[i] {
            Token::Tag(tag) => (tag.strip_left, tag.strip_right),
            Token::Text(_) => continue,
        };

        if strip_left && i > 0 {
            if let Token::Text(text) = &mut tokens[i - 1] {
                let kept = text.trim_end().len();
                text.truncate(kept);
            }
        }

        if strip_right {
            if let Some(Token::Text(text)) = tokens.get_mut(i + 1) {
                *text = text.trim_start().to_string();
            }
        }
    }
}

/// Block, else, close, comment and partial tags alone on their line take the
/// line's indentation and trailing newline with them.
fn strip_standalone_lines(tokens: &mut [Token]) {
    let last = tokens.len().saturating_sub(1);
    let standalone: Vec<usize> = (0..tokens.len())
        .filter(|&i| {
            let Token::Tag(tag) = &tokens[i] else {
                return false;
            };
            if matches!(tag.kind, TagKind::Mustache | TagKind::Raw) {
                return false;
            }

            let opens_line = match i.checked_sub(1).map(|p| &tokens[p]) {
                None => true,
                Some(Token::Text(text)) => match text.rfind('\n') {
                    Some(nl) => is_blank(&text[nl + 1..]),
                    None => i == 1 && is_blank(text),
                },
                Some(Token::Tag(_)) => false,
            };
            let closes_line = match tokens.get(i + 1) {
                None => true,
                Some(Token::Text(text)) => match text.find('\n') {
                    Some(nl) => is_blank(&text[..nl]),
                    None => i + 1 == last && is_blank(text),
                },
                Some(Token::Tag(_)) => false,
            };
            opens_line && closes_line
        })
        .collect();

    for i in standalone {
        if i > 0 {
            if let Token::Text(text) = &mut tokens[i - 1] {
                let keep = text.rfind('\n').map_or(0, |nl| nl + 1);
                text.truncate(keep);
            }
        }
        if let Some(Token::Text(text)) = tokens.get_mut(i + 1) {
            let skip = text.find('\n').map_or(text.len(), |nl| nl + 1);
            text.drain(..skip);
        }
    }
}

fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// An open block while folding the tag stream.
struct Frame {
    call: Option<Call>,
    program: Program,
    inverse: Program,
    in_inverse: bool,
    /// Opened by `{{else name ...}}`; closed together with its parent
    chained: bool,
    line: usize,
    column: usize,
}

impl Frame {
    fn new(call: Option<Call>, line: usize, column: usize) -> Self {
        Self {
            call,
            program: Vec::new(),
            inverse: Vec::new(),
            in_inverse: false,
            chained: false,
            line,
            column,
        }
    }

    fn push(&mut self, node: Node) {
        if self.in_inverse {
            self.inverse.push(node);
        } else {
            self.program.push(node);
        }
    }
}

fn build(tokens: Vec<Token>) -> Result<Program, CompileError> {
    let mut stack = vec![Frame::new(None, 1, 1)];

    for token in tokens {
        let tag = match token {
            Token::Text(text) => {
                if !text.is_empty() {
                    top(&mut stack).push(Node::Text(text));
                }
                continue;
            }
            Token::Tag(tag) => tag,
        };

        match tag.kind {
            TagKind::Comment => top(&mut stack).push(Node::Comment(tag.body)),

            TagKind::Mustache | TagKind::Raw => {
                let call = parse_call(&tag.body, tag.line, tag.column)?;
                top(&mut stack).push(Node::Mustache {
                    call,
                    escaped: tag.kind == TagKind::Mustache,
                });
            }

            TagKind::Partial => {
                let node = parse_partial(&tag.body, tag.line, tag.column)?;
                top(&mut stack).push(node);
            }

            TagKind::Open | TagKind::Inverse => {
                let call = parse_call(&tag.body, tag.line, tag.column)?;
                let mut frame = Frame::new(Some(call), tag.line, tag.column);
                frame.in_inverse = tag.kind == TagKind::Inverse;
                stack.push(frame);
            }

            TagKind::Else => {
                let current = top(&mut stack);
                if current.call.is_none() || current.in_inverse {
                    return Err(CompileError::Unexpected {
                        tag: "else".to_string(),
                        line: tag.line,
                        column: tag.column,
                    });
                }
                current.in_inverse = true;

                if !tag.body.is_empty() {
                    let call = parse_call(&tag.body, tag.line, tag.column)?;
                    let mut frame = Frame::new(Some(call), tag.line, tag.column);
                    frame.chained = true;
                    stack.push(frame);
                }
            }

            TagKind::Close => close_block(&mut stack, &tag)?,
        }
    }

    if stack.len() > 1 {
        let open = stack
            .iter()
            .rev()
            .find(|f| !f.chained && f.call.is_some())
            .or_else(|| stack.last());
        let (name, line, column) = match open {
            Some(f) => (
                f.call.as_ref().map(|c| c.path.original.clone()).unwrap_or_default(),
                f.line,
                f.column,
            ),
            None => (String::new(), 1, 1),
        };
        return Err(CompileError::UnclosedBlock { name, line, column });
    }

    Ok(stack.pop().map(|root| root.program).unwrap_or_default())
}

fn top(stack: &mut [Frame]) -> &mut Frame {
    // The root frame is never popped while folding
    let last = stack.len() - 1;
    &mut stack[last]
}

fn close_block(stack: &mut Vec<Frame>, tag: &Tag) -> Result<(), CompileError> {
    loop {
        let unexpected = || CompileError::Unexpected {
            tag: format!("/{}", tag.body),
            line: tag.line,
            column: tag.column,
        };

        let frame = match stack.pop() {
            Some(frame) if !stack.is_empty() => frame,
            popped => {
                stack.extend(popped);
                return Err(unexpected());
            }
        };
        let Some(call) = frame.call else {
            return Err(unexpected());
        };

        if !frame.chained && call.path.original != tag.body {
            return Err(CompileError::MismatchedClose {
                expected: call.path.original,
                found: tag.body.clone(),
                line: tag.line,
                column: tag.column,
            });
        }

        let chained = frame.chained;
        top(stack).push(Node::Block {
            call,
            program: frame.program,
            inverse: frame.inverse,
        });

        if !chained {
            return Ok(());
        }
    }
}

fn parse_partial(body: &str, line: usize, column: usize) -> Result<Node, CompileError> {
    let call = parse_call(body, line, column)?;
    if !call.hash.is_empty() || call.params.len() > 1 {
        return Err(CompileError::InvalidExpression {
            message: "partials accept at most one context parameter".to_string(),
            line,
            column,
        });
    }

    Ok(Node::Partial {
        name: call.path.original,
        context: call.params.into_iter().next(),
    })
}

/// Parse the inside of a tag (`name param key=value`) into a call.
pub(crate) fn parse_call(body: &str, line: usize, column: usize) -> Result<Call, CompileError> {
    let mut cursor = Cursor {
        chars: body.chars().collect(),
        pos: 0,
        line,
        column,
    };
    let call = cursor.call()?;
    cursor.skip_ws();
    if cursor.pos < cursor.chars.len() {
        return Err(cursor.error(format!("unexpected '{}'", cursor.chars[cursor.pos])));
    }
    Ok(call)
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Cursor {
    fn error(&self, message: String) -> CompileError {
        CompileError::InvalidExpression {
            message,
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn call(&mut self) -> Result<Call, CompileError> {
        self.skip_ws();
        let word = self.word();
        if word.is_empty() {
            return Err(self.error("expected a name".to_string()));
        }
        let path = parse_path(&word).map_err(|m| self.error(m))?;

        let mut params = Vec::new();
        let mut hash = Vec::new();

        loop {
            self.skip_ws();
            match self.peek() {
                None | Some(')') => break,
                _ => {}
            }

            if let Some(key) = self.hash_key() {
                let value = self.param()?;
                hash.push((key, value));
            } else {
                if !hash.is_empty() {
                    return Err(self.error("positional parameter after hash argument".into()));
                }
                params.push(self.param()?);
            }
        }

        Ok(Call { path, params, hash })
    }

    /// Consume `key=` if present.
    fn hash_key(&mut self) -> Option<String> {
        let start = self.pos;
        let mut end = start;
        while self
            .chars
            .get(end)
            .is_some_and(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        {
            end += 1;
        }
        if end > start && self.chars.get(end) == Some(&'=') {
            self.pos = end + 1;
            Some(self.chars[start..end].iter().collect())
        } else {
            None
        }
    }

    fn param(&mut self) -> Result<Param, CompileError> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let call = self.call()?;
                self.skip_ws();
                if self.peek() != Some(')') {
                    return Err(self.error("unclosed sub-expression".to_string()));
                }
                self.pos += 1;
                Ok(Param::SubExpr(Box::new(call)))
            }
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        None => return Err(self.error("unterminated string".to_string())),
                        Some('\\') if self.chars.get(self.pos + 1) == Some(&quote) => {
                            value.push(quote);
                            self.pos += 2;
                        }
                        Some(c) if c == quote => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => {
                            value.push(c);
                            self.pos += 1;
                        }
                    }
                }
                Ok(Param::Literal(Literal::String(value)))
            }
            _ => {
                let word = self.word();
                if word.is_empty() {
                    return Err(self.error("expected a parameter".to_string()));
                }
                classify_word(&word).map_err(|m| self.error(m))
            }
        }
    }

    fn word(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && c != '(' && c != ')' && c != '=')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}

fn classify_word(word: &str) -> Result<Param, String> {
    let literal = match word {
        "true" => Some(Literal::Boolean(true)),
        "false" => Some(Literal::Boolean(false)),
        "null" => Some(Literal::Null),
        "undefined" => Some(Literal::Undefined),
        _ if is_number(word) => Some(Literal::Number(word.to_string())),
        _ => None,
    };

    match literal {
        Some(literal) => Ok(Param::Literal(literal)),
        None => parse_path(word).map(Param::Path),
    }
}

fn is_number(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|c| *c == '.').count() <= 1
        && !digits.starts_with('.')
        && !digits.ends_with('.')
}

/// Parse a path expression such as `../person.name` or `@index`.
pub(crate) fn parse_path(word: &str) -> Result<PathExpr, String> {
    let original = word.to_string();
    let (data, mut rest) = match word.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, word),
    };

    let mut depth = 0;
    let mut scoped = false;
    loop {
        if let Some(next) = rest.strip_prefix("../") {
            depth += 1;
            rest = next;
        } else if rest == ".." {
            depth += 1;
            rest = "";
        } else if let Some(next) = rest.strip_prefix("./") {
            scoped = true;
            rest = next;
        } else {
            break;
        }
    }

    let rest = if rest == "this" || rest == "." {
        ""
    } else if let Some(stripped) = rest
        .strip_prefix("this.")
        .or_else(|| rest.strip_prefix("this/"))
    {
        scoped = true;
        stripped
    } else {
        rest
    };

    let parts: Vec<String> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(['.', '/']).map(str::to_string).collect()
    };

    if parts.iter().any(|p| p.is_empty()) {
        return Err(format!("invalid path '{}'", original));
    }
    if data && parts.is_empty() {
        return Err(format!("invalid data variable '{}'", original));
    }

    Ok(PathExpr {
        data,
        depth,
        parts,
        scoped,
        original,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mustache_path(node: &Node) -> &str {
        match node {
            Node::Mustache { call, .. } => &call.path.original,
            other => panic!("expected mustache, got {:?}", other),
        }
    }

    #[test]
    fn parses_text_and_mustaches() {
        let program = parse("Hello {{name}}, {{{html}}}!").unwrap();

        assert_eq!(program.len(), 5);
        assert_eq!(program[0], Node::Text("Hello ".to_string()));
        assert_eq!(mustache_path(&program[1]), "name");
        assert!(matches!(program[3], Node::Mustache { escaped: false, .. }));
        assert_eq!(program[4], Node::Text("!".to_string()));
    }

    #[test]
    fn parses_blocks_with_else() {
        let program = parse("{{#if ok}}yes{{else}}no{{/if}}").unwrap();

        match &program[0] {
            Node::Block {
                call,
                program,
                inverse,
            } => {
                assert_eq!(call.path.original, "if");
                assert_eq!(call.params.len(), 1);
                assert_eq!(program, &vec![Node::Text("yes".to_string())]);
                assert_eq!(inverse, &vec![Node::Text("no".to_string())]);
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn chains_else_if_into_inverse() {
        let program = parse("{{#if a}}A{{else if b}}B{{else}}C{{/if}}").unwrap();

        let Node::Block { inverse, .. } = &program[0] else {
            panic!("expected block");
        };
        let Node::Block {
            call,
            program,
            inverse,
        } = &inverse[0]
        else {
            panic!("expected chained block");
        };
        assert_eq!(call.path.original, "if");
        assert_eq!(program, &vec![Node::Text("B".to_string())]);
        assert_eq!(inverse, &vec![Node::Text("C".to_string())]);
    }

    #[test]
    fn parses_params_and_hash() {
        let call = parse_call(r#"t "greeting" count=3 user=../name"#, 1, 1).unwrap();

        assert_eq!(call.path.original, "t");
        assert_eq!(
            call.params,
            vec![Param::Literal(Literal::String("greeting".to_string()))]
        );
        assert_eq!(call.hash[0].0, "count");
        assert_eq!(call.hash[0].1, Param::Literal(Literal::Number("3".into())));
        match &call.hash[1].1 {
            Param::Path(path) => {
                assert_eq!(path.depth, 1);
                assert_eq!(path.parts, vec!["name".to_string()]);
            }
            other => panic!("expected path, got {:?}", other),
        }
    }

    #[test]
    fn parses_sub_expressions() {
        let call = parse_call("outer (inner a) b", 1, 1).unwrap();

        assert_eq!(call.params.len(), 2);
        assert!(matches!(&call.params[0], Param::SubExpr(inner) if inner.path.original == "inner"));
    }

    #[test]
    fn parses_paths() {
        let this = parse_path("this").unwrap();
        assert!(this.parts.is_empty());

        let nested = parse_path("../../a.b").unwrap();
        assert_eq!(nested.depth, 2);
        assert_eq!(nested.parts, vec!["a".to_string(), "b".to_string()]);

        let data = parse_path("@index").unwrap();
        assert!(data.data);
        assert_eq!(data.parts, vec!["index".to_string()]);

        assert!(parse_path("a..b").is_err());
    }

    #[test]
    fn marks_explicitly_scoped_paths() {
        assert_eq!(parse_path("name").unwrap().helper_name(), Some("name"));

        for word in ["this.name", "./name", "this/name"] {
            let path = parse_path(word).unwrap();
            assert!(path.scoped, "{word}");
            assert_eq!(path.parts, vec!["name".to_string()]);
            assert_eq!(path.helper_name(), None);
        }
    }

    #[test]
    fn drops_comments_and_handles_long_form() {
        let program = parse("a{{! short }}b{{!-- has }} inside --}}c").unwrap();

        let text: String = program
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "abc");
        assert!(matches!(&program[3], Node::Comment(c) if c.contains("has }} inside")));
    }

    #[test]
    fn applies_whitespace_control() {
        let program = parse("a   {{~name~}}   b").unwrap();

        assert_eq!(program[0], Node::Text("a".to_string()));
        assert_eq!(program[2], Node::Text("b".to_string()));
    }

    #[test]
    fn strips_lines_holding_only_block_tags() {
        let source = "<ul>\n  {{#each items}}\n  <li>{{name}}</li>\n  {{else}}\n  <li>none</li>\n  {{/each}}\n</ul>\n";
        let program = parse(source).unwrap();

        assert_eq!(program[0], Node::Text("<ul>\n".to_string()));
        assert_eq!(program[2], Node::Text("</ul>\n".to_string()));
        let Node::Block {
            program: body,
            inverse,
            ..
        } = &program[1]
        else {
            panic!("expected block");
        };
        assert_eq!(body[0], Node::Text("  <li>".to_string()));
        assert_eq!(body[2], Node::Text("</li>\n".to_string()));
        assert_eq!(inverse, &vec![Node::Text("  <li>none</li>\n".to_string())]);
    }

    #[test]
    fn keeps_lines_shared_with_other_content() {
        let program = parse("a {{#if x}}\nb\n{{/if}} c").unwrap();

        assert_eq!(program[0], Node::Text("a ".to_string()));
        let Node::Block { program: body, .. } = &program[1] else {
            panic!("expected block");
        };
        assert_eq!(body, &vec![Node::Text("\nb\n".to_string())]);
        assert_eq!(program[2], Node::Text(" c".to_string()));
    }

    #[test]
    fn keeps_escaped_braces_literal() {
        let program = parse(r"\{{not}} {{real}}").unwrap();

        assert_eq!(program[0], Node::Text("{{not}} ".to_string()));
        assert_eq!(mustache_path(&program[1]), "real");
    }

    #[test]
    fn parses_partials() {
        let program = parse("{{> row item}}").unwrap();

        match &program[0] {
            Node::Partial { name, context } => {
                assert_eq!(name, "row");
                assert!(context.is_some());
            }
            other => panic!("expected partial, got {:?}", other),
        }
    }

    #[test]
    fn reports_unclosed_block_position() {
        let err = parse("line one\n  {{#each items}}x").unwrap_err();

        assert_eq!(
            err,
            CompileError::UnclosedBlock {
                name: "each".to_string(),
                line: 2,
                column: 3,
            }
        );
    }

    #[test]
    fn reports_mismatched_close() {
        let err = parse("{{#if a}}x{{/each}}").unwrap_err();

        assert!(matches!(err, CompileError::MismatchedClose { .. }));
    }

    #[test]
    fn reports_unclosed_tag() {
        let err = parse("hello {{name").unwrap_err();

        assert_eq!(err, CompileError::UnclosedTag { line: 1, column: 7 });
    }

    #[test]
    fn rejects_stray_else() {
        assert!(matches!(
            parse("{{else}}"),
            Err(CompileError::Unexpected { .. })
        ));
    }
}
