//! Template syntax tree.

/// A parsed template: a sequence of nodes.
pub type Program = Vec<Node>;

/// A node of a template program.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text copied to the output
    Text(String),

    /// `{{expr}}` (escaped) or `{{{expr}}}` / `{{& expr}}` (raw)
    Mustache { call: Call, escaped: bool },

    /// `{{#name ...}} program {{else}} inverse {{/name}}`
    Block {
        call: Call,
        program: Program,
        inverse: Program,
    },

    /// `{{> name context}}`
    Partial { name: String, context: Option<Param> },

    /// `{{! comment }}`, dropped from the output
    Comment(String),
}

/// A helper invocation or plain lookup: `name param... key=value...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Helper name or path being looked up
    pub path: PathExpr,

    /// Positional parameters
    pub params: Vec<Param>,

    /// Hash arguments in source order
    pub hash: Vec<(String, Param)>,
}

impl Call {
    /// A bare path lookup with no arguments.
    pub fn is_simple(&self) -> bool {
        self.params.is_empty() && self.hash.is_empty()
    }
}

/// A parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Path(PathExpr),
    Literal(Literal),
    SubExpr(Box<Call>),
}

/// A literal parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(String),
    Boolean(bool),
    Null,
    Undefined,
}

/// A context or data path such as `this`, `../name`, `person.name` or `@index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    /// `@`-prefixed data variable
    pub data: bool,

    /// Number of `../` segments
    pub depth: usize,

    /// Property segments; empty for `this` / `.`
    pub parts: Vec<String>,

    /// Written with a `this.` or `./` prefix, so never a helper call
    pub scoped: bool,

    /// Source text of the path
    pub original: String,
}

impl PathExpr {
    /// Whether this path is a single identifier that could name a helper.
    pub fn helper_name(&self) -> Option<&str> {
        if !self.data && !self.scoped && self.depth == 0 && self.parts.len() == 1 {
            Some(self.parts[0].as_str())
        } else {
            None
        }
    }
}
