//! JavaScript code generation for parsed templates.
//!
//! A template compiles to a template spec object understood by the
//! Handlebars runtime (`Handlebars.template(spec)`). Context changes (`each`,
//! `with`, custom block helpers) open a nested function so that `../` paths
//! resolve to the enclosing context variable.

use crate::ast::{Call, Literal, Node, Param, PathExpr, Program};

/// Compiler revision advertised to the runtime.
pub const COMPILER_REVISION: u32 = 8;

/// Minimum runtime version matching [`COMPILER_REVISION`].
pub const COMPILER_VERSION: &str = ">= 4.3.0";

const PRELUDE: &str = r#"var d0 = depth0, dt0 = data || { root: depth0 };
var lookup = function(o, n) { return o == null ? undefined : o[n]; };
var esc = container.escapeExpression;
var str = function(v) { return v == null ? "" : String(v); };
var noop = function() { return ""; };
var truthy = function(v) { return Array.isArray(v) ? v.length !== 0 : !!v; };
var options = function(name, hash, dat, fn, inverse) {
  return { name: name, hash: hash, data: dat, fn: fn || noop, inverse: inverse || noop };
};
var call = function(name, ctx, args, hash, dat, fn, inverse) {
  var h = lookup(helpers, name);
  if (typeof h !== "function") { throw new Error("Missing helper: \"" + name + "\""); }
  return h.apply(ctx, args.concat([options(name, hash, dat, fn, inverse)]));
};
var value = function(name, ctx, dat) {
  var h = lookup(helpers, name);
  if (typeof h === "function") { return h.call(ctx, options(name, {}, dat)); }
  var v = lookup(ctx, name);
  return typeof v === "function" ? v.call(ctx) : v;
};
var frame = function(dat, key, index, count) {
  return { root: dat.root, _parent: dat, key: key, index: index, first: index === 0, last: index === count - 1 };
};
var each = function(v, fn, inverse, ctx, dat) {
  var out = "", i, keys;
  if (Array.isArray(v)) {
    for (i = 0; i < v.length; i++) { out += fn(v[i], { data: frame(dat, i, i, v.length) }); }
    return v.length ? out : inverse(ctx);
  }
  if (v != null && typeof v === "object") {
    keys = Object.keys(v);
    for (i = 0; i < keys.length; i++) { out += fn(v[keys[i]], { data: frame(dat, keys[i], i, keys.length) }); }
    return keys.length ? out : inverse(ctx);
  }
  return inverse(ctx);
};
var section = function(name, v, fn, inverse, ctx, dat) {
  if (name !== null && typeof lookup(helpers, name) === "function") { return str(call(name, ctx, [], {}, dat, fn, inverse)); }
  if (typeof v === "function") { v = v.call(ctx); }
  if (v === true) { return fn(ctx); }
  if (!truthy(v)) { return inverse(ctx); }
  if (Array.isArray(v)) { return each(v, fn, inverse, ctx, dat); }
  return fn(v);
};
var out = "";
"#;

/// Generate the template spec object for a program.
pub fn generate(program: &Program) -> String {
    let mut gen = Generator::default();
    let mut body = String::new();
    gen.nodes(program, 0, &mut body);

    format!(
        "{{\"compiler\":[{},{}],\"main\":function(container,depth0,helpers,partials,data) {{\n{}{}return out;\n}},\"useData\":true}}",
        COMPILER_REVISION,
        js_string(COMPILER_VERSION),
        PRELUDE,
        body
    )
}

/// Encode a string as a JavaScript string literal.
pub fn js_string(s: &str) -> String {
    let mut literal = serde_json::Value::String(s.to_string()).to_string();
    // JSON permits these separators inside strings; older engines do not
    literal = literal.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029");
    literal
}

#[derive(Default)]
struct Generator;

impl Generator {
    /// Emit statements appending `nodes` to `out`, with context `d{level}`.
    fn nodes(&mut self, nodes: &[Node], level: usize, buf: &mut String) {
        for node in nodes {
            self.node(node, level, buf);
        }
    }

    fn node(&mut self, node: &Node, level: usize, buf: &mut String) {
        match node {
            Node::Text(text) => {
                buf.push_str(&format!("out += {};\n", js_string(text)));
            }

            Node::Comment(_) => {}

            Node::Mustache { call, escaped } => {
                let expr = self.mustache(call, level);
                if *escaped {
                    buf.push_str(&format!("out += esc({});\n", expr));
                } else {
                    buf.push_str(&format!("out += str({});\n", expr));
                }
            }

            Node::Partial { name, context } => {
                let ctx = match context {
                    Some(param) => self.param(param, level),
                    None => format!("d{}", level),
                };
                buf.push_str(&format!(
                    "out += str(container.invokePartial(lookup(partials, {name}), {ctx}, {{ name: {name}, helpers: helpers, partials: partials, data: dt{level} }}));\n",
                    name = js_string(name),
                    ctx = ctx,
                    level = level
                ));
            }

            Node::Block {
                call,
                program,
                inverse,
            } => self.block(call, program, inverse, level, buf),
        }
    }

    fn block(
        &mut self,
        call: &Call,
        program: &Program,
        inverse: &Program,
        level: usize,
        buf: &mut String,
    ) {
        let builtin = call.path.helper_name().filter(|_| call.hash.is_empty());

        match (builtin, call.params.as_slice()) {
            (Some(name @ ("if" | "unless")), [condition]) => {
                let condition = self.param(condition, level);
                let negate = if name == "unless" { "!" } else { "" };
                buf.push_str(&format!("if ({}truthy({})) {{\n", negate, condition));
                self.nodes(program, level, buf);
                if !inverse.is_empty() {
                    buf.push_str("} else {\n");
                    self.nodes(inverse, level, buf);
                }
                buf.push_str("}\n");
            }

            (Some("each"), [collection]) => {
                let collection = self.param(collection, level);
                let body = self.context_fn(program, level);
                let otherwise = self.inverse_fn(inverse, level);
                buf.push_str(&format!(
                    "out += each({}, {}, {}, d{}, dt{});\n",
                    collection, body, otherwise, level, level
                ));
            }

            (Some("with"), [target]) => {
                let target = self.param(target, level);
                let body = self.context_fn(program, level);
                let otherwise = self.inverse_fn(inverse, level);
                buf.push_str(&format!(
                    "out += (function(v) {{ return truthy(v) ? ({})(v) : ({})(); }})({});\n",
                    body, otherwise, target
                ));
            }

            _ if call.is_simple() => {
                // `{{#name}}` without arguments: a helper if one is registered,
                // otherwise a section over the looked-up value
                let name = match call.path.helper_name() {
                    Some(name) => js_string(name),
                    None => "null".to_string(),
                };
                let value = self.path(&call.path, level);
                let body = self.context_fn(program, level);
                let otherwise = self.context_fn(inverse, level);
                buf.push_str(&format!(
                    "out += section({}, {}, {}, {}, d{}, dt{});\n",
                    name,
                    value,
                    body,
                    otherwise,
                    level,
                    level
                ));
            }

            _ => {
                let body = self.context_fn(program, level);
                let otherwise = self.context_fn(inverse, level);
                buf.push_str(&format!(
                    "out += str({});\n",
                    self.helper_call(call, level, Some((body.as_str(), otherwise.as_str())))
                ));
            }
        }
    }

    /// A function taking a new context `d{level+1}`.
    fn context_fn(&mut self, nodes: &Program, level: usize) -> String {
        let inner = level + 1;
        let mut body = String::new();
        self.nodes(nodes, inner, &mut body);
        format!(
            "function(d{inner}, o{inner}) {{\nvar dt{inner} = (o{inner} && o{inner}.data) || dt{level};\nvar out = \"\";\n{body}return out;\n}}",
            inner = inner,
            level = level,
            body = body
        )
    }

    /// A function rendering `nodes` in the current context.
    fn inverse_fn(&mut self, nodes: &Program, level: usize) -> String {
        if nodes.is_empty() {
            return "noop".to_string();
        }
        let mut body = String::new();
        self.nodes(nodes, level, &mut body);
        format!("function() {{\nvar out = \"\";\n{}return out;\n}}", body)
    }

    fn mustache(&mut self, call: &Call, level: usize) -> String {
        if call.is_simple() {
            match call.path.helper_name() {
                Some(name) => format!("value({}, d{}, dt{})", js_string(name), level, level),
                None => self.path(&call.path, level),
            }
        } else {
            self.helper_call(call, level, None)
        }
    }

    fn helper_call(&mut self, call: &Call, level: usize, blocks: Option<(&str, &str)>) -> String {
        let args: Vec<String> = call.params.iter().map(|p| self.param(p, level)).collect();
        let hash: Vec<String> = call
            .hash
            .iter()
            .map(|(key, value)| format!("{}: {}", js_string(key), self.param(value, level)))
            .collect();
        let (fn_, inverse) = blocks.unwrap_or(("null", "null"));

        format!(
            "call({}, d{}, [{}], {{{}}}, dt{}, {}, {})",
            js_string(&call.path.original),
            level,
            args.join(", "),
            hash.join(", "),
            level,
            fn_,
            inverse
        )
    }

    fn param(&mut self, param: &Param, level: usize) -> String {
        match param {
            Param::Path(path) => self.path(path, level),
            Param::Literal(literal) => literal_js(literal),
            Param::SubExpr(call) => self.helper_call(call, level, None),
        }
    }

    fn path(&self, path: &PathExpr, level: usize) -> String {
        let mut expr = if path.data {
            // Data frames are per block level; `@root` etc. walk `_parent`
            let mut base = format!("dt{}", level);
            for _ in 0..path.depth {
                base = format!("lookup({}, \"_parent\")", base);
            }
            base
        } else {
            format!("d{}", level.saturating_sub(path.depth))
        };

        for part in &path.parts {
            expr = format!("lookup({}, {})", expr, js_string(part));
        }
        expr
    }
}

fn literal_js(literal: &Literal) -> String {
    match literal {
        Literal::String(s) => js_string(s),
        Literal::Number(n) => n.clone(),
        Literal::Boolean(b) => b.to_string(),
        Literal::Null => "null".to_string(),
        Literal::Undefined => "undefined".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn compile(source: &str) -> String {
        generate(&parse(source).unwrap())
    }

    #[test]
    fn emits_template_spec_header() {
        let js = compile("hi");

        assert!(js.starts_with("{\"compiler\":[8,\">= 4.3.0\"],\"main\":function("));
        assert!(js.ends_with(",\"useData\":true}"));
        assert!(js.contains("out += \"hi\";"));
    }

    #[test]
    fn escapes_double_stash_only() {
        let js = compile("{{a}}{{{b}}}");

        assert!(js.contains("out += esc(value(\"a\", d0, dt0));"));
        assert!(js.contains("out += str(value(\"b\", d0, dt0));"));
    }

    #[test]
    fn resolves_parent_paths_against_outer_context() {
        let js = compile("{{#each items}}{{../title}}{{name}}{{/each}}");

        assert!(js.contains("out += each(lookup(d0, \"items\"), function(d1, o1)"));
        assert!(js.contains("esc(lookup(d0, \"title\"))"));
        assert!(js.contains("esc(value(\"name\", d1, dt1))"));
    }

    #[test]
    fn inlines_if_blocks_without_new_context() {
        let js = compile("{{#if ok}}{{x}}{{else}}none{{/if}}");

        assert!(js.contains("if (truthy(lookup(d0, \"ok\"))) {"));
        assert!(js.contains("} else {"));
        assert!(js.contains("esc(value(\"x\", d0, dt0))"));
    }

    #[test]
    fn negates_unless() {
        let js = compile("{{#unless ok}}no{{/unless}}");

        assert!(js.contains("if (!truthy(lookup(d0, \"ok\"))) {"));
    }

    #[test]
    fn calls_helpers_with_params_and_hash() {
        let js = compile(r#"{{t "key" count=2}}"#);

        assert!(js.contains("call(\"t\", d0, [\"key\"], {\"count\": 2}, dt0, null, null)"));
    }

    #[test]
    fn reads_data_variables_from_frame() {
        let js = compile("{{#each list}}{{@index}}{{/each}}");

        assert!(js.contains("esc(lookup(dt1, \"index\"))"));
    }

    #[test]
    fn emits_sections_for_unknown_blocks() {
        let js = compile("{{#items}}x{{/items}}");

        assert!(js.contains("out += section(\"items\", lookup(d0, \"items\"), function(d1, o1)"));
    }

    #[test]
    fn scoped_paths_bypass_helpers() {
        for source in ["{{this.name}}", "{{./name}}"] {
            let js = compile(source);

            assert!(js.contains("out += esc(lookup(d0, \"name\"));"), "{source}");
            assert!(!js.contains("value(\"name\""), "{source}");
        }
    }

    #[test]
    fn scoped_sections_skip_helper_lookup() {
        let js = compile("{{#this.items}}x{{/this.items}}");

        assert!(js.contains("out += section(null, lookup(d0, \"items\"), function(d1, o1)"));
    }

    #[test]
    fn invokes_partials() {
        let js = compile("{{> row}}");

        assert!(js.contains("container.invokePartial(lookup(partials, \"row\"), d0"));
    }

    #[test]
    fn escapes_text_as_js_strings() {
        let js = compile("say \"hi\"\n\u{2028}");

        assert!(js.contains(r#"out += "say \"hi\"\n\u2028";"#));
    }
}
