//! Namespaced template registration.

use std::collections::HashSet;

use crate::codegen::js_string;

/// Emits `this["ns"]["name"] = value;` assignments, declaring each
/// intermediate namespace object only once.
#[derive(Debug, Clone)]
pub struct Declarer {
    namespace: Vec<String>,
    declared: HashSet<String>,
}

impl Declarer {
    /// Create a declarer for a dotted namespace such as `Handlebars.templates`.
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: split_name(namespace),
            declared: HashSet::new(),
        }
    }

    /// Declare `value` under `name`. Dots in `name` create nested namespaces.
    pub fn declare(&mut self, name: &str, value: &str) -> String {
        let mut out = String::new();
        let mut target = String::from("this");

        let mut segments = self.namespace.clone();
        segments.extend(split_name(name));
        let Some((leaf, parents)) = segments.split_last() else {
            return out;
        };

        for segment in parents {
            target.push_str(&format!("[{}]", js_string(segment)));
            if self.declared.insert(target.clone()) {
                out.push_str(&format!("{} = {} || {{}};\n", target, target));
            }
        }

        out.push_str(&format!("{}[{}] = {};\n", target, js_string(leaf), value));
        out
    }
}

fn split_name(name: &str) -> Vec<String> {
    name.split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
