//! Text templates for generated script output: the banner and the wrappers.

use minijinja::{context, AutoEscape, Environment};

use crate::config::PackageInfo;

/// Wrapper turning a template spec into a runtime template.
pub const TEMPLATE_WRAP: &str = "template";

/// Wrapper isolating the bundle in a closure.
pub const BUNDLE_WRAP: &str = "bundle";

/// Template engine using minijinja.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with the built-in templates.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);

        for (name, source) in [
            ("banner", BANNER_TEMPLATE),
            (BUNDLE_WRAP, BUNDLE_TEMPLATE),
            (TEMPLATE_WRAP, HANDLEBARS_TEMPLATE),
        ] {
            env.add_template_owned(name.to_string(), source.to_string())
                .expect("Failed to add built-in template");
        }

        Self { env }
    }

    /// Render the license banner for a package.
    pub fn banner(&self, pkg: &PackageInfo) -> Result<String, minijinja::Error> {
        self.env.get_template("banner")?.render(context! { pkg => pkg })
    }

    /// Render `contents` inside one of the wrapper templates.
    pub fn wrap(&self, wrapper: &str, contents: &str) -> Result<String, minijinja::Error> {
        self.env
            .get_template(wrapper)?
            .render(context! { contents => contents })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

const BANNER_TEMPLATE: &str = r#"/**
 * {{ pkg.name }} - {{ pkg.description }}
 * @version v{{ pkg.version }}
 * @link {{ pkg.homepage }}
 * @license {{ pkg.license }}
 */
"#;

const BUNDLE_TEMPLATE: &str = r#"(function(){{ "{" }}{{ contents }}}).call(this);"#;

const HANDLEBARS_TEMPLATE: &str = r#"Handlebars.template({{ contents }})"#;
