//! MiniJinja-backed engine.
//!
//! Each compiled template owns a private [`minijinja::Environment`] whose
//! variable delimiters are fixed when the template is compiled. Block (`{% %}`)
//! and comment (`{# #}`) delimiters keep their Jinja defaults.
//!
//! # Example
//!
//! ```rust
//! use render_cache::template::{Executable, MiniJinjaEngine, TemplateEngine};
//! use render_cache::Delimiters;
//! use serde_json::json;
//!
//! let engine = MiniJinjaEngine::new();
//! let program = engine
//!     .compile(
//!         "list.html",
//!         "{% for i in items %}[[ i ]],{% endfor %}",
//!         &Delimiters::new("[[", "]]"),
//!     )
//!     .unwrap();
//!
//! let mut out = Vec::new();
//! let data = json!({"items": [1, 2]});
//! program.execute(data.as_object().unwrap(), &mut out).unwrap();
//! assert_eq!(out, b"1,2,");
//! ```

use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde_json::{Map, Value};

use super::{Executable, TemplateEngine};
use crate::error::{RenderError, Result};
use crate::options::Delimiters;

/// Engine compiling Jinja2 templates with MiniJinja.
///
/// Output is not auto-escaped, undefined variables are errors, and a trailing
/// newline in the template file is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniJinjaEngine;

impl MiniJinjaEngine {
    pub fn new() -> Self {
        Self
    }

    fn environment(name: &str, delimiters: &Delimiters) -> Result<Environment<'static>> {
        let syntax = SyntaxConfig::builder()
            .variable_delimiters(delimiters.left().to_string(), delimiters.right().to_string())
            .build()
            .map_err(|e| RenderError::parse(name, format!("invalid delimiters: {}", e)))?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        register_filters(&mut env);
        Ok(env)
    }
}

/// Registers the filters available to every MiniJinja template.
pub fn register_filters(env: &mut Environment<'static>) {
    // Appends a newline: {{ value | nl }}
    env.add_filter("nl", |value: minijinja::Value| -> String { format!("{}\n", value) });
}

/// A compiled MiniJinja template and the environment it was parsed in.
pub struct JinjaProgram {
    name: String,
    env: Environment<'static>,
}

impl std::fmt::Debug for JinjaProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinjaProgram")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Executable for JinjaProgram {
    fn execute(&self, data: &Map<String, Value>, out: &mut Vec<u8>) -> Result<()> {
        let tmpl = self
            .env
            .get_template(&self.name)
            .map_err(|e| RenderError::execution(&self.name, e.to_string()))?;
        let rendered = tmpl
            .render(data)
            .map_err(|e| RenderError::execution(&self.name, e.to_string()))?;
        out.extend_from_slice(rendered.as_bytes());
        Ok(())
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn compile(
        &self,
        name: &str,
        source: &str,
        delimiters: &Delimiters,
    ) -> Result<Box<dyn Executable>> {
        let mut env = Self::environment(name, delimiters)?;
        env.add_template_owned(name.to_string(), source.to_string())
            .map_err(|e| RenderError::parse(name, e.to_string()))?;
        Ok(Box::new(JinjaProgram {
            name: name.to_string(),
            env,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render_with(source: &str, data: Value, delims: &Delimiters) -> Result<String> {
        let program = MiniJinjaEngine::new().compile("t.html", source, delims)?;
        let mut out = Vec::new();
        program.execute(data.as_object().unwrap(), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_default_delimiters() {
        let out = render_with("Hi, {{ name }}!", json!({"name": "Ada"}), &Delimiters::default());
        assert_eq!(out.unwrap(), "Hi, Ada!");
    }

    #[test]
    fn test_custom_variable_delimiters() {
        let out = render_with(
            "{{ raw }} <% name %>",
            json!({"name": "Ada"}),
            &Delimiters::new("<%", "%>"),
        );
        assert_eq!(out.unwrap(), "{{ raw }} Ada");
    }

    #[test]
    fn test_no_html_escaping() {
        let out = render_with("{{ v }}", json!({"v": "<b>&</b>"}), &Delimiters::default());
        assert_eq!(out.unwrap(), "<b>&</b>");
    }

    #[test]
    fn test_keeps_trailing_newline() {
        let out = render_with("{{ v }}\n", json!({"v": 1}), &Delimiters::default());
        assert_eq!(out.unwrap(), "1\n");
    }

    #[test]
    fn test_nl_filter() {
        let out = render_with("{{ v | nl }}", json!({"v": "x"}), &Delimiters::default());
        assert_eq!(out.unwrap(), "x\n");
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = render_with("{{ unclosed", json!({}), &Delimiters::default()).unwrap_err();
        assert!(matches!(err, RenderError::ParseError { .. }));
    }

    #[test]
    fn test_undefined_is_execution_error() {
        let err = render_with("{{ missing }}", json!({}), &Delimiters::default()).unwrap_err();
        assert!(matches!(err, RenderError::ExecutionError { .. }));
    }
}
