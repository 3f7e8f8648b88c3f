//! Template compilation.
//!
//! A template file goes through two stages:
//!
//! **Compile**: a [`TemplateEngine`] parses the source with a delimiter pair and
//! returns an [`Executable`]. The result is wrapped in a [`CompiledTemplate`]
//! together with the delimiters it was parsed with.
//!
//! **Execute**: the [`CompiledTemplate`] writes output for one data mapping into
//! a byte buffer. Execution takes `&self`; a compiled template is never mutated
//! after it is built, so one instance can serve any number of concurrent
//! renders.
//!
//! ```text
//! template/hello.html ──compile(delims)──▶ CompiledTemplate ──execute(data)──▶ bytes
//!                                             (Arc, shared)
//! ```
//!
//! ## Engines
//!
//! | Engine | Syntax | Notes |
//! |--------|--------|-------|
//! | [`SubstitutionEngine`] | `{{.Name}}`, `{{.User.Email}}` | Default |
//! | [`MiniJinjaEngine`] | `{{ name }}`, `{% for %}` | Full Jinja2 |

mod jinja;
mod substitution;

use std::fmt;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::options::{Delimiters, EngineKind};

pub use jinja::{register_filters, JinjaProgram, MiniJinjaEngine};
pub use substitution::{parse, Node, SubstitutionEngine, SubstitutionProgram};

/// Compiles template source into an [`Executable`].
///
/// Implementations must be `Send + Sync`: the renderer holds one engine and
/// calls it from whichever request thread misses the cache.
pub trait TemplateEngine: Send + Sync {
    /// Parses `source` with the given delimiters.
    ///
    /// `name` identifies the template in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ParseError`](crate::RenderError::ParseError) on
    /// invalid syntax.
    fn compile(
        &self,
        name: &str,
        source: &str,
        delimiters: &Delimiters,
    ) -> Result<Box<dyn Executable>>;
}

/// The executable body of a compiled template.
pub trait Executable: Send + Sync {
    /// Appends the output for `data` to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ExecutionError`](crate::RenderError::ExecutionError)
    /// when substitution fails.
    fn execute(&self, data: &Map<String, Value>, out: &mut Vec<u8>) -> Result<()>;
}

/// Returns the built-in engine for `kind`.
pub fn engine_for(kind: EngineKind) -> Box<dyn TemplateEngine> {
    match kind {
        EngineKind::Substitution => Box::new(SubstitutionEngine::new()),
        EngineKind::MiniJinja => Box::new(MiniJinjaEngine::new()),
    }
}

/// A parsed template file, ready for repeated concurrent execution.
///
/// The delimiter pair is the one the source was parsed with. It is stored for
/// inspection only; nothing changes it after construction.
pub struct CompiledTemplate {
    key: String,
    delimiters: Delimiters,
    body: Box<dyn Executable>,
}

impl CompiledTemplate {
    /// Compiles `source` with `engine` and wraps the result.
    pub fn compile(
        engine: &dyn TemplateEngine,
        key: &str,
        source: &str,
        delimiters: &Delimiters,
    ) -> Result<Self> {
        let body = engine.compile(key, source, delimiters)?;
        Ok(Self {
            key: key.to_string(),
            delimiters: delimiters.clone(),
            body,
        })
    }

    /// The store key, i.e. the file name relative to the template directory.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// Executes the template against `data`, returning the rendered bytes.
    pub fn execute(&self, data: &Map<String, Value>) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.body.execute(data, &mut out)?;
        Ok(out)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("key", &self.key)
            .field("delimiters", &self.delimiters)
            .finish_non_exhaustive()
    }
}
