//! Renderer configuration.
//!
//! [`RenderOptions`] is accepted once at construction and never changes
//! afterwards. Every field is optional: a zero value (empty string, `false`)
//! falls back to the default, so a partially filled struct, a YAML document
//! with only some keys, and `RenderOptions::default()` all behave the same way.
//!
//! # YAML
//!
//! ```rust
//! use render_cache::{EngineKind, RenderOptions};
//!
//! let opts = RenderOptions::from_yaml(r#"
//! directory: views
//! reload: true
//! delim_left: "[["
//! delim_right: "]]"
//! engine: minijinja
//! "#).unwrap();
//!
//! assert_eq!(opts.directory.to_str(), Some("views"));
//! assert!(opts.reload);
//! assert!(!opts.filter);
//! assert_eq!(opts.delimiters().left(), "[[");
//! assert_eq!(opts.engine, EngineKind::MiniJinja);
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default template root directory.
pub const DEFAULT_DIRECTORY: &str = "template";

/// Default left delimiter.
pub const DEFAULT_DELIM_LEFT: &str = "{{";

/// Default right delimiter.
pub const DEFAULT_DELIM_RIGHT: &str = "}}";

/// File suffix appended to every template name.
pub const TEMPLATE_SUFFIX: &str = ".html";

/// Which engine compiles template files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Dotted-path substitution: `{{.Name}}`, `{{.User.Email}}`.
    #[default]
    Substitution,
    /// Jinja2 syntax via MiniJinja, using the configured variable delimiters.
    MiniJinja,
}

/// The pair of strings that open and close a template action.
///
/// Delimiters are fixed at compile time and stored inside each
/// [`CompiledTemplate`](crate::CompiledTemplate).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Delimiters {
    left: String,
    right: String,
}

impl Delimiters {
    /// Creates a delimiter pair. Empty strings fall back to `{{` / `}}`.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        let left = left.into();
        let right = right.into();
        Self {
            left: if left.is_empty() {
                DEFAULT_DELIM_LEFT.to_string()
            } else {
                left
            },
            right: if right.is_empty() {
                DEFAULT_DELIM_RIGHT.to_string()
            } else {
                right
            },
        }
    }

    pub fn left(&self) -> &str {
        &self.left
    }

    pub fn right(&self) -> &str {
        &self.right
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new(DEFAULT_DELIM_LEFT, DEFAULT_DELIM_RIGHT)
    }
}

impl fmt::Display for Delimiters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.left, self.right)
    }
}

/// Configuration for a [`Renderer`](crate::Renderer).
///
/// # Example
///
/// ```rust
/// use render_cache::RenderOptions;
///
/// let opts = RenderOptions::default()
///     .with_directory("views")
///     .with_filter(true)
///     .with_delimiters("<%", "%>");
///
/// assert!(opts.filter);
/// assert_eq!(opts.delimiters().right(), "%>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Directory template names resolve under. Default `"template"`.
    pub directory: PathBuf,

    /// Re-parse the template file on every render, bypassing the store.
    pub reload: bool,

    /// Pass rendered output through the `<name>_template` filter hook.
    pub filter: bool,

    /// Left action delimiter. Default `"{{"`.
    pub delim_left: String,

    /// Right action delimiter. Default `"}}"`.
    pub delim_right: String,

    /// Engine used to compile template files.
    pub engine: EngineKind,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            reload: false,
            filter: false,
            delim_left: DEFAULT_DELIM_LEFT.to_string(),
            delim_right: DEFAULT_DELIM_RIGHT.to_string(),
            engine: EngineKind::default(),
        }
    }
}

impl RenderOptions {
    /// Parses options from YAML. Missing keys take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let opts: RenderOptions = serde_yaml::from_str(yaml)?;
        Ok(opts.normalized())
    }

    /// Replaces empty values with their defaults.
    pub fn normalized(mut self) -> Self {
        if self.directory.as_os_str().is_empty() {
            self.directory = PathBuf::from(DEFAULT_DIRECTORY);
        }
        if self.delim_left.is_empty() {
            self.delim_left = DEFAULT_DELIM_LEFT.to_string();
        }
        if self.delim_right.is_empty() {
            self.delim_right = DEFAULT_DELIM_RIGHT.to_string();
        }
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    pub fn with_filter(mut self, filter: bool) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_delimiters(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.delim_left = left.into();
        self.delim_right = right.into();
        self
    }

    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    /// The delimiter pair new templates are compiled with.
    pub fn delimiters(&self) -> Delimiters {
        Delimiters::new(self.delim_left.clone(), self.delim_right.clone())
    }
}
