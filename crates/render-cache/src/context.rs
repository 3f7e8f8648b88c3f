//! Render context: template data plus named filter hooks.
//!
//! A request handler builds a [`RenderContext`] per request and passes it to
//! [`Renderer::render`](crate::Renderer::render). The context carries two things:
//!
//! 1. The data mapping substituted into the template (`serde_json::Map`).
//! 2. Optionally, a shared [`FilterHooks`] registry. When the renderer is
//!    configured with `filter: true`, the rendered bytes are handed to the hook
//!    registered as `"<name>_template"` and its return value is what gets written.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use render_cache::{FilterHooks, RenderContext};
//!
//! let mut hooks = FilterHooks::new();
//! hooks.register("hello_template", |bytes: Vec<u8>| bytes.to_ascii_uppercase());
//!
//! let ctx = RenderContext::new()
//!     .with("Name", "Ada")
//!     .with_hooks(Arc::new(hooks));
//!
//! assert_eq!(ctx.data()["Name"], "Ada");
//! assert!(ctx.hooks().unwrap().contains("hello_template"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{RenderError, Result};

/// A post-processing transformation over rendered bytes.
///
/// Hooks are shared between concurrent renders, hence `Send + Sync`.
///
/// # Implementing for Closures
///
/// Any `Fn(Vec<u8>) -> Vec<u8> + Send + Sync` is a hook:
///
/// ```rust
/// use render_cache::FilterHook;
///
/// let strip = |bytes: Vec<u8>| bytes.trim_ascii().to_vec();
/// assert_eq!(strip.apply(b"  hi \n".to_vec()), b"hi");
/// ```
pub trait FilterHook: Send + Sync {
    /// Transforms the rendered output.
    fn apply(&self, input: Vec<u8>) -> Vec<u8>;
}

impl<F> FilterHook for F
where
    F: Fn(Vec<u8>) -> Vec<u8> + Send + Sync,
{
    fn apply(&self, input: Vec<u8>) -> Vec<u8> {
        (self)(input)
    }
}

/// Registry of filter hooks keyed by name.
#[derive(Default, Clone)]
pub struct FilterHooks {
    hooks: HashMap<String, Arc<dyn FilterHook>>,
}

impl FilterHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook, replacing any previous hook with the same name.
    pub fn register<H>(&mut self, name: impl Into<String>, hook: H) -> &mut Self
    where
        H: FilterHook + 'static,
    {
        self.hooks.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn FilterHook>> {
        self.hooks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Returns registered hook names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs the hook registered under `name` over `input`.
    ///
    /// An unregistered name passes `input` through unchanged. A hook that
    /// panics yields [`RenderError::ExecutionError`] instead of unwinding into
    /// the caller.
    pub fn invoke(&self, name: &str, input: Vec<u8>) -> Result<Vec<u8>> {
        let Some(hook) = self.hooks.get(name) else {
            tracing::debug!(hook = name, "no filter hook registered, passing output through");
            return Ok(input);
        };

        panic::catch_unwind(AssertUnwindSafe(|| hook.apply(input))).map_err(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::warn!(hook = name, %message, "filter hook panicked");
            RenderError::execution(name, format!("filter hook panicked: {}", message))
        })
    }
}

impl fmt::Debug for FilterHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterHooks")
            .field("names", &self.names())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Per-request data and hooks for one render call.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    data: Map<String, Value>,
    hooks: Option<Arc<FilterHooks>>,
}

impl RenderContext {
    /// Creates an empty context with no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from any value that serializes to a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ExecutionError`] if serialization fails or the
    /// value is not a map/struct.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        match serde_json::to_value(data) {
            Ok(Value::Object(map)) => Ok(Self::from_map(map)),
            Ok(other) => Err(RenderError::execution(
                "<context>",
                format!("render data must be an object, got {}", json_type_name(&other)),
            )),
            Err(e) => Err(RenderError::execution("<context>", e.to_string())),
        }
    }

    pub fn from_map(data: Map<String, Value>) -> Self {
        Self { data, hooks: None }
    }

    /// Adds a data entry and returns the context.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds or replaces a data entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Attaches a hook registry.
    pub fn with_hooks(mut self, hooks: Arc<FilterHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn hooks(&self) -> Option<&FilterHooks> {
        self.hooks.as_deref()
    }

    /// Runs the named hook if a registry is attached; otherwise passes through.
    pub fn apply_filter(&self, hook_name: &str, input: Vec<u8>) -> Result<Vec<u8>> {
        match &self.hooks {
            Some(hooks) => hooks.invoke(hook_name, input),
            None => {
                tracing::debug!(hook = hook_name, "no filter hooks on context, passing output through");
                Ok(input)
            }
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
