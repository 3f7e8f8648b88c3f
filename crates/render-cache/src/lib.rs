//! # Render Cache - Compile-Once Template Rendering
//!
//! `render-cache` renders named template files into bytes for an HTTP handler
//! pipeline. Each template file is compiled at most once and the compiled form
//! is shared by all concurrent requests.
//!
//! ## Core Concepts
//!
//! - [`Renderer`]: The render cache. Built once, shared by every handler.
//! - [`RenderOptions`]: Template directory, reload flag, filter flag, delimiters.
//! - [`RenderContext`]: Per-request data mapping plus optional [`FilterHooks`].
//! - [`CompiledTemplate`]: An immutable parsed template, safe to execute from
//!   many threads at once.
//! - [`TemplateStore`]: Name-keyed store of compiled templates with
//!   single-flight compilation.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use render_cache::{RenderContext, RenderOptions, Renderer};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("hello.html"), "Hi, {{.Name}}!").unwrap();
//!
//! let renderer = Arc::new(Renderer::new(
//!     RenderOptions::default().with_directory(dir.path()),
//! ));
//!
//! let mut body = Vec::new();
//! renderer
//!     .render(&mut body, "hello", &RenderContext::new().with("Name", "Ada"))
//!     .unwrap();
//! assert_eq!(body, b"Hi, Ada!");
//!
//! // Second render reuses the compiled template.
//! let mut body = Vec::new();
//! renderer
//!     .render(&mut body, "hello", &RenderContext::new().with("Name", "Grace"))
//!     .unwrap();
//! assert_eq!(body, b"Hi, Grace!");
//! assert_eq!(renderer.stats().compiles, 1);
//! ```
//!
//! ## Filter Hooks
//!
//! With `filter: true`, rendered output for template `page` is passed to the
//! hook registered as `page_template` before it is written:
//!
//! ```rust
//! use std::sync::Arc;
//! use render_cache::{FilterHooks, RenderContext, RenderOptions, Renderer};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("page.html"), "<p>{{.Body}}</p>\n").unwrap();
//!
//! let mut hooks = FilterHooks::new();
//! hooks.register("page_template", |bytes: Vec<u8>| bytes.trim_ascii_end().to_vec());
//!
//! let renderer = Renderer::new(
//!     RenderOptions::default()
//!         .with_directory(dir.path())
//!         .with_filter(true),
//! );
//! let ctx = RenderContext::new()
//!     .with("Body", "text")
//!     .with_hooks(Arc::new(hooks));
//!
//! assert_eq!(renderer.render_to_vec("page", &ctx).unwrap(), b"<p>text</p>");
//! ```
//!
//! ## Errors
//!
//! Every operation returns [`RenderError`]: `TemplateNotFound`, `ParseError`,
//! `ExecutionError` or `WriteError`. None of them is fatal and nothing is
//! written to the sink when one occurs.

pub mod context;
mod error;
pub mod options;
mod renderer;
pub mod store;
pub mod template;

pub use context::{FilterHook, FilterHooks, RenderContext};
pub use error::{RenderError, Result};
pub use options::{
    Delimiters, EngineKind, RenderOptions, DEFAULT_DELIM_LEFT, DEFAULT_DELIM_RIGHT,
    DEFAULT_DIRECTORY, TEMPLATE_SUFFIX,
};
pub use renderer::Renderer;
pub use store::{CacheStats, TemplateStore};
pub use template::{
    CompiledTemplate, Executable, MiniJinjaEngine, SubstitutionEngine, TemplateEngine,
};
