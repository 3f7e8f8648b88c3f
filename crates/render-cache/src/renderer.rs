//! The template render cache.
//!
//! [`Renderer`] turns a template name plus a [`RenderContext`] into bytes on a
//! sink. It is built once at startup and shared (`Arc<Renderer>`) by every
//! request handler.
//!
//! # Pipeline
//!
//! ```text
//! name ─▶ <directory>/<name>.html ─▶ compiled (store or fresh) ─▶ execute(data)
//!                                                                    │
//!                          sink ◀── write_all ◀── filter hook (optional)
//! ```
//!
//! # Development vs Production
//!
//! With `reload: false` (the default), each template file is parsed once and the
//! compiled form is reused for the life of the process. Edits on disk are not
//! picked up.
//!
//! With `reload: true`, the file is re-read and re-parsed on every render and
//! the store is never touched, so edits show up on the next request.
//!
//! # Example
//!
//! ```rust
//! use render_cache::{RenderContext, RenderOptions, Renderer};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("hello.html"), "Hi, {{.Name}}!").unwrap();
//!
//! let renderer = Renderer::new(RenderOptions::default().with_directory(dir.path()));
//!
//! let mut out = Vec::new();
//! renderer
//!     .render(&mut out, "hello", &RenderContext::new().with("Name", "Ada"))
//!     .unwrap();
//! assert_eq!(out, b"Hi, Ada!");
//! ```

use std::fs;
use std::io::Write;
use std::path::{Component, Path};
use std::sync::Arc;

use crate::context::RenderContext;
use crate::error::{RenderError, Result};
use crate::options::{RenderOptions, TEMPLATE_SUFFIX};
use crate::store::{CacheStats, TemplateStore};
use crate::template::{engine_for, CompiledTemplate, TemplateEngine};

/// Renders named template files, compiling each one at most once.
///
/// `Renderer` is `Send + Sync`; share it behind an `Arc` or a `&'static`.
pub struct Renderer {
    options: RenderOptions,
    engine: Box<dyn TemplateEngine>,
    store: TemplateStore,
}

impl Renderer {
    /// Creates a renderer using the engine named in `options.engine`.
    pub fn new(options: RenderOptions) -> Self {
        let engine = engine_for(options.engine);
        Self::with_engine(options, engine)
    }

    /// Creates a renderer with a custom template engine.
    ///
    /// `options.engine` is ignored.
    pub fn with_engine(options: RenderOptions, engine: Box<dyn TemplateEngine>) -> Self {
        Self {
            options: options.normalized(),
            engine,
            store: TemplateStore::new(),
        }
    }

    /// Creates a renderer and wraps it in an `Arc` for sharing across handlers.
    pub fn shared(options: RenderOptions) -> Arc<Self> {
        Arc::new(Self::new(options))
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Renders template `name` with `ctx` and writes the result to `sink`.
    ///
    /// The file is `<directory>/<name>.html`. When filtering is enabled the
    /// output goes through the `"<name>_template"` hook first. The final bytes
    /// are written with a single `write_all`.
    ///
    /// # Errors
    ///
    /// - [`RenderError::TemplateNotFound`] if the file is missing or unreadable
    /// - [`RenderError::ParseError`] if the file is not valid template syntax
    /// - [`RenderError::ExecutionError`] if substitution or the filter hook fails
    /// - [`RenderError::WriteError`] if the sink rejects the write
    ///
    /// Nothing is written to `sink` unless rendering succeeded.
    pub fn render<W>(&self, sink: &mut W, name: &str, ctx: &RenderContext) -> Result<()>
    where
        W: Write + ?Sized,
    {
        let output = self.render_bytes(name, ctx)?;
        sink.write_all(&output).map_err(RenderError::WriteError)
    }

    /// Renders template `name` into a new buffer.
    pub fn render_to_vec(&self, name: &str, ctx: &RenderContext) -> Result<Vec<u8>> {
        self.render_bytes(name, ctx)
    }

    fn render_bytes(&self, name: &str, ctx: &RenderContext) -> Result<Vec<u8>> {
        let resolved = TemplateName::resolve(name)?;
        let template = self.template_for(name, &resolved)?;

        let output = template.execute(ctx.data())?;

        if self.options.filter {
            ctx.apply_filter(&resolved.hook_name(), output)
        } else {
            Ok(output)
        }
    }

    /// Resolves the compiled template for `name` without executing it.
    ///
    /// In cached mode this is the shared store entry (compiled on first use).
    /// In reload mode it is a fresh compile that is not stored.
    pub fn template(&self, name: &str) -> Result<Arc<CompiledTemplate>> {
        let resolved = TemplateName::resolve(name)?;
        self.template_for(name, &resolved)
    }

    fn template_for(&self, name: &str, resolved: &TemplateName) -> Result<Arc<CompiledTemplate>> {
        if self.options.reload {
            let compiled = self.compile(name, &resolved.key)?;
            self.store.record_uncached_compile();
            return Ok(Arc::new(compiled));
        }

        self.store
            .get_or_compile(&resolved.key, || self.compile(name, &resolved.key))
    }

    /// Compiles and stores each named template ahead of use.
    ///
    /// Returns the number of names resolved. In reload mode nothing is stored
    /// and `0` is returned. Stops at the first failure.
    pub fn preload<I, S>(&self, names: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.options.reload {
            return Ok(0);
        }
        let mut count = 0;
        for name in names {
            self.template(name.as_ref())?;
            count += 1;
        }
        Ok(count)
    }

    /// Returns true if `name` has a compiled entry in the store.
    pub fn is_cached(&self, name: &str) -> bool {
        TemplateName::resolve(name)
            .map(|resolved| self.store.contains(&resolved.key))
            .unwrap_or(false)
    }

    /// Returns the store keys (file names with extension), sorted.
    pub fn cached_names(&self) -> Vec<String> {
        self.store.keys()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    fn compile(&self, name: &str, key: &str) -> Result<CompiledTemplate> {
        let path = self.options.directory.join(key);
        let source = read_source(name, key, &path)?;
        tracing::debug!(
            key,
            path = %path.display(),
            reload = self.options.reload,
            "compiling template"
        );
        CompiledTemplate::compile(
            self.engine.as_ref(),
            key,
            &source,
            &self.options.delimiters(),
        )
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("options", &self.options)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// A caller-supplied name reduced to its canonical form.
///
/// `"a"`, `"a.html"`, `"./a"` and `"././a.html"` all produce the same `base`
/// and `key`, so they share one store entry.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TemplateName {
    /// Slash-joined path without the `.html` suffix, e.g. `"admin/index"`.
    base: String,
    /// `base` plus `.html`; the store key and the path under the directory.
    key: String,
}

impl TemplateName {
    /// Keeps only normal path components. Empty names, absolute paths and
    /// `..` components are rejected as not found.
    fn resolve(name: &str) -> Result<Self> {
        let mut parts = Vec::new();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return Err(Self::reject(name)),
            }
        }

        let joined = parts.join("/");
        let base = joined.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(&joined);
        if base.trim().is_empty() {
            return Err(Self::reject(name));
        }
        Ok(Self {
            base: base.to_string(),
            key: format!("{}{}", base, TEMPLATE_SUFFIX),
        })
    }

    fn reject(name: &str) -> RenderError {
        tracing::debug!(name, "rejecting template name outside the template directory");
        RenderError::not_found(name, name)
    }

    /// The filter hook consulted for this template.
    fn hook_name(&self) -> String {
        format!("{}_template", self.base)
    }
}

fn read_source(name: &str, key: &str, path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| {
        tracing::debug!(name, path = %path.display(), error = %e, "template file unreadable");
        RenderError::not_found(name, path)
    })?;
    String::from_utf8(bytes).map_err(|e| RenderError::parse(key, format!("not valid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn renderer(dir: &TempDir) -> Renderer {
        Renderer::new(RenderOptions::default().with_directory(dir.path()))
    }

    fn key(name: &str) -> String {
        TemplateName::resolve(name).unwrap().key
    }

    #[test]
    fn test_template_name_resolve() {
        assert_eq!(key("hello"), "hello.html");
        assert_eq!(key("hello.html"), "hello.html");
        assert_eq!(key("./hello"), "hello.html");
        assert_eq!(key("././hello.html"), "hello.html");
        assert_eq!(key("admin/index.html"), "admin/index.html");
        assert_eq!(key("admin/./index"), "admin/index.html");
        assert_eq!(key("admin//index/"), "admin/index.html");
        assert_eq!(key("x.txt"), "x.txt.html");

        let name = TemplateName::resolve("./admin/index.html").unwrap();
        assert_eq!(name.base, "admin/index");
        assert_eq!(name.hook_name(), "admin/index_template");
    }

    #[test]
    fn test_dot_segments_share_entry() {
        let dir = setup(&[("a.html", "{{.v}}"), ("x/y.html", "{{.v}}")]);
        let r = renderer(&dir);

        let a = r.template("a").unwrap();
        for variant in ["./a", "././a", "./a.html"] {
            assert!(Arc::ptr_eq(&a, &r.template(variant).unwrap()), "{}", variant);
        }
        let y = r.template("x/y").unwrap();
        assert!(Arc::ptr_eq(&y, &r.template("x/./y").unwrap()));

        assert_eq!(r.stats().compiles, 2);
        assert_eq!(
            r.cached_names(),
            vec!["a.html".to_string(), "x/y.html".to_string()]
        );
        assert!(r.is_cached("./a"));
        assert!(!r.is_cached("../a"));
    }

    #[test]
    fn test_shared_renderer_across_threads() {
        let dir = setup(&[("a.html", "{{.v}}")]);
        let r = Renderer::shared(RenderOptions::default().with_directory(dir.path()));

        let handle = {
            let r = Arc::clone(&r);
            std::thread::spawn(move || r.render_to_vec("a", &RenderContext::new().with("v", 1)))
        };
        assert_eq!(handle.join().unwrap().unwrap(), b"1");
        assert!(r.is_cached("a"));
    }

    #[test]
    fn test_render_basic() {
        let dir = setup(&[("hello.html", "Hi, {{.Name}}!")]);
        let r = renderer(&dir);
        let out = r
            .render_to_vec("hello", &RenderContext::new().with("Name", "Ada"))
            .unwrap();
        assert_eq!(out, b"Hi, Ada!");
        assert!(r.is_cached("hello"));
        assert_eq!(r.cached_names(), vec!["hello.html".to_string()]);
    }

    #[test]
    fn test_name_with_suffix_shares_entry() {
        let dir = setup(&[("x.html", "{{.v}}")]);
        let r = renderer(&dir);
        let a = r.template("x").unwrap();
        let b = r.template("x.html").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(r.stats().compiles, 1);
    }

    #[test]
    fn test_nested_name() {
        let dir = setup(&[("admin/index.html", "admin {{.v}}")]);
        let r = renderer(&dir);
        let out = r
            .render_to_vec("admin/index", &RenderContext::new().with("v", 1))
            .unwrap();
        assert_eq!(out, b"admin 1");
    }

    #[test]
    fn test_rejects_escaping_names() {
        let dir = setup(&[("a.html", "a")]);
        let r = renderer(&dir);
        for name in ["../a", "/etc/passwd", "", "  ", ".", ".html", "./", "sub/../../a", "a/.."] {
            let err = r.template(name).unwrap_err();
            assert!(err.is_not_found(), "expected not found for {:?}", name);
        }
        assert_eq!(r.stats().compiles, 0);
    }

    #[test]
    fn test_non_utf8_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bin.html"), [0xff, 0xfe, 0x00]).unwrap();
        let r = renderer(&dir);
        let err = r.template("bin").unwrap_err();
        assert!(matches!(err, RenderError::ParseError { .. }));
    }

    #[test]
    fn test_preload() {
        let dir = setup(&[("a.html", "a"), ("b.html", "b")]);
        let r = renderer(&dir);
        assert_eq!(r.preload(["a", "b"]).unwrap(), 2);
        assert_eq!(r.cached_names(), vec!["a.html".to_string(), "b.html".to_string()]);

        let err = r.preload(["a", "missing"]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_preload_in_reload_mode_is_noop() {
        let dir = setup(&[("a.html", "a")]);
        let r = Renderer::new(
            RenderOptions::default()
                .with_directory(dir.path())
                .with_reload(true),
        );
        assert_eq!(r.preload(["a"]).unwrap(), 0);
        assert!(r.cached_names().is_empty());
    }

    #[test]
    fn test_options_are_normalized() {
        let r = Renderer::new(RenderOptions::default().with_delimiters("", ""));
        assert_eq!(r.options().delim_left, "{{");
        assert_eq!(r.options().delim_right, "}}");
    }

    #[test]
    fn test_renderer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Renderer>();
    }
}
