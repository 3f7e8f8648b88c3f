//! Error types for template rendering.
//!
//! This module provides [`RenderError`], the error type for every operation of
//! the render cache. Engine-specific errors (MiniJinja, the substitution parser)
//! are mapped into it so callers only ever match on four cases.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for template rendering operations.
///
/// No variant is fatal: the caller decides whether to log, emit an error
/// response, or retry. On any error the sink has received nothing, because
/// output is buffered and written in one piece after execution succeeds.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template file does not exist or could not be read.
    #[error("template not found: {} ({})", .name, .path.display())]
    TemplateNotFound {
        /// The name the caller asked for.
        name: String,
        /// The file the name resolved to.
        path: PathBuf,
    },

    /// The template file is not valid template syntax.
    #[error("parse error in template {name}: {message}")]
    ParseError { name: String, message: String },

    /// Substitution failed against the provided data.
    #[error("execution error in template {name}: {message}")]
    ExecutionError { name: String, message: String },

    /// The output sink rejected the rendered bytes.
    #[error("failed to write rendered output: {0}")]
    WriteError(#[source] std::io::Error),
}

impl RenderError {
    pub(crate) fn not_found(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        RenderError::TemplateNotFound {
            name: name.into(),
            path: path.into(),
        }
    }

    pub(crate) fn parse(name: impl Into<String>, message: impl Into<String>) -> Self {
        RenderError::ParseError {
            name: name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn execution(name: impl Into<String>, message: impl Into<String>) -> Self {
        RenderError::ExecutionError {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns true if this is a [`RenderError::TemplateNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, RenderError::TemplateNotFound { .. })
    }
}

/// Result type for render cache operations.
pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = RenderError::not_found("hello", "template/hello.html");
        let msg = err.to_string();
        assert!(msg.contains("template not found"));
        assert!(msg.contains("hello"));
        assert!(msg.contains("template/hello.html"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_error_display() {
        let err = RenderError::parse("hello.html", "unclosed action");
        assert_eq!(
            err.to_string(),
            "parse error in template hello.html: unclosed action"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_write_error_has_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err = RenderError::WriteError(io_err);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("closed"));
    }
}
