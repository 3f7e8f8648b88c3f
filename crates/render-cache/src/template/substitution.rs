//! Dotted-path substitution engine.
//!
//! [`SubstitutionEngine`] is the default engine. A template is literal text with
//! actions enclosed in the configured delimiter pair (`{{` and `}}` unless
//! configured otherwise).
//!
//! # Syntax
//!
//! - `{{.Name}}` - value of key `Name` in the data mapping
//! - `{{.User.Email}}` - nested object access
//! - `{{.Items.0}}` - array index access
//! - `{{.}}` - the whole data mapping, as JSON
//! - `{{/* note */}}` - comment, renders nothing
//!
//! Whitespace inside an action is ignored: `{{ .Name }}` is the same as
//! `{{.Name}}`. A closing delimiter outside of an action is plain text.
//!
//! # Example
//!
//! ```rust
//! use render_cache::template::{Executable, SubstitutionEngine, TemplateEngine};
//! use render_cache::Delimiters;
//! use serde_json::json;
//!
//! let engine = SubstitutionEngine::new();
//! let program = engine
//!     .compile("hello.html", "Hi, {{.Name}}!", &Delimiters::default())
//!     .unwrap();
//!
//! let mut out = Vec::new();
//! let data = json!({"Name": "Ada"});
//! program.execute(data.as_object().unwrap(), &mut out).unwrap();
//! assert_eq!(out, b"Hi, Ada!");
//! ```

use serde_json::{Map, Value};

use super::{Executable, TemplateEngine};
use crate::error::{RenderError, Result};
use crate::options::Delimiters;

/// A parsed piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text copied to the output.
    Text(String),
    /// A data lookup. An empty path is the whole data mapping.
    Field(Vec<String>),
}

/// Parses `source` into nodes using the given delimiters.
///
/// Comments are dropped at parse time; adjacent text is kept in separate nodes.
pub fn parse(name: &str, source: &str, delimiters: &Delimiters) -> Result<Vec<Node>> {
    let left = delimiters.left();
    let right = delimiters.right();
    let mut nodes = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find(left) {
        if start > 0 {
            nodes.push(Node::Text(rest[..start].to_string()));
        }
        let after_open = &rest[start + left.len()..];
        let Some(end) = after_open.find(right) else {
            let line = line_of(source, source.len() - rest.len() + start);
            return Err(RenderError::parse(
                name,
                format!("unclosed action starting on line {}", line),
            ));
        };

        let action = after_open[..end].trim();
        let line = line_of(source, source.len() - rest.len() + start);
        if let Some(node) = parse_action(name, action, line)? {
            nodes.push(node);
        }
        rest = &after_open[end + right.len()..];
    }

    if !rest.is_empty() {
        nodes.push(Node::Text(rest.to_string()));
    }
    Ok(nodes)
}

fn parse_action(name: &str, action: &str, line: usize) -> Result<Option<Node>> {
    if action.is_empty() {
        return Err(RenderError::parse(
            name,
            format!("empty action on line {}", line),
        ));
    }
    if action.starts_with("/*") {
        if action.ends_with("*/") && action.len() >= 4 {
            return Ok(None);
        }
        return Err(RenderError::parse(
            name,
            format!("unterminated comment on line {}", line),
        ));
    }
    if action == "." {
        return Ok(Some(Node::Field(Vec::new())));
    }

    let Some(path) = action.strip_prefix('.') else {
        return Err(RenderError::parse(
            name,
            format!("unexpected {:?} in action on line {}", action, line),
        ));
    };

    let mut segments = Vec::new();
    for segment in path.split('.') {
        if segment.is_empty() || !segment.chars().all(is_ident_char) {
            return Err(RenderError::parse(
                name,
                format!("bad field path {:?} on line {}", action, line),
            ));
        }
        segments.push(segment.to_string());
    }
    Ok(Some(Node::Field(segments)))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Resolves a dotted path in the data mapping.
///
/// Supports object keys and array indices (`items.0.name`).
fn resolve_path<'a>(data: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = data.get(first)?;

    for part in rest {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(arr) => {
                let index: usize = part.parse().ok()?;
                arr.get(index)?
            }
            _ => return None,
        };
    }

    Some(current)
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::String(s) => out.extend_from_slice(s.as_bytes()),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Value::Null => {}
        // For arrays and objects, use JSON representation
        Value::Array(_) | Value::Object(_) => out.extend_from_slice(value.to_string().as_bytes()),
    }
}

/// A compiled substitution template: literal text and field lookups.
#[derive(Debug, Clone)]
pub struct SubstitutionProgram {
    name: String,
    nodes: Vec<Node>,
}

impl SubstitutionProgram {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

impl Executable for SubstitutionProgram {
    fn execute(&self, data: &Map<String, Value>, out: &mut Vec<u8>) -> Result<()> {
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.extend_from_slice(text.as_bytes()),
                Node::Field(path) if path.is_empty() => {
                    let json = serde_json::to_string(data)
                        .map_err(|e| RenderError::execution(&self.name, e.to_string()))?;
                    out.extend_from_slice(json.as_bytes());
                }
                Node::Field(path) => {
                    let value = resolve_path(data, path).ok_or_else(|| {
                        RenderError::execution(
                            &self.name,
                            format!("no value for .{}", path.join(".")),
                        )
                    })?;
                    write_value(value, out);
                }
            }
        }
        Ok(())
    }
}

/// Engine for the dotted-path substitution language.
///
/// Stateless; one instance can compile any number of templates from any thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstitutionEngine;

impl SubstitutionEngine {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateEngine for SubstitutionEngine {
    fn compile(
        &self,
        name: &str,
        source: &str,
        delimiters: &Delimiters,
    ) -> Result<Box<dyn Executable>> {
        let nodes = parse(name, source, delimiters)?;
        Ok(Box::new(SubstitutionProgram {
            name: name.to_string(),
            nodes,
        }))
    }
}
