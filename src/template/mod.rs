//! Message template system
//!
//! Templates are plain text with `{{...}}` actions. Supported actions:
//!
//! - `{{.Name}}` inserts a context field (the leading dot is required)
//! - `{{.User.Email}}` walks nested maps
//! - `{{.}}` inserts the whole context (must be a scalar)
//! - `{{/* ... */}}` is a comment
//! - `{{- ` and ` -}}` trim whitespace on that side of the action
//!
//! Rendering is strict: a field missing from the context is an error.

mod message;

pub use message::{MessageData, STANDARD_MESSAGE};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Data a template is rendered against
pub type TemplateContext = Value;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Template parse and render errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("line {line}: unclosed action")]
    UnclosedAction { line: usize },

    #[error("line {line}: empty action")]
    EmptyAction { line: usize },

    #[error("line {line}: invalid field reference {field:?}")]
    InvalidField { line: usize, field: String },

    #[error("line {line}: unclosed comment")]
    UnclosedComment { line: usize },

    #[error("line {line}: no value for key {key:?}")]
    MissingKey { line: usize, key: String },

    #[error("line {line}: value at {key:?} is not a scalar")]
    NotScalar { line: usize, key: String },

    #[error("invalid context: {0}")]
    Context(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    /// Field lookup; an empty path is the context itself
    Field { path: Vec<String>, line: usize },
}

/// A parsed template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse template source
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, TemplateError> {
        let mut nodes = Vec::new();
        let mut pos = 0;
        let mut trim_next = false;

        loop {
            let Some(offset) = source[pos..].find(OPEN) else {
                push_text(&mut nodes, &source[pos..], trim_next, false);
                break;
            };

            let open = pos + offset;
            let line = line_at(source, open);
            let mut inner_start = open + OPEN.len();

            let trim_left = has_left_trim_marker(&source[inner_start..]);
            if trim_left {
                inner_start += 2;
            }
            push_text(&mut nodes, &source[pos..open], trim_next, trim_left);

            if source[inner_start..].starts_with("/*") {
                let (after, trim_right) = skip_comment(source, inner_start, line)?;
                trim_next = trim_right;
                pos = after;
                continue;
            }

            let Some(close_offset) = source[inner_start..].find(CLOSE) else {
                return Err(TemplateError::UnclosedAction { line });
            };
            let close = inner_start + close_offset;
            let mut inner = &source[inner_start..close];

            // "{{.A {{.B}}" means the first action was never closed
            if inner.contains(OPEN) {
                return Err(TemplateError::UnclosedAction { line });
            }

            trim_next = has_right_trim_marker(inner);
            if trim_next {
                inner = &inner[..inner.len() - 1];
            }

            let field = inner.trim();
            if field.is_empty() {
                return Err(TemplateError::EmptyAction { line });
            }

            nodes.push(Node::Field {
                path: parse_field(field, line)?,
                line,
            });
            pos = close + CLOSE.len();
        }

        Ok(Self {
            name: name.into(),
            nodes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render against a context value
    pub fn render(&self, context: &TemplateContext) -> Result<String, TemplateError> {
        let mut out = String::new();

        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Field { path, line } => {
                    let value = lookup(context, path, *line)?;
                    write_scalar(&mut out, value, path, *line)?;
                }
            }
        }

        Ok(out)
    }

    /// Render any serializable value (struct, map, `json!` literal)
    pub fn render_with<T: Serialize + ?Sized>(&self, context: &T) -> Result<String, TemplateError> {
        self.render(&to_context(context)?)
    }
}

/// Convert a serializable value into a template context
pub fn to_context<T: Serialize + ?Sized>(value: &T) -> Result<TemplateContext, TemplateError> {
    serde_json::to_value(value).map_err(|e| TemplateError::Context(e.to_string()))
}

fn push_text(nodes: &mut Vec<Node>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn line_at(source: &str, byte_pos: usize) -> usize {
    source[..byte_pos].matches('\n').count() + 1
}

/// `{{- ` needs whitespace after the dash, otherwise `{{-3}}` would be ambiguous
fn has_left_trim_marker(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_ascii_whitespace())
}

fn has_right_trim_marker(inner: &str) -> bool {
    let bytes = inner.as_bytes();
    bytes.len() >= 2
        && bytes[bytes.len() - 1] == b'-'
        && bytes[bytes.len() - 2].is_ascii_whitespace()
}

/// Returns the position after the closing delimiter and whether it carried a trim marker
fn skip_comment(source: &str, start: usize, line: usize) -> Result<(usize, bool), TemplateError> {
    let body = start + 2;
    let end = source[body..]
        .find("*/")
        .map(|offset| body + offset + 2)
        .ok_or(TemplateError::UnclosedComment { line })?;

    let rest = &source[end..];
    if rest.starts_with(CLOSE) {
        return Ok((end + CLOSE.len(), false));
    }

    let trimmed = rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let skipped = rest.len() - trimmed.len();
    if skipped > 0 && trimmed.starts_with("-}}") {
        return Ok((end + skipped + 3, true));
    }

    Err(TemplateError::UnclosedComment { line })
}

fn parse_field(field: &str, line: usize) -> Result<Vec<String>, TemplateError> {
    if field == "." {
        return Ok(Vec::new());
    }

    let Some(path) = field.strip_prefix('.') else {
        return Err(TemplateError::InvalidField {
            line,
            field: field.to_string(),
        });
    };
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();

    let valid = segments.iter().all(|segment| {
        !segment.is_empty() && segment.chars().all(|c| c.is_alphanumeric() || c == '_')
    });
    if !valid {
        return Err(TemplateError::InvalidField {
            line,
            field: field.to_string(),
        });
    }

    Ok(segments)
}

fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        ".".to_string()
    } else {
        path.join(".")
    }
}

fn lookup<'a>(context: &'a Value, path: &[String], line: usize) -> Result<&'a Value, TemplateError> {
    let mut value = context;
    for key in path {
        value = value
            .as_object()
            .and_then(|map| map.get(key))
            .ok_or_else(|| TemplateError::MissingKey {
                line,
                key: display_path(path),
            })?;
    }
    Ok(value)
}

fn write_scalar(out: &mut String, value: &Value, path: &[String], line: usize) -> Result<(), TemplateError> {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Array(_) | Value::Object(_) => {
            return Err(TemplateError::NotScalar {
                line,
                key: display_path(path),
            })
        }
    }
    Ok(())
}
