//! Plain-text template rendering.
//!
//! # Responsibility
//! - Substitute `{{name}}` placeholders from string bindings.
//! - Resolve `{{#if flag}}...{{/if}}` blocks from boolean flags.
//!
//! # Invariants
//! - A placeholder without a binding renders as an empty string, never
//!   as literal markup.
//! - Each `{{#if}}...{{/if}}` pair is resolved on its own: block
//!   boundaries are tracked with a nesting stack, so templates with
//!   several blocks (or nested ones) cannot corrupt one another.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*(?:#if\s+([A-Za-z_][A-Za-z0-9_]*)|(/if)|([A-Za-z_][A-Za-z0-9_]*))\s*\}\}")
        .expect("valid template token regex")
});

pub type RenderResult<T> = Result<T, TemplateError>;

/// Malformed template structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// An `{{#if flag}}` block was never closed.
    UnterminatedBlock(String),
    /// A `{{/if}}` appeared without a matching opener.
    UnmatchedClose,
}

impl Display for TemplateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnterminatedBlock(flag) => {
                write!(f, "conditional block `{flag}` is never closed")
            }
            Self::UnmatchedClose => write!(f, "closing delimiter without an open block"),
        }
    }
}

impl Error for TemplateError {}

struct Block {
    flag: String,
    content: String,
}

/// Renders a template against string bindings and boolean flags.
///
/// Unknown placeholder names resolve to the empty string; unknown flags
/// count as false, suppressing their block and both delimiters.
pub fn render(
    template: &str,
    bindings: &BTreeMap<String, String>,
    flags: &BTreeMap<String, bool>,
) -> RenderResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut stack: Vec<Block> = Vec::new();
    let mut cursor = 0;

    for caps in TOKEN_RE.captures_iter(template) {
        let token = caps.get(0).expect("match always has a full group");
        push_text(&mut out, &mut stack, &template[cursor..token.start()]);
        cursor = token.end();

        if let Some(flag) = caps.get(1) {
            stack.push(Block {
                flag: flag.as_str().to_string(),
                content: String::new(),
            });
        } else if caps.get(2).is_some() {
            let block = stack.pop().ok_or(TemplateError::UnmatchedClose)?;
            if flags.get(&block.flag).copied().unwrap_or(false) {
                push_text(&mut out, &mut stack, &block.content);
            }
        } else if let Some(name) = caps.get(3) {
            let value = bindings.get(name.as_str()).map(String::as_str).unwrap_or("");
            push_text(&mut out, &mut stack, value);
        }
    }

    if let Some(block) = stack.last() {
        return Err(TemplateError::UnterminatedBlock(block.flag.clone()));
    }

    out.push_str(&template[cursor..]);
    Ok(out)
}

fn push_text(out: &mut String, stack: &mut [Block], text: &str) {
    match stack.last_mut() {
        Some(block) => block.content.push_str(text),
        None => out.push_str(text),
    }
}
