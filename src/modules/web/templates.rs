//! Embedded HTML templates
//!
//! A small mustache-style dialect rendered against any `Serialize` view model:
//!
//! - `{{name}}` HTML-escaped value, `{{{name}}}` raw value
//! - `{{a.b}}` dotted lookup, `{{.}}` the current item
//! - `{{#name}}…{{/name}}` repeat for each array item, or once if truthy
//! - `{{^name}}…{{/name}}` render once if falsy or empty
//! - `{{! comment }}`
//!
//! Every template is parsed when the [`TemplateSet`] is built, so a broken
//! template fails construction instead of the first request that uses it.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::mem;
use thiserror::Error;

pub const DASHBOARD: &str = "dashboard.html";
pub const PLAN_ENTRIES_FORM: &str = "_plan_entries_form.html";
pub const PLAN_ENTRIES_SAVED: &str = "_plan_entries_saved.html";

const EMBEDDED: [(&str, &str); 3] = [
    (DASHBOARD, include_str!("../../../templates/dashboard.html")),
    (
        PLAN_ENTRIES_FORM,
        include_str!("../../../templates/_plan_entries_form.html"),
    ),
    (
        PLAN_ENTRIES_SAVED,
        include_str!("../../../templates/_plan_entries_saved.html"),
    ),
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("{template}: unclosed tag at byte {offset}")]
    UnclosedTag { template: String, offset: usize },

    #[error("{template}: empty tag at byte {offset}")]
    EmptyTag { template: String, offset: usize },

    #[error("{template}: section {name} is never closed")]
    UnclosedSection { template: String, name: String },

    #[error("{template}: unexpected {{{{/{name}}}}}")]
    UnexpectedClose { template: String, name: String },

    #[error("template {0} does not exist")]
    UnknownTemplate(String),

    #[error("unable to encode view model: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Escaped(String),
    Raw(String),
    Section {
        name: String,
        inverted: bool,
        body: Vec<Node>,
    },
}

/// Parsed templates, looked up by file name
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: HashMap<String, Vec<Node>>,
}

impl TemplateSet {
    /// Parse the templates compiled into the binary
    pub fn embedded() -> Result<Self, TemplateError> {
        Self::from_sources(EMBEDDED)
    }

    pub fn from_sources<'a, I>(sources: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut templates = HashMap::new();
        for (name, source) in sources {
            templates.insert(name.to_string(), parse(name, source)?);
        }
        Ok(Self { templates })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, TemplateError> {
        let nodes = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))?;
        let context = serde_json::to_value(data)?;
        let mut out = String::new();
        render_nodes(nodes, &mut vec![&context], &mut out);
        Ok(out)
    }
}

fn parse(template: &str, source: &str) -> Result<Vec<Node>, TemplateError> {
    let mut current: Vec<Node> = Vec::new();
    let mut parents: Vec<(String, bool, Vec<Node>)> = Vec::new();
    let mut rest = source;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            current.push(Node::Text(rest[..start].to_string()));
        }
        let triple = rest[start..].starts_with("{{{");
        let (open, close) = if triple { (3, "}}}") } else { (2, "}}") };
        let after = &rest[start + open..];
        let end = after.find(close).ok_or_else(|| TemplateError::UnclosedTag {
            template: template.to_string(),
            offset: offset + start,
        })?;
        let tag = after[..end].trim();
        if tag.is_empty() {
            return Err(TemplateError::EmptyTag {
                template: template.to_string(),
                offset: offset + start,
            });
        }

        if triple {
            current.push(Node::Raw(tag.to_string()));
        } else if let Some(name) = tag.strip_prefix('#') {
            parents.push((name.trim().to_string(), false, mem::take(&mut current)));
        } else if let Some(name) = tag.strip_prefix('^') {
            parents.push((name.trim().to_string(), true, mem::take(&mut current)));
        } else if let Some(name) = tag.strip_prefix('/') {
            let name = name.trim();
            match parents.pop() {
                Some((open_name, inverted, siblings)) if open_name == name => {
                    let body = mem::replace(&mut current, siblings);
                    current.push(Node::Section {
                        name: open_name,
                        inverted,
                        body,
                    });
                }
                _ => {
                    return Err(TemplateError::UnexpectedClose {
                        template: template.to_string(),
                        name: name.to_string(),
                    });
                }
            }
        } else if !tag.starts_with('!') {
            current.push(Node::Escaped(tag.to_string()));
        }

        let consumed = start + open + end + close.len();
        offset += consumed;
        rest = &rest[consumed..];
    }
    if !rest.is_empty() {
        current.push(Node::Text(rest.to_string()));
    }

    if let Some((name, _, _)) = parents.pop() {
        return Err(TemplateError::UnclosedSection {
            template: template.to_string(),
            name,
        });
    }
    Ok(current)
}

fn render_nodes<'a>(nodes: &'a [Node], stack: &mut Vec<&'a Value>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Escaped(name) => {
                if let Some(value) = lookup(stack, name) {
                    escape_into(&display(value), out);
                }
            }
            Node::Raw(name) => {
                if let Some(value) = lookup(stack, name) {
                    out.push_str(&display(value));
                }
            }
            Node::Section {
                name,
                inverted,
                body,
            } => {
                let value = lookup(stack, name);
                let truthy = value.is_some_and(is_truthy);
                match (value, *inverted) {
                    (_, true) => {
                        if !truthy {
                            render_nodes(body, stack, out);
                        }
                    }
                    (Some(Value::Array(items)), false) => {
                        for item in items {
                            stack.push(item);
                            render_nodes(body, stack, out);
                            stack.pop();
                        }
                    }
                    (Some(value), false) if truthy => {
                        stack.push(value);
                        render_nodes(body, stack, out);
                        stack.pop();
                    }
                    _ => {}
                }
            }
        }
    }
}

fn lookup<'a>(stack: &[&'a Value], name: &str) -> Option<&'a Value> {
    if name == "." {
        return stack.last().copied();
    }
    let mut parts = name.split('.');
    let first = parts.next()?;
    let root = stack
        .iter()
        .rev()
        .find_map(|ctx: &&'a Value| (*ctx).get(first))?;
    parts.try_fold(root, |value, part| value.get(part))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}
