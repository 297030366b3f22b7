//! `${...}` substitution in scalar values.
//!
//! ```text
//! ${name}                  property `name`
//! ${sys:name}              property `name`
//! ${env:NAME}              environment variable `NAME`
//! ${path:server.port}      another value of the same config
//! ${name:-fallback}        fallback when `name` is unresolved
//! ${a:-${b:-last}}         fallbacks nest
//! $${literal}              escaped, yields `${literal}`
//! ```
//!
//! Properties and environment variables are read through a [`PropertySource`]
//! handed to the config at construction time, so tests can substitute a
//! fixed set of values for the process environment.
//!
//! A string that contained at least one reference is re-typed after
//! substitution with [`Scalar::guess`], so
//! `${PORT}` becomes an integer when `PORT=8080`.

use std::collections::HashMap;
use std::fmt;

use crate::error::{ConfigError, Result};
use crate::navigate;
use crate::node::{Node, Scalar};
use crate::path::PathExpression;

/// Maximum nesting of references, fallbacks and `path:` indirections.
pub const MAX_DEPTH: usize = 16;

/// Source of values for `${sys:...}` and `${env:...}` references.
pub trait PropertySource: fmt::Debug + Send + Sync {
    /// Look up an application property. Unprefixed references use this.
    fn property(&self, name: &str) -> Option<String>;

    /// Look up an environment variable.
    fn env(&self, name: &str) -> Option<String>;
}

/// Explicit properties plus the real process environment. The default source.
#[derive(Debug, Clone, Default)]
pub struct ProcessProperties {
    properties: HashMap<String, String>,
}

impl ProcessProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_string(), value.to_string());
        self
    }
}

impl PropertySource for ProcessProperties {
    fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }

    fn env(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fully in-memory properties and environment.
#[derive(Debug, Clone, Default)]
pub struct MapProperties {
    properties: HashMap<String, String>,
    env: HashMap<String, String>,
}

impl MapProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_env(mut self, name: &str, value: &str) -> Self {
        self.env.insert(name.to_string(), value.to_string());
        self
    }
}

impl PropertySource for MapProperties {
    fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }

    fn env(&self, name: &str) -> Option<String> {
        self.env.get(name).cloned()
    }
}

/// Performs substitution for one config.
pub struct Extrapolator<'a> {
    name: &'a str,
    properties: &'a dyn PropertySource,
    root: &'a Node,
}

impl<'a> Extrapolator<'a> {
    /// `name` labels errors; `root` is what `${path:...}` resolves against.
    pub fn new(name: &'a str, properties: &'a dyn PropertySource, root: &'a Node) -> Self {
        Self {
            name,
            properties,
            root,
        }
    }

    /// Substitute every string scalar in `node`, recursively.
    pub fn node(&self, node: &Node) -> Result<Node> {
        Ok(match node {
            Node::Scalar(Scalar::String(s)) => Node::Scalar(self.scalar(s)?),
            Node::Scalar(other) => Node::Scalar(other.clone()),
            Node::Sequence(items) => Node::Sequence(
                items
                    .iter()
                    .map(|item| self.node(item))
                    .collect::<Result<_>>()?,
            ),
            Node::Mapping(map) => Node::Mapping(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.node(v)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    /// Substitute one string and guess the type of the result.
    pub fn scalar(&self, text: &str) -> Result<Scalar> {
        if !text.contains("${") {
            return Ok(Scalar::String(text.to_string()));
        }
        let substituted = self.substitute(text, 0)?;
        Ok(Scalar::guess(&substituted))
    }

    /// Substitute references in `text` without re-typing.
    pub fn substitute(&self, text: &str, depth: usize) -> Result<String> {
        if depth > MAX_DEPTH {
            return Err(ConfigError::malformed(
                self.name,
                format!("references nested deeper than {MAX_DEPTH} levels in '{text}'"),
            ));
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix("$${") {
                out.push_str("${");
                rest = after;
            } else if let Some(after) = tail.strip_prefix("${") {
                let end = closing_brace(after).ok_or_else(|| {
                    ConfigError::malformed(self.name, format!("unterminated reference in '{text}'"))
                })?;
                out.push_str(&self.reference(&after[..end], depth)?);
                rest = &after[end + 1..];
            } else {
                out.push('$');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Resolve the inside of one `${...}`.
    fn reference(&self, inner: &str, depth: usize) -> Result<String> {
        let (name_part, fallback) = match top_level_fallback(inner) {
            Some(pos) => (&inner[..pos], Some(&inner[pos + 2..])),
            None => (inner, None),
        };
        let name = self.substitute(name_part.trim(), depth + 1)?;

        if let Some(value) = self.lookup(&name, depth)? {
            tracing::trace!(reference = %name, "substituted reference");
            return Ok(value);
        }
        match fallback {
            Some(fallback) => self.substitute(fallback, depth + 1),
            None => Err(ConfigError::malformed(
                self.name,
                format!("unresolved reference '${{{inner}}}'"),
            )),
        }
    }

    fn lookup(&self, name: &str, depth: usize) -> Result<Option<String>> {
        if let Some(var) = name.strip_prefix("env:") {
            return Ok(self.properties.env(var));
        }
        if let Some(prop) = name.strip_prefix("sys:") {
            return Ok(self.properties.property(prop));
        }
        let Some(path) = name.strip_prefix("path:") else {
            return Ok(self.properties.property(name));
        };

        let found = navigate::resolve(self.root, &PathExpression::parse(path));
        match found {
            Ok(Node::Scalar(s)) => self.substitute(&s.render(), depth + 1).map(Some),
            Ok(_) => Ok(None),
            Err(e) if e.is_absent() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Index of the `}` closing a reference whose `${` has been consumed.
fn closing_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 1;
            }
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Position of the first `:-` not inside a nested reference.
fn top_level_fallback(inner: &str) -> Option<usize> {
    let mut depth = 0usize;
    let bytes = inner.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 1;
            }
            b'}' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b'-') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}
