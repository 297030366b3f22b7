//! The configuration tree: scalars, sequences and insertion-ordered mappings.
//!
//! Documents are parsed by `serde_yaml` into its own `Value` and then folded
//! into [`Node`], which is the only representation the query, merge and
//! extrapolation code ever sees. YAML merge keys (`<<: *anchor`) are applied
//! before the conversion, and tags are dropped.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// An insertion-ordered mapping from string keys to nodes.
pub type Mapping = IndexMap<String, Node>;

/// A leaf value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A node in a configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Scalar(Scalar),
    Sequence(Vec<Node>),
    Mapping(Mapping),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Type text that arrives without YAML typing (environment variables,
    /// substituted references): boolean, then integer, then decimal float,
    /// else string. Exponent forms and `NaN`/`inf` stay strings.
    pub fn guess(text: &str) -> Scalar {
        if let Some(b) = parse_bool(text) {
            return Scalar::Bool(b);
        }
        if let Ok(i) = text.parse::<i64>() {
            return Scalar::Int(i);
        }
        let decimal = text.contains('.')
            && text
                .trim_start_matches(['+', '-'])
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.');
        match text.parse::<f64>() {
            Ok(f) if decimal => Scalar::Float(f),
            _ => Scalar::String(text.to_string()),
        }
    }

    /// String form used for coercion and predicate comparison.
    ///
    /// Integral floats keep their fractional digit (`1.0`, not `1`) so the
    /// text round-trips to the same type.
    pub fn render(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.1}"),
            Scalar::Float(f) => f.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Node {
    pub fn null() -> Self {
        Node::Scalar(Scalar::Null)
    }

    pub fn empty_mapping() -> Self {
        Node::Mapping(Mapping::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(Scalar::Null))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Vec<Node>> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Short human name of the node kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Scalar(Scalar::Null) => "null",
            Node::Scalar(_) => "scalar",
            Node::Sequence(_) => "sequence",
            Node::Mapping(_) => "mapping",
        }
    }

    /// Convert a parsed `serde_yaml` value.
    ///
    /// Fails only on mapping keys that are themselves sequences or mappings.
    pub fn from_yaml(value: serde_yaml::Value) -> Result<Node, String> {
        use serde_yaml::Value;

        Ok(match value {
            Value::Null => Node::null(),
            Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Node::Scalar(Scalar::Int(i)),
                None => Node::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => Node::Scalar(Scalar::String(s)),
            Value::Sequence(items) => Node::Sequence(
                items
                    .into_iter()
                    .map(Node::from_yaml)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Mapping(map) => {
                let mut out = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    let key = yaml_key(&key)?;
                    out.insert(key, Node::from_yaml(value)?);
                }
                Node::Mapping(out)
            }
            Value::Tagged(tagged) => Node::from_yaml(tagged.value)?,
        })
    }

    /// Parse YAML text into a node, applying merge keys.
    ///
    /// `name` identifies the document in errors.
    pub fn parse_yaml(name: &str, text: &str) -> Result<Node, ConfigError> {
        let parse_err = |source| ConfigError::Parse {
            name: name.to_string(),
            source,
        };
        let mut value: serde_yaml::Value = serde_yaml::from_str(text).map_err(parse_err)?;
        value.apply_merge().map_err(parse_err)?;
        Node::from_yaml(value).map_err(|reason| ConfigError::malformed(name, reason))
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn yaml_key(key: &serde_yaml::Value) -> Result<String, String> {
    use serde_yaml::Value;

    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Tagged(tagged) => yaml_key(&tagged.value),
        other => Err(format!("unsupported mapping key {other:?}")),
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Scalar(s) => write!(f, "{s}"),
            other => {
                let json = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<Scalar> for Node {
    fn from(s: Scalar) -> Self {
        Node::Scalar(s)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Scalar(Scalar::String(s))
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Scalar(Scalar::Int(i))
    }
}

impl From<i32> for Node {
    fn from(i: i32) -> Self {
        Node::Scalar(Scalar::Int(i64::from(i)))
    }
}

impl From<f64> for Node {
    fn from(f: f64) -> Self {
        Node::Scalar(Scalar::Float(f))
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Sequence(items)
    }
}

impl From<Mapping> for Node {
    fn from(map: Mapping) -> Self {
        Node::Mapping(map)
    }
}

/// String-based coercion from a resolved node into a Rust value.
///
/// Returning `None` means the node cannot be represented as `Self`; callers
/// turn that into [`ConfigError::InvalidType`](crate::ConfigError::InvalidType).
pub trait FromNode: Sized {
    /// Name of the target type, for error messages.
    const EXPECTED: &'static str;

    fn from_node(node: &Node) -> Option<Self>;
}

impl FromNode for Node {
    const EXPECTED: &'static str = "node";

    fn from_node(node: &Node) -> Option<Self> {
        Some(node.clone())
    }
}

impl FromNode for String {
    const EXPECTED: &'static str = "string";

    fn from_node(node: &Node) -> Option<Self> {
        match node {
            Node::Scalar(s) if !s.is_null() => Some(s.render()),
            _ => None,
        }
    }
}

impl FromNode for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_node(node: &Node) -> Option<Self> {
        match node.as_scalar()? {
            Scalar::Bool(b) => Some(*b),
            Scalar::String(s) => parse_bool(s.trim()),
            _ => None,
        }
    }
}

impl FromNode for i64 {
    const EXPECTED: &'static str = "long";

    fn from_node(node: &Node) -> Option<Self> {
        match node.as_scalar()? {
            Scalar::Int(i) => Some(*i),
            Scalar::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromNode for i32 {
    const EXPECTED: &'static str = "integer";

    fn from_node(node: &Node) -> Option<Self> {
        i64::from_node(node).and_then(|i| i32::try_from(i).ok())
    }
}

impl FromNode for u64 {
    const EXPECTED: &'static str = "unsigned integer";

    fn from_node(node: &Node) -> Option<Self> {
        i64::from_node(node).and_then(|i| u64::try_from(i).ok())
    }
}

impl FromNode for f64 {
    const EXPECTED: &'static str = "double";

    fn from_node(node: &Node) -> Option<Self> {
        match node.as_scalar()? {
            Scalar::Float(f) => Some(*f),
            Scalar::Int(i) => Some(*i as f64),
            Scalar::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl<T: FromNode> FromNode for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_node(node: &Node) -> Option<Self> {
        node.as_sequence()?.iter().map(T::from_node).collect()
    }
}
