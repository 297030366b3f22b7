//! The [`Config`] wrapper: a named mapping plus typed, path-based reads.

use std::borrow::Cow;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{ConfigError, Result};
use crate::extrapolate::{Extrapolator, ProcessProperties, PropertySource};
use crate::flatten;
use crate::merge::{self, MergeAction};
use crate::navigate;
use crate::node::{FromNode, Mapping, Node};
use crate::path::PathExpression;
use crate::visit;

/// A loaded configuration.
///
/// The root is always a mapping. It is shared between clones and copied on
/// the first [`merge`](Config::merge) into a shared instance, so cloning a
/// Config or taking a sub-map never aliases state another Config can mutate.
///
/// When extrapolation is enabled, every read substitutes `${...}` references
/// in the returned value (see [`extrapolate`](crate::extrapolate)). The flag
/// affects reads only; stored values are never rewritten.
#[derive(Debug, Clone)]
pub struct Config {
    name: String,
    root: Arc<Node>,
    extrapolate: bool,
    properties: Arc<dyn PropertySource>,
}

impl Config {
    /// Wrap an in-memory mapping.
    pub fn from_mapping(name: &str, map: Mapping) -> Self {
        Self {
            name: name.to_string(),
            root: Arc::new(Node::Mapping(map)),
            extrapolate: false,
            properties: Arc::new(ProcessProperties::new()),
        }
    }

    /// Wrap a parsed tree. A null document is an empty config; any other
    /// non-mapping root is [`ConfigError::MalformedConfig`].
    pub fn from_node(name: &str, node: Node) -> Result<Self> {
        match node {
            Node::Mapping(map) => Ok(Self::from_mapping(name, map)),
            n if n.is_null() => Ok(Self::from_mapping(name, Mapping::new())),
            other => Err(ConfigError::malformed(
                name,
                format!("document root is a {}, expected a mapping", other.kind()),
            )),
        }
    }

    /// Parse YAML text.
    pub fn from_yaml_str(name: &str, text: &str) -> Result<Self> {
        Self::from_node(name, Node::parse_yaml(name, text)?)
    }

    /// Replace the source used for `${sys:...}` / `${env:...}` references.
    pub fn with_properties(mut self, properties: Arc<dyn PropertySource>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_extrapolate(mut self, extrapolate: bool) -> Self {
        self.extrapolate = extrapolate;
        self
    }

    pub fn set_extrapolate(&mut self, extrapolate: bool) {
        self.extrapolate = extrapolate;
    }

    pub fn is_extrapolating(&self) -> bool {
        self.extrapolate
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw tree, without extrapolation.
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root
            .as_mapping()
            .into_iter()
            .flat_map(|map| map.keys().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.root.as_mapping().map_or(0, Mapping::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `path` resolves to a non-null value.
    pub fn contains(&self, path: &str) -> bool {
        navigate::contains(&self.root, &PathExpression::parse(path))
    }

    /// Resolve `path` to a single value.
    pub fn get(&self, path: &str) -> Result<Node> {
        let node = navigate::resolve(&self.root, &PathExpression::parse(path))?;
        self.finish(node)
    }

    /// Resolve `path` to every matching value, in document order.
    /// Matching nothing is an empty list, not an error.
    pub fn get_multiple(&self, path: &str) -> Result<Vec<Node>> {
        visit::visit(&self.root, &PathExpression::parse(path))?
            .into_iter()
            .map(|node| self.finish(node))
            .collect()
    }

    /// Alias of [`get_multiple`](Self::get_multiple).
    pub fn visit(&self, path: &str) -> Result<Vec<Node>> {
        self.get_multiple(path)
    }

    /// Resolve `path` and coerce the value into `T`.
    pub fn get_as<T: FromNode>(&self, path: &str) -> Result<T> {
        let node = self.get(path)?;
        T::from_node(&node).ok_or_else(|| {
            ConfigError::invalid_type(
                path,
                format!("cannot convert {} '{node}' to {}", node.kind(), T::EXPECTED),
            )
        })
    }

    /// Like [`get_as`](Self::get_as), returning `default` when the path is
    /// missing or the value cannot be converted. Other errors propagate.
    pub fn get_or<T: FromNode>(&self, path: &str, default: T) -> Result<T> {
        match self.get_as(path) {
            Err(e) if e.is_absent() => Ok(default),
            other => other,
        }
    }

    pub fn get_string(&self, path: &str) -> Result<String> {
        self.get_as(path)
    }

    pub fn get_string_or(&self, path: &str, default: &str) -> Result<String> {
        self.get_or(path, default.to_string())
    }

    pub fn get_integer(&self, path: &str) -> Result<i32> {
        self.get_as(path)
    }

    pub fn get_integer_or(&self, path: &str, default: i32) -> Result<i32> {
        self.get_or(path, default)
    }

    pub fn get_long(&self, path: &str) -> Result<i64> {
        self.get_as(path)
    }

    pub fn get_long_or(&self, path: &str, default: i64) -> Result<i64> {
        self.get_or(path, default)
    }

    pub fn get_double(&self, path: &str) -> Result<f64> {
        self.get_as(path)
    }

    pub fn get_double_or(&self, path: &str, default: f64) -> Result<f64> {
        self.get_or(path, default)
    }

    pub fn get_boolean(&self, path: &str) -> Result<bool> {
        self.get_as(path)
    }

    pub fn get_boolean_or(&self, path: &str, default: bool) -> Result<bool> {
        self.get_or(path, default)
    }

    /// The sequence at `path`.
    pub fn get_list(&self, path: &str) -> Result<Vec<Node>> {
        match self.get(path)? {
            Node::Sequence(items) => Ok(items),
            other => Err(ConfigError::invalid_type(
                path,
                format!("expected sequence, found {}", other.kind()),
            )),
        }
    }

    pub fn get_string_list(&self, path: &str) -> Result<Vec<String>> {
        self.get_as(path)
    }

    /// The mapping at `path` as its own Config.
    ///
    /// The sub-config starts with this config's extrapolation flag and
    /// property source; toggling either afterwards does not affect the
    /// parent. `${path:...}` references inside it resolve against the
    /// sub-map.
    pub fn get_sub_map(&self, path: &str) -> Result<Config> {
        let node = navigate::resolve(&self.root, &PathExpression::parse(path))?;
        match node {
            Node::Mapping(map) => Ok(self.derive(path, map.clone())),
            other => Err(ConfigError::invalid_type(
                path,
                format!("expected mapping, found {}", other.kind()),
            )),
        }
    }

    /// The sequence of mappings at `path`, one Config per element.
    pub fn get_yaml_list(&self, path: &str) -> Result<Vec<Config>> {
        let node = navigate::resolve(&self.root, &PathExpression::parse(path))?;
        let Node::Sequence(items) = node else {
            return Err(ConfigError::invalid_type(
                path,
                format!("expected sequence, found {}", node.kind()),
            ));
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Node::Mapping(map) => Ok(self.derive(&format!("{path}[{i}]"), map.clone())),
                other => Err(ConfigError::invalid_type(
                    format!("{path}[{i}]"),
                    format!("expected mapping, found {}", other.kind()),
                )),
            })
            .collect()
    }

    /// Merge `extra` into this config. Only this config changes.
    pub fn merge(
        &mut self,
        extra: &Config,
        default_action: MergeAction,
        list_action: MergeAction,
    ) -> Result<()> {
        let root = Arc::make_mut(&mut self.root);
        merge::merge_into(root, &extra.root, default_action, list_action)
    }

    /// Owned variant of [`merge`](Self::merge).
    pub fn merged(
        mut self,
        extra: &Config,
        default_action: MergeAction,
        list_action: MergeAction,
    ) -> Result<Config> {
        self.merge(extra, default_action, list_action)?;
        Ok(self)
    }

    /// Leaf values keyed by their path, in document order.
    pub fn flatten(&self) -> Result<Vec<(String, Node)>> {
        let view = self.view()?;
        Ok(flatten::flatten(&view))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self.view()?.as_ref()).map_err(|e| self.malformed(e))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self.view()?.as_ref()).map_err(|e| self.malformed(e))
    }

    /// Deserialize the whole config into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        self.deserialize_node(self.view()?.as_ref())
    }

    /// Deserialize the value at `path` into `T`.
    pub fn deserialize_at<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let node = self.get(path)?;
        self.deserialize_node(&node)
    }

    fn deserialize_node<T: DeserializeOwned>(&self, node: &Node) -> Result<T> {
        let value = serde_yaml::to_value(node).map_err(|e| self.malformed(e))?;
        serde_yaml::from_value(value).map_err(|e| self.malformed(e))
    }

    fn derive(&self, path: &str, map: Mapping) -> Config {
        Config {
            name: format!("{}#{path}", self.name),
            root: Arc::new(Node::Mapping(map)),
            extrapolate: self.extrapolate,
            properties: Arc::clone(&self.properties),
        }
    }

    /// The whole tree as reads see it.
    fn view(&self) -> Result<Cow<'_, Node>> {
        if self.extrapolate {
            Ok(Cow::Owned(self.finish(&self.root)?))
        } else {
            Ok(Cow::Borrowed(&self.root))
        }
    }

    fn finish(&self, node: &Node) -> Result<Node> {
        if !self.extrapolate {
            return Ok(node.clone());
        }
        Extrapolator::new(&self.name, self.properties.as_ref(), &self.root).node(node)
    }

    fn malformed(&self, e: impl std::fmt::Display) -> ConfigError {
        ConfigError::malformed(self.name.as_str(), e.to_string())
    }
}
