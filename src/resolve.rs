//! Core load pipeline: turn resolved resources and overlays into a [`Config`].
//!
//! Operates on pre-loaded data ([`ResolveInput`]) with no I/O, so the full
//! pipeline is testable with synthetic inputs. Steps:
//!
//! 1. Decode and parse the resources, either one document per resource
//!    ([`LoadMode::Layered`]) or all of them joined into one
//!    ([`LoadMode::Concatenate`])
//! 2. Merge the documents in order with the configured actions
//! 3. Merge env vars on top
//! 4. Merge overrides on top (highest priority)

use crate::config::Config;
use crate::env;
use crate::error::{ConfigError, Result};
use crate::merge::{self, MergeAction};
use crate::node::{Mapping, Node};
use crate::overrides;
use crate::resource::Resource;
use crate::types::LoadMode;

/// All pre-loaded data needed to build a config. No I/O happens here.
#[derive(Debug, Clone)]
pub struct ResolveInput {
    /// Name of the resulting config.
    pub name: String,
    /// Resources in precedence order: first = lowest priority.
    pub resources: Vec<Resource>,
    pub mode: LoadMode,
    /// Action for mapping/scalar collisions between resources.
    pub default_action: MergeAction,
    /// Action for sequence collisions between resources.
    pub list_action: MergeAction,
    /// Raw environment variable pairs (`std::env::vars()` or synthetic data).
    pub env_vars: Vec<(String, String)>,
    /// Env var prefix (e.g. `"MYAPP"`). `None` disables the env layer.
    pub env_prefix: Option<String>,
    /// Overrides as `(path, value)` pairs.
    pub overrides: Vec<(String, Node)>,
}

impl ResolveInput {
    pub fn new(name: &str, resources: Vec<Resource>) -> Self {
        Self {
            name: name.to_string(),
            resources,
            mode: LoadMode::default(),
            default_action: MergeAction::KeepExtra,
            list_action: MergeAction::KeepExtra,
            env_vars: Vec::new(),
            env_prefix: None,
            overrides: Vec::new(),
        }
    }
}

/// Build a config from pre-loaded inputs.
pub fn resolve(input: ResolveInput) -> Result<Config> {
    let mut merged = match input.mode {
        LoadMode::Layered => layered(&input)?,
        LoadMode::Concatenate => concatenated(&input)?,
    };

    if let Some(prefix) = &input.env_prefix {
        let env_map = env::env_to_mapping(prefix, input.env_vars.iter().cloned());
        if !env_map.is_empty() {
            tracing::debug!(prefix = %prefix, keys = env_map.len(), "merging environment layer");
            merge::merge_mappings(
                &mut merged,
                &env_map,
                MergeAction::KeepExtra,
                MergeAction::KeepExtra,
            )?;
        }
    }

    if !input.overrides.is_empty() {
        let override_map = overrides::overrides_to_mapping(&input.overrides)?;
        tracing::debug!(count = input.overrides.len(), "merging overrides");
        merge::merge_mappings(
            &mut merged,
            &override_map,
            MergeAction::KeepExtra,
            MergeAction::KeepExtra,
        )?;
    }

    Ok(Config::from_mapping(&input.name, merged))
}

fn layered(input: &ResolveInput) -> Result<Mapping> {
    let mut merged = Mapping::new();
    for resource in &input.resources {
        let layer = document(&resource.name, decode(resource)?)?;
        tracing::debug!(resource = %resource.name, keys = layer.len(), "merging layer");
        merge::merge_mappings(&mut merged, &layer, input.default_action, input.list_action)?;
    }
    Ok(merged)
}

fn concatenated(input: &ResolveInput) -> Result<Mapping> {
    let texts = input
        .resources
        .iter()
        .map(decode)
        .collect::<Result<Vec<&str>>>()?;
    tracing::debug!(resources = texts.len(), "parsing concatenated resources");
    let name = input
        .resources
        .iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(" + ");
    document(&name, &texts.join("\n"))
}

fn decode(resource: &Resource) -> Result<&str> {
    std::str::from_utf8(&resource.bytes)
        .map_err(|e| ConfigError::malformed(resource.name.as_str(), e.to_string()))
}

/// Parse one document, which must be a mapping or empty.
fn document(name: &str, text: &str) -> Result<Mapping> {
    match Node::parse_yaml(name, text)? {
        Node::Mapping(map) => Ok(map),
        node if node.is_null() => Ok(Mapping::new()),
        other => Err(ConfigError::malformed(
            name,
            format!("document root is a {}, expected a mapping", other.kind()),
        )),
    }
}
