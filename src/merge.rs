use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::node::{Mapping, Node};
use crate::path::{self, PathSegment};

/// How a collision between a base and an extra value is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    /// Sequences are concatenated (base first); other values take the extra side.
    Union,
    /// The base value is kept.
    KeepBase,
    /// The extra value replaces the base value.
    #[default]
    KeepExtra,
    /// The collision is a [`ConfigError::MergeConflict`].
    Fail,
}

impl MergeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeAction::Union => "union",
            MergeAction::KeepBase => "keep_base",
            MergeAction::KeepExtra => "keep_extra",
            MergeAction::Fail => "fail",
        }
    }
}

impl fmt::Display for MergeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" => Ok(MergeAction::Union),
            "keep_base" => Ok(MergeAction::KeepBase),
            "keep_extra" => Ok(MergeAction::KeepExtra),
            "fail" => Ok(MergeAction::Fail),
            other => Err(format!(
                "unknown merge action '{other}' (expected union, keep_base, keep_extra or fail)"
            )),
        }
    }
}

/// Deep-merge `extra` into `base`.
///
/// Mappings always recurse key by key; keys new in `extra` are appended in
/// the order they appear there. Two sequences collide under `list_action`,
/// anything else (scalars, kind mismatches) under `default_action`.
/// `extra` is never modified.
pub fn merge_into(
    base: &mut Node,
    extra: &Node,
    default_action: MergeAction,
    list_action: MergeAction,
) -> Result<()> {
    let mut path = Vec::new();
    merge_node(base, extra, default_action, list_action, &mut path)
}

/// Owned variant of [`merge_into`].
pub fn merge(
    mut base: Node,
    extra: &Node,
    default_action: MergeAction,
    list_action: MergeAction,
) -> Result<Node> {
    merge_into(&mut base, extra, default_action, list_action)?;
    Ok(base)
}

/// Mapping-level entry point used by [`Config`](crate::Config), whose root is
/// always a mapping.
pub fn merge_mappings(
    base: &mut Mapping,
    extra: &Mapping,
    default_action: MergeAction,
    list_action: MergeAction,
) -> Result<()> {
    let mut path = Vec::new();
    merge_mapping(base, extra, default_action, list_action, &mut path)
}

fn merge_mapping(
    base: &mut Mapping,
    extra: &Mapping,
    default_action: MergeAction,
    list_action: MergeAction,
    path: &mut Vec<PathSegment>,
) -> Result<()> {
    for (key, extra_val) in extra {
        match base.get_mut(key) {
            Some(base_val) => {
                path.push(PathSegment::Key(key.clone()));
                merge_node(base_val, extra_val, default_action, list_action, path)?;
                path.pop();
            }
            None => {
                base.insert(key.clone(), extra_val.clone());
            }
        }
    }
    Ok(())
}

fn merge_node(
    base: &mut Node,
    extra: &Node,
    default_action: MergeAction,
    list_action: MergeAction,
    path: &mut Vec<PathSegment>,
) -> Result<()> {
    if let (Node::Mapping(base_map), Node::Mapping(extra_map)) = (&mut *base, extra) {
        return merge_mapping(base_map, extra_map, default_action, list_action, path);
    }

    let both_lists = matches!((&*base, extra), (Node::Sequence(_), Node::Sequence(_)));
    let action = if both_lists {
        list_action
    } else {
        default_action
    };
    tracing::trace!(path = %path::render(path), %action, "merge collision");

    match action {
        MergeAction::Union if both_lists => {
            if let (Node::Sequence(items), Node::Sequence(more)) = (base, extra) {
                items.extend(more.iter().cloned());
            }
        }
        MergeAction::Union | MergeAction::KeepExtra => *base = extra.clone(),
        MergeAction::KeepBase => {}
        MergeAction::Fail => {
            let rendered = path::render(path);
            return Err(ConfigError::MergeConflict {
                path: if rendered.is_empty() {
                    "<root>".to_string()
                } else {
                    rendered
                },
            });
        }
    }
    Ok(())
}
