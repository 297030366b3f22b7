//! Single-value path resolution.
//!
//! Walks a [`PathExpression`] segment by segment from a root node. Every
//! failure is typed: a segment with nothing to match is `NotFound`, a
//! segment applied to the wrong kind of node (or an index past the end) is
//! `InvalidType`. A path that ends on a null value counts as not found.

use crate::error::{ConfigError, Result};
use crate::node::{Node, Scalar};
use crate::path::{self, PathExpression, PathSegment, Predicate, PredicateOp};
use crate::visit;

/// Resolve `path` to exactly one node.
///
/// Predicates select the first matching element. Paths with wildcards are
/// handed to the visitor and the first visited value is returned.
pub fn resolve<'a>(root: &'a Node, path: &PathExpression) -> Result<&'a Node> {
    if path.is_multi_valued() {
        return visit::visit(root, path)?
            .into_iter()
            .next()
            .ok_or_else(|| ConfigError::not_found(path, "no value matched"));
    }

    let segments = path.segments();
    let mut current = root;
    for i in 0..segments.len() {
        current = step(current, &segments[..=i])?;
    }
    if current.is_null() {
        return Err(ConfigError::not_found(path, "value is null"));
    }
    Ok(current)
}

/// True if `path` resolves to a non-null value.
pub fn contains(root: &Node, path: &PathExpression) -> bool {
    resolve(root, path).is_ok()
}

/// Apply the last segment of `walked` to `node`. `walked` is the path up to
/// and including that segment and is only used for error messages.
pub(crate) fn step<'a>(node: &'a Node, walked: &[PathSegment]) -> Result<&'a Node> {
    let Some(segment) = walked.last() else {
        return Ok(node);
    };
    if node.is_null() {
        return Err(ConfigError::not_found(path::render(walked), "parent is null"));
    }

    match segment {
        PathSegment::Key(key) => match node {
            Node::Mapping(map) => map.get(key).ok_or_else(|| {
                ConfigError::not_found(path::render(walked), format!("no key '{key}'"))
            }),
            other => Err(expected(walked, "mapping", other)),
        },
        PathSegment::Index(n) => {
            let len = child_count(node).ok_or_else(|| expected(walked, "sequence", node))?;
            nth_child(node, *n).ok_or_else(|| {
                ConfigError::invalid_type(
                    path::render(walked),
                    format!("index {n} out of bounds for {} of length {len}", node.kind()),
                )
            })
        }
        PathSegment::LastIndex => {
            let len = child_count(node).ok_or_else(|| expected(walked, "sequence", node))?;
            len.checked_sub(1)
                .and_then(|last| nth_child(node, last))
                .ok_or_else(|| {
                    ConfigError::invalid_type(
                        path::render(walked),
                        format!("no last element in empty {}", node.kind()),
                    )
                })
        }
        PathSegment::Predicate(predicate) => match node {
            Node::Sequence(items) => items
                .iter()
                .find(|item| matches(item, predicate))
                .ok_or_else(|| {
                    ConfigError::not_found(path::render(walked), "no element matched predicate")
                }),
            other => Err(expected(walked, "sequence", other)),
        },
        PathSegment::Wildcard | PathSegment::DoubleWildcard => Err(ConfigError::invalid_type(
            path::render(walked),
            "wildcard in a single-value step",
        )),
    }
}

/// Number of positional children. Mappings expose their values in order.
pub(crate) fn child_count(node: &Node) -> Option<usize> {
    match node {
        Node::Sequence(items) => Some(items.len()),
        Node::Mapping(map) => Some(map.len()),
        Node::Scalar(_) => None,
    }
}

pub(crate) fn nth_child(node: &Node, n: usize) -> Option<&Node> {
    match node {
        Node::Sequence(items) => items.get(n),
        Node::Mapping(map) => map.get_index(n).map(|(_, v)| v),
        Node::Scalar(_) => None,
    }
}

/// Predicate test against one sequence element.
///
/// `=` needs the field to be present with an equal scalar value; `!=` is its
/// negation, so elements without the field match `!=`.
pub(crate) fn matches(node: &Node, predicate: &Predicate) -> bool {
    let Node::Mapping(map) = node else {
        return false;
    };
    let equal = match map.get(&predicate.field) {
        Some(Node::Scalar(s)) if !matches!(s, Scalar::Null) => s.render() == predicate.value,
        _ => false,
    };
    match predicate.op {
        PredicateOp::Eq => equal,
        PredicateOp::Ne => !equal,
    }
}

fn expected(walked: &[PathSegment], wanted: &str, found: &Node) -> ConfigError {
    ConfigError::invalid_type(
        path::render(walked),
        format!("expected {wanted}, found {}", found.kind()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{SERVICE_YAML, tree};
    use pretty_assertions::assert_eq;

    fn get<'a>(root: &'a Node, raw: &str) -> Result<&'a Node> {
        resolve(root, &PathExpression::parse(raw))
    }

    #[test]
    fn resolves_nested_keys() {
        let root = tree(SERVICE_YAML);
        assert_eq!(get(&root, "server.port").unwrap(), &Node::from(8080i64));
        assert_eq!(get(&root, ".server.host").unwrap(), &Node::from("localhost"));
    }

    #[test]
    fn resolution_is_deterministic() {
        let root = tree(SERVICE_YAML);
        let first = get(&root, "servers[1].name").unwrap().clone();
        for _ in 0..5 {
            assert_eq!(get(&root, "servers[1].name").unwrap(), &first);
        }
    }

    #[test]
    fn quoted_key_with_dots() {
        let root = tree("a:\n  b.c:\n    d: 1\n");
        assert_eq!(get(&root, "a.'b.c'.d").unwrap(), &Node::from(1i64));
        assert!(get(&root, "a.b.c.d").unwrap_err().is_not_found());
    }

    #[test]
    fn index_and_last() {
        let root = tree(SERVICE_YAML);
        assert_eq!(get(&root, "servers[0].name").unwrap(), &Node::from("alpha"));
        assert_eq!(get(&root, "servers[last].name").unwrap(), &Node::from("gamma"));
        assert_eq!(get(&root, "servers.[0].name").unwrap(), &Node::from("alpha"));
    }

    #[test]
    fn index_out_of_bounds_is_invalid_type() {
        let root = tree("arr: [1, 2, 3]\n");
        let err = get(&root, "arr[3]").unwrap_err();
        assert!(err.is_invalid_type(), "{err}");
        assert!(err.to_string().contains("arr[3]"));
    }

    #[test]
    fn last_on_empty_sequence_is_invalid_type() {
        let root = tree("arr: []\n");
        assert!(get(&root, "arr[last]").unwrap_err().is_invalid_type());
    }

    #[test]
    fn positional_access_into_mapping_values() {
        let root = tree("m:\n  x: 10\n  y: 20\n");
        assert_eq!(get(&root, "m[1]").unwrap(), &Node::from(20i64));
        assert_eq!(get(&root, "m[last]").unwrap(), &Node::from(20i64));
    }

    #[test]
    fn predicate_selects_first_match() {
        let root = tree("items:\n  - {id: 1, v: a}\n  - {id: 2, v: b}\n  - {id: 2, v: c}\n");
        assert_eq!(get(&root, "items[id=2].v").unwrap(), &Node::from("b"));
        assert_eq!(get(&root, "items[id!=1].v").unwrap(), &Node::from("b"));
        assert!(get(&root, "items[id=3].v").unwrap_err().is_not_found());
    }

    #[test]
    fn predicate_not_equal_matches_missing_field() {
        let root = tree("items:\n  - {v: a}\n  - {id: 1, v: b}\n");
        assert_eq!(get(&root, "items[id!=1].v").unwrap(), &Node::from("a"));
    }

    #[test]
    fn missing_key_is_not_found() {
        let root = tree(SERVICE_YAML);
        let err = get(&root, "server.missing").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("server.missing"));
    }

    #[test]
    fn key_into_scalar_is_invalid_type() {
        let root = tree(SERVICE_YAML);
        assert!(get(&root, "server.port.inner").unwrap_err().is_invalid_type());
    }

    #[test]
    fn key_into_sequence_is_invalid_type() {
        let root = tree(SERVICE_YAML);
        assert!(get(&root, "servers.name").unwrap_err().is_invalid_type());
    }

    #[test]
    fn index_into_scalar_is_invalid_type() {
        let root = tree(SERVICE_YAML);
        assert!(get(&root, "server.host[0]").unwrap_err().is_invalid_type());
    }

    #[test]
    fn null_values_are_absent() {
        let root = tree("a: ~\nb:\n  c: null\n");
        assert!(get(&root, "a").unwrap_err().is_not_found());
        assert!(get(&root, "a.x").unwrap_err().is_not_found());
        assert!(get(&root, "b.c").unwrap_err().is_not_found());
    }

    #[test]
    fn wildcard_path_returns_first_visited() {
        let root = tree(SERVICE_YAML);
        assert_eq!(get(&root, "servers[*].name").unwrap(), &Node::from("alpha"));
        assert!(get(&root, "servers[*].nope").unwrap_err().is_not_found());
    }

    #[test]
    fn empty_path_is_root() {
        let root = tree(SERVICE_YAML);
        assert_eq!(get(&root, "").unwrap(), &root);
    }

    #[test]
    fn contains_reports_presence() {
        let root = tree(SERVICE_YAML);
        assert!(contains(&root, &"server.port".into()));
        assert!(!contains(&root, &"server.nope".into()));
    }
}
