//! Multi-value path resolution.
//!
//! The literal prefix of a path (everything before the first wildcard or
//! predicate) is resolved like a single-value path and fails the same way.
//! From there the walk fans out depth-first, and branches that do not match
//! simply contribute nothing. Results come back in document order: mapping
//! insertion order, then sequence index order.
//!
//! `**` at the end of a path collects every leaf scalar below the current
//! node. With more segments after it, `**` means "at any depth": the rest of
//! the path is applied to the current node and then to every descendant in
//! pre-order, so `**.name` finds every `name` key in the tree and
//! `**[kind=db]` filters every sequence at any depth.

use crate::error::{ConfigError, Result};
use crate::navigate;
use crate::node::Node;
use crate::path::{PathExpression, PathSegment};

/// Collect every node matched by `path`. Null values are skipped.
pub fn visit<'a>(root: &'a Node, path: &PathExpression) -> Result<Vec<&'a Node>> {
    let segments = path.segments();
    let split = segments
        .iter()
        .position(|s| s.is_wildcard() || matches!(s, PathSegment::Predicate(_)))
        .unwrap_or(segments.len());

    let mut current = root;
    for i in 0..split {
        current = navigate::step(current, &segments[..=i])?;
    }
    if split > 0 && split < segments.len() && current.is_null() {
        return Err(ConfigError::not_found(
            crate::path::render(&segments[..split]),
            "value is null",
        ));
    }

    let mut out = Vec::new();
    walk(current, &segments[split..], &mut out);
    Ok(out)
}

fn walk<'a>(node: &'a Node, rest: &[PathSegment], out: &mut Vec<&'a Node>) {
    let Some((segment, tail)) = rest.split_first() else {
        if !node.is_null() {
            out.push(node);
        }
        return;
    };

    match segment {
        PathSegment::Key(key) => {
            if let Node::Mapping(map) = node
                && let Some(child) = map.get(key)
            {
                walk(child, tail, out);
            }
        }
        PathSegment::Index(n) => {
            if let Some(child) = navigate::nth_child(node, *n) {
                walk(child, tail, out);
            }
        }
        PathSegment::LastIndex => {
            let last = navigate::child_count(node).and_then(|len| len.checked_sub(1));
            if let Some(child) = last.and_then(|i| navigate::nth_child(node, i)) {
                walk(child, tail, out);
            }
        }
        PathSegment::Wildcard => {
            for child in children(node) {
                walk(child, tail, out);
            }
        }
        PathSegment::Predicate(predicate) => {
            if let Node::Sequence(items) = node {
                for item in items.iter().filter(|item| navigate::matches(item, predicate)) {
                    walk(item, tail, out);
                }
            }
        }
        PathSegment::DoubleWildcard => {
            let first = tail
                .iter()
                .position(|s| *s != PathSegment::DoubleWildcard)
                .unwrap_or(tail.len());
            match &tail[first..] {
                [] => collect_leaves(node, out),
                tail => descend(node, tail, out),
            }
        }
    }
}

/// Apply `tail` at `node` and at every descendant, pre-order.
fn descend<'a>(node: &'a Node, tail: &[PathSegment], out: &mut Vec<&'a Node>) {
    walk(node, tail, out);
    for child in children(node) {
        descend(child, tail, out);
    }
}

fn collect_leaves<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
    match node {
        Node::Scalar(s) if s.is_null() => {}
        Node::Scalar(_) => out.push(node),
        _ => {
            for child in children(node) {
                collect_leaves(child, out);
            }
        }
    }
}

fn children(node: &Node) -> Box<dyn Iterator<Item = &Node> + '_> {
    match node {
        Node::Mapping(map) => Box::new(map.values()),
        Node::Sequence(items) => Box::new(items.iter()),
        Node::Scalar(_) => Box::new(std::iter::empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{SERVICE_YAML, tree};
    use pretty_assertions::assert_eq;

    fn values(root: &Node, raw: &str) -> Vec<Node> {
        visit(root, &PathExpression::parse(raw))
            .unwrap()
            .into_iter()
            .cloned()
            .collect()
    }

    fn ints(items: &[i64]) -> Vec<Node> {
        items.iter().map(|i| Node::from(*i)).collect()
    }

    fn strs(items: &[&str]) -> Vec<Node> {
        items.iter().map(|s| Node::from(*s)).collect()
    }

    #[test]
    fn wildcard_follows_insertion_order() {
        let root = tree("a:\n  name: 1\nb:\n  name: 2\n");
        assert_eq!(values(&root, "*.name"), ints(&[1, 2]));

        let reversed = tree("b:\n  name: 2\na:\n  name: 1\n");
        assert_eq!(values(&reversed, "*.name"), ints(&[2, 1]));
    }

    #[test]
    fn bracket_wildcards_over_sequences() {
        let root = tree(SERVICE_YAML);
        let expected = strs(&["alpha", "beta", "gamma"]);
        assert_eq!(values(&root, "servers[*].name"), expected);
        assert_eq!(values(&root, "servers[].name"), expected);
        assert_eq!(values(&root, "servers.*.name"), expected);
    }

    #[test]
    fn predicate_selects_all_matches() {
        let root = tree(SERVICE_YAML);
        assert_eq!(values(&root, "servers[env=prod].name"), strs(&["alpha", "gamma"]));
        assert_eq!(values(&root, "servers[env!=prod].port"), ints(&[9002]));
    }

    #[test]
    fn trailing_double_wildcard_collects_leaves_in_document_order() {
        let root = tree("cfg:\n  a: 1\n  b:\n    c: 2\n    d: [3, 4]\n  e: 5\n");
        assert_eq!(values(&root, "cfg.**"), ints(&[1, 2, 3, 4, 5]));
    }

    #[test]
    fn double_wildcard_skips_nulls_and_empty_containers() {
        let root = tree("cfg:\n  a: ~\n  b: {}\n  c: []\n  d: x\n");
        assert_eq!(values(&root, "cfg.**"), strs(&["x"]));
    }

    #[test]
    fn double_wildcard_at_any_depth() {
        let root = tree(
            "name: top\nchild:\n  name: mid\n  deeper:\n    - name: low\n    - other: 1\n",
        );
        assert_eq!(values(&root, "**.name"), strs(&["top", "mid", "low"]));
    }

    #[test]
    fn double_wildcard_then_predicate() {
        let root = tree(
            "a:\n  items:\n    - {id: 2, v: first}\nb:\n  nested:\n    items:\n      - {id: 1, v: no}\n      - {id: 2, v: second}\n",
        );
        assert_eq!(values(&root, "**[id=2].v"), strs(&["first", "second"]));
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let root = tree(SERVICE_YAML);
        assert!(values(&root, "servers[*].missing").is_empty());
        assert!(values(&root, "servers[env=none].name").is_empty());
        assert!(values(&root, "server.*.deeper").is_empty());
    }

    #[test]
    fn missing_literal_prefix_fails() {
        let root = tree(SERVICE_YAML);
        let err = visit(&root, &"nothing[*].name".into()).unwrap_err();
        assert!(err.is_not_found());
        let err = visit(&root, &"server.port.x[*]".into()).unwrap_err();
        assert!(err.is_invalid_type());
    }

    #[test]
    fn null_literal_prefix_fails() {
        let root = tree("a: ~\nb:\n  c: null\n");
        let err = visit(&root, &"a[*]".into()).unwrap_err();
        assert!(err.is_not_found());
        let err = visit(&root, &"b.c.**".into()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn repeated_double_wildcards_collapse() {
        let root = tree("a:\n  b: 1\n  c:\n    name: x\n");
        assert_eq!(values(&root, "**.**"), values(&root, "**"));
        assert_eq!(values(&root, "**.**.**"), values(&root, "**"));
        assert_eq!(values(&root, "**.**.name"), strs(&["x"]));
    }

    #[test]
    fn wildcard_over_scalar_is_empty() {
        let root = tree(SERVICE_YAML);
        assert!(values(&root, "server.port[*]").is_empty());
    }

    #[test]
    fn indexes_after_wildcard() {
        let root = tree("m:\n  a: [1, 2]\n  b: [3]\n  c: [4, 5, 6]\n");
        assert_eq!(values(&root, "m.*[1]"), ints(&[2, 5]));
        assert_eq!(values(&root, "m.*[last]"), ints(&[2, 3, 6]));
    }

    #[test]
    fn visiting_is_reproducible() {
        let root = tree(SERVICE_YAML);
        let first = values(&root, "**");
        assert_eq!(values(&root, "**"), first);
        assert!(!first.is_empty());
    }
}
