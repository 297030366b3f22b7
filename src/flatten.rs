//! Flatten a tree into `(path, leaf)` pairs.
//!
//! Paths are rendered in the same syntax the query functions accept, so
//! every emitted path resolves back to its value (nulls aside):
//! `{db: {hosts: [a, b]}}` → `[("db.hosts[0]", a), ("db.hosts[1]", b)]`.
//! Empty mappings and sequences are emitted as leaves so that nothing is
//! lost from the listing.

use crate::node::Node;
use crate::path::{self, PathSegment};

/// Flatten `node` into path/value pairs in document order.
pub fn flatten(node: &Node) -> Vec<(String, Node)> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    flatten_into(node, &mut prefix, &mut out);
    out
}

fn flatten_into(node: &Node, prefix: &mut Vec<PathSegment>, out: &mut Vec<(String, Node)>) {
    match node {
        Node::Mapping(map) if !map.is_empty() => {
            for (key, child) in map {
                prefix.push(PathSegment::Key(key.clone()));
                flatten_into(child, prefix, out);
                prefix.pop();
            }
        }
        Node::Sequence(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                prefix.push(PathSegment::Index(i));
                flatten_into(child, prefix, out);
                prefix.pop();
            }
        }
        leaf => out.push((path::render(prefix), leaf.clone())),
    }
}
