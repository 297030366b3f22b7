//! The environment layer.
//!
//! With prefix `APP`, `APP__DATABASE__POOL_SIZE=20` contributes
//! `{database: {pool_size: 20}}`. Names are split on `__`, each part is
//! lowercased, and the value is typed with [`Scalar::guess`].
//!
//! Variables are applied in name order, so the result does not depend on
//! the order the process environment happens to list them in. When one
//! variable sets a scalar where another needs a mapping (`APP__DB` and
//! `APP__DB__URL`), the one applied first wins.

use crate::node::{Mapping, Node, Scalar};

/// Build the environment layer from `vars`.
///
/// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
pub fn env_to_mapping(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Mapping {
    let needle = format!("{prefix}__");
    let mut matching: Vec<(Vec<String>, String)> = vars
        .into_iter()
        .filter_map(|(name, value)| {
            let keys: Vec<String> = name
                .strip_prefix(&needle)?
                .split("__")
                .map(str::to_lowercase)
                .collect();
            (!keys.iter().any(String::is_empty)).then_some((keys, value))
        })
        .collect();
    matching.sort();

    let mut layer = Mapping::new();
    for (keys, value) in matching {
        let Some((leaf, parents)) = keys.split_last() else {
            continue;
        };
        let Some(target) = branch(&mut layer, parents) else {
            tracing::debug!(key = %keys.join("."), "environment variable shadowed by a scalar");
            continue;
        };
        target
            .entry(leaf.clone())
            .or_insert_with(|| Node::Scalar(Scalar::guess(&value)));
    }
    layer
}

/// The mapping at `keys`, created as needed. `None` if a scalar is in the way.
fn branch<'m>(mut map: &'m mut Mapping, keys: &[String]) -> Option<&'m mut Mapping> {
    for key in keys {
        map = match map.entry(key.clone()).or_insert_with(Node::empty_mapping) {
            Node::Mapping(sub) => sub,
            _ => return None,
        };
    }
    Some(map)
}
