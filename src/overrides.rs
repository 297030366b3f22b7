//! Convert path-keyed overrides into a nested mapping.
//!
//! Each `("database.url", Node)` pair is expanded into the nested structure
//! needed for merging with the other config layers. Quoted segments are
//! honoured, so `"'a.b'.c"` targets key `c` under the key `a.b`.

use crate::error::{ConfigError, Result};
use crate::node::{Mapping, Node};
use crate::path::{PathExpression, PathSegment};

/// Convert path-keyed overrides into a nested mapping.
///
/// `("database.url", "pg://")` becomes `{database: {url: "pg://"}}`.
///
/// If multiple entries target the same key, the last one wins. Only plain
/// key segments are allowed; an entry that would descend through a value
/// set by an earlier entry is an error.
pub fn overrides_to_mapping(entries: &[(String, Node)]) -> Result<Mapping> {
    let mut map = Mapping::new();
    for (raw, value) in entries {
        set_nested(&mut map, raw, value.clone())?;
    }
    Ok(map)
}

fn set_nested(map: &mut Mapping, raw: &str, value: Node) -> Result<()> {
    let path = PathExpression::parse(raw);
    let keys = path
        .segments()
        .iter()
        .map(|segment| match segment {
            PathSegment::Key(key) => Ok(key.as_str()),
            _ => Err(ConfigError::invalid_type(
                raw,
                "overrides only accept key segments",
            )),
        })
        .collect::<Result<Vec<&str>>>()?;

    let Some((leaf, parents)) = keys.split_last() else {
        return Err(ConfigError::invalid_type(raw, "empty override path"));
    };

    let mut current = map;
    for key in parents {
        let entry = current
            .entry(key.to_string())
            .or_insert_with(Node::empty_mapping);
        current = match entry {
            Node::Mapping(sub) => sub,
            other => {
                return Err(ConfigError::invalid_type(
                    raw,
                    format!("'{key}' is already set to a {}", other.kind()),
                ));
            }
        };
    }

    current.insert(leaf.to_string(), value);
    Ok(())
}
