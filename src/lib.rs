//! Layered YAML configuration with path queries. Point at your files, and
//! read values by path.
//!
//! ```ignore
//! let config = Config::loader()
//!     .resource("defaults.yaml")
//!     .resource("conf.d/*.yaml")
//!     .env_prefix("MYAPP")
//!     .extrapolate(true)
//!     .load()?;
//!
//! let port = config.get_integer_or("server.port", 8080)?;
//! let prod: Vec<Node> = config.get_multiple("servers[env=prod].name")?;
//! ```
//!
//! That call reads `defaults.yaml` and every `conf.d/*.yaml` (sorted) from
//! the working directory, merges them in order, merges `MYAPP__*`
//! environment variables on top and hands you a [`Config`] whose reads
//! substitute `${...}` references.
//!
//! # Paths
//!
//! A path is a dot-separated list of segments:
//!
//! | Segment | Meaning |
//! |---------|---------|
//! | `key` | mapping key |
//! | `'a.b'`, `"a.b"` | key containing dots or brackets |
//! | `key[2]` | element 2 of the sequence at `key` |
//! | `key[last]` | last element |
//! | `key[*]`, `key[]`, `key.*` | every element or value |
//! | `key[env=prod]`, `key[env!=prod]` | elements whose field matches |
//! | `**` | every leaf below (trailing), or any depth (followed by more) |
//!
//! Single-value reads ([`Config::get`] and the typed accessors) fail with
//! [`ConfigError::NotFound`] for a missing key and
//! [`ConfigError::InvalidType`] when the tree has the wrong shape or an
//! index is out of range. Multi-value reads ([`Config::get_multiple`])
//! collect every match in document order and return an empty list when
//! nothing matches. The `_or` accessors substitute their default for both
//! of those errors and nothing else.
//!
//! Null values are treated as absent.
//!
//! # Layer precedence
//!
//! ```text
//! Resources            in the order given, glob matches sorted
//!        ↑ overridden by
//! Environment vars     PREFIX__KEY
//!        ↑ overridden by
//! Overrides            .set("key", value)
//! ```
//!
//! Between resources the collision rules are the loader's
//! [`default_action`](ConfigLoader::default_action) (mappings and scalars)
//! and [`list_action`](ConfigLoader::list_action) (sequences), both
//! [`MergeAction::KeepExtra`] unless set. Mappings always merge key by key.
//! The env and override layers always use `KeepExtra`.
//!
//! With [`LoadMode::Concatenate`] the resources are instead joined into a
//! single document before parsing, so a later file can reference anchors
//! defined in an earlier one.
//!
//! # Environment variables
//!
//! With env prefix `MYAPP`, variables map via double-underscore nesting:
//!
//! | Env var | Config key |
//! |---------|------------|
//! | `MYAPP__HOST` | `host` |
//! | `MYAPP__DATABASE__URL` | `database.url` |
//!
//! Segments are lowercased. Values are parsed heuristically: `true`/`false`
//! → bool, then integer, then float, then string.
//!
//! # Extrapolation
//!
//! When enabled, string values are post-processed on every read:
//!
//! ```text
//! ${name}  ${sys:name}  ${env:NAME}  ${path:server.port}  ${name:-fallback}
//! ```
//!
//! Properties and environment are read through a [`PropertySource`] given
//! to the loader, so tests can swap in [`MapProperties`]. A value that
//! contained a reference is re-typed after substitution, so `${env:PORT}`
//! reads back as an integer. See [`extrapolate`] for the details.
//!
//! # Error handling
//!
//! All fallible operations return [`ConfigError`]. See the [`error`] module
//! for the full set.

pub mod error;
pub mod extrapolate;
pub mod merge;
pub mod navigate;
pub mod node;
pub mod path;
pub mod resource;
pub mod types;
pub mod visit;

mod builder;
mod config;
mod env;
mod flatten;
mod overrides;
mod resolve;

#[cfg(test)]
mod fixtures;

pub use builder::ConfigLoader;
pub use config::Config;
pub use error::{ConfigError, Result};
pub use extrapolate::{MapProperties, ProcessProperties, PropertySource};
pub use flatten::flatten;
pub use merge::MergeAction;
pub use node::{FromNode, Mapping, Node, Scalar};
pub use path::{PathExpression, PathSegment, Predicate, PredicateOp};
pub use resolve::{ResolveInput, resolve};
pub use resource::{FsResolver, MemoryResolver, Resource, ResourceResolver};
pub use types::{LoadMode, SearchPath};
