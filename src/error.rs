use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Path not found: '{path}' ({reason})")]
    NotFound { path: String, reason: String },

    #[error("Invalid type at '{path}': {reason}")]
    InvalidType { path: String, reason: String },

    #[error("Merge conflict at '{path}'")]
    MergeConflict { path: String },

    #[error("Malformed config {name}: {reason}")]
    MalformedConfig { name: String, reason: String },

    #[error("No resources found for {}", .0.join(", "))]
    ResourceNotFound(Vec<String>),

    #[error("Failed to parse {name}: {source}")]
    Parse {
        name: String,
        source: serde_yaml::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid resource pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
}

impl ConfigError {
    pub(crate) fn not_found(path: impl ToString, reason: impl Into<String>) -> Self {
        ConfigError::NotFound {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_type(path: impl ToString, reason: impl Into<String>) -> Self {
        ConfigError::InvalidType {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::MalformedConfig {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::NotFound { .. })
    }

    pub fn is_invalid_type(&self) -> bool {
        matches!(self, ConfigError::InvalidType { .. })
    }

    /// True for the two kinds that the default-valued accessors swallow.
    pub fn is_absent(&self) -> bool {
        self.is_not_found() || self.is_invalid_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_correctly() {
        let err = ConfigError::not_found("database.url", "no key 'url'");
        let msg = err.to_string();
        assert!(msg.contains("database.url"));
        assert!(msg.contains("url"));
    }

    #[test]
    fn merge_conflict_names_path() {
        let err = ConfigError::MergeConflict {
            path: "servers[0].port".into(),
        };
        assert!(err.to_string().contains("servers[0].port"));
    }

    #[test]
    fn resource_not_found_lists_patterns() {
        let err = ConfigError::ResourceNotFound(vec!["a.yaml".into(), "conf/*.yml".into()]);
        let msg = err.to_string();
        assert!(msg.contains("a.yaml, conf/*.yml"));
    }

    #[test]
    fn absent_covers_not_found_and_invalid_type() {
        assert!(ConfigError::not_found("x", "missing").is_absent());
        assert!(ConfigError::invalid_type("x", "scalar").is_absent());
        assert!(!ConfigError::MergeConflict { path: "x".into() }.is_absent());
        assert!(!ConfigError::malformed("conf", "bad").is_absent());
    }
}
