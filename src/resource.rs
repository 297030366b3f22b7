//! Turning resource names and glob patterns into bytes.
//!
//! [`FsResolver`] is the filesystem implementation used by
//! [`ConfigLoader`](crate::ConfigLoader). Each pattern is tried under every
//! configured [`SearchPath`]:
//!
//! - Absolute names are read directly.
//! - Names containing `*`, `?` or `[` are expanded with `glob`; matches under
//!   one root are returned in sorted order.
//! - Anything else is joined to the root and read if it exists.
//!
//! Missing files are skipped in every case. Only real I/O failures
//! (permissions, reading a directory, ...) are errors; the loader reports
//! [`ConfigError::ResourceNotFound`] when nothing at all was found.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{ConfigError, Result};
use crate::types::SearchPath;

/// The raw contents of one resolved resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Where the bytes came from. Used to label parse errors.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Resource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Source of resource bytes.
pub trait ResourceResolver: fmt::Debug + Send + Sync {
    /// Every resource matching `pattern`, in a deterministic order.
    /// Matching nothing is an empty list.
    fn resolve(&self, pattern: &str) -> Result<Vec<Resource>>;
}

/// True if `pattern` uses glob syntax.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Filesystem resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsResolver {
    search_paths: Vec<SearchPath>,
}

impl Default for FsResolver {
    fn default() -> Self {
        Self {
            search_paths: vec![SearchPath::Cwd],
        }
    }
}

impl FsResolver {
    /// Resolve relative names against the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative names against `search_paths`, in order.
    pub fn with_search_paths(search_paths: Vec<SearchPath>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[SearchPath] {
        &self.search_paths
    }

    /// The concrete directories to search. Roots that cannot be determined
    /// on this machine (no home directory, ...) are left out.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.search_paths.iter().filter_map(search_root).collect()
    }

    fn candidates(&self, pattern: &str) -> Vec<PathBuf> {
        if Path::new(pattern).is_absolute() {
            return vec![PathBuf::from(pattern)];
        }
        self.roots().into_iter().map(|root| root.join(pattern)).collect()
    }

    /// Full glob patterns, one per root, with the root part escaped.
    fn glob_roots(&self, pattern: &str) -> Vec<String> {
        if Path::new(pattern).is_absolute() {
            return vec![pattern.to_string()];
        }
        self.roots()
            .iter()
            .map(|root| {
                let escaped = glob::Pattern::escape(&root.to_string_lossy());
                format!("{}/{pattern}", escaped.trim_end_matches('/'))
            })
            .collect()
    }
}

impl ResourceResolver for FsResolver {
    fn resolve(&self, pattern: &str) -> Result<Vec<Resource>> {
        let mut found = Vec::new();
        if is_glob(pattern) {
            for root in self.glob_roots(pattern) {
                found.extend(expand_glob(&root)?);
            }
        } else {
            for candidate in self.candidates(pattern) {
                found.extend(read_if_exists(&candidate)?);
            }
        }
        tracing::debug!(pattern, count = found.len(), "resolved resources");
        Ok(found)
    }
}

/// Resolve a [`SearchPath`] to a concrete directory.
pub fn search_root(sp: &SearchPath) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform(app) => {
            let proj = directories::ProjectDirs::from("", "", app)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

fn expand_glob(pattern: &str) -> Result<Vec<Resource>> {
    let paths = glob::glob(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            ConfigError::Io {
                path,
                source: e.into(),
            }
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut out = Vec::with_capacity(files.len());
    for path in files {
        out.extend(read_if_exists(&path)?);
    }
    Ok(out)
}

fn read_if_exists(path: &Path) -> Result<Option<Resource>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(Resource::new(path.display().to_string(), bytes))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// In-memory resolver. Glob patterns are matched against the stored names.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    entries: IndexMap<String, Vec<u8>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(name, contents);
        self
    }

    pub fn insert(&mut self, name: &str, contents: impl Into<Vec<u8>>) {
        self.entries.insert(name.to_string(), contents.into());
    }
}

impl ResourceResolver for MemoryResolver {
    fn resolve(&self, pattern: &str) -> Result<Vec<Resource>> {
        if !is_glob(pattern) {
            return Ok(self
                .entries
                .get(pattern)
                .map(|bytes| Resource::new(pattern, bytes.clone()))
                .into_iter()
                .collect());
        }

        let matcher = glob::Pattern::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let mut found: Vec<Resource> = self
            .entries
            .iter()
            .filter(|(name, _)| matcher.matches(name))
            .map(|(name, bytes)| Resource::new(name.as_str(), bytes.clone()))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn names(resources: &[Resource]) -> Vec<String> {
        resources
            .iter()
            .map(|r| {
                Path::new(&r.name)
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    fn resolver(dirs: &[&TempDir]) -> FsResolver {
        FsResolver::with_search_paths(
            dirs.iter()
                .map(|d| SearchPath::Path(d.path().to_path_buf()))
                .collect(),
        )
    }

    #[test]
    fn literal_name_in_each_root() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(a.path().join("app.yaml"), "x: 1\n").unwrap();
        fs::write(b.path().join("app.yaml"), "x: 2\n").unwrap();

        let found = resolver(&[&a, &b]).resolve("app.yaml").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].bytes, b"x: 1\n");
        assert_eq!(found[1].bytes, b"x: 2\n");
    }

    #[test]
    fn missing_file_skipped() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(b.path().join("app.yaml"), "x: 2\n").unwrap();

        let found = resolver(&[&a, &b]).resolve("app.yaml").unwrap();
        assert_eq!(found.len(), 1);
        assert!(resolver(&[&a]).resolve("nope.yaml").unwrap().is_empty());
    }

    #[test]
    fn glob_matches_are_sorted() {
        let dir = TempDir::new().unwrap();
        let conf = dir.path().join("conf.d");
        fs::create_dir(&conf).unwrap();
        for name in ["20-b.yml", "10-a.yml", "30-c.yml", "notes.txt"] {
            fs::write(conf.join(name), "k: v\n").unwrap();
        }

        let found = resolver(&[&dir]).resolve("conf.d/*.yml").unwrap();
        assert_eq!(names(&found), vec!["10-a.yml", "20-b.yml", "30-c.yml"]);
    }

    #[test]
    fn glob_skips_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub.yml")).unwrap();
        fs::write(dir.path().join("a.yml"), "k: v\n").unwrap();
        let found = resolver(&[&dir]).resolve("*.yml").unwrap();
        assert_eq!(names(&found), vec!["a.yml"]);
    }

    #[test]
    fn absolute_path_ignores_roots() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("abs.yaml");
        fs::write(&file, "k: v\n").unwrap();

        let other = TempDir::new().unwrap();
        let found = resolver(&[&other])
            .resolve(file.to_str().unwrap())
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, file.display().to_string());
    }

    #[test]
    fn invalid_glob_pattern() {
        let dir = TempDir::new().unwrap();
        let err = resolver(&[&dir]).resolve("[.yml").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn reading_a_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("app.yaml")).unwrap();
        let err = resolver(&[&dir]).resolve("app.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn path_root_resolves_to_itself() {
        let p = PathBuf::from("/etc/myapp");
        assert_eq!(search_root(&SearchPath::Path(p.clone())), Some(p));
    }

    #[test]
    fn memory_literal_and_glob() {
        let mem = MemoryResolver::new()
            .with("conf/b.yml", "b: 1\n")
            .with("conf/a.yml", "a: 1\n")
            .with("other.yml", "o: 1\n");

        assert_eq!(mem.resolve("other.yml").unwrap().len(), 1);
        assert!(mem.resolve("missing.yml").unwrap().is_empty());

        let found: Vec<String> = mem
            .resolve("conf/*.yml")
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(found, vec!["conf/a.yml", "conf/b.yml"]);
    }

    #[test]
    fn glob_detection() {
        assert!(is_glob("*.yml"));
        assert!(is_glob("conf/a?.yml"));
        assert!(is_glob("[ab].yml"));
        assert!(!is_glob("conf/app.yml"));
    }
}
