//! Loader settings.
//!
//! # Search roots
//!
//! Relative resource names and glob patterns are looked up under each
//! [`SearchPath`] in the order given, so with
//!
//! ```text
//! [Path("/etc/myapp"), Platform("myapp"), Cwd]
//! ```
//!
//! the name `app.yaml` yields up to three layers: the system file, the user
//! file and the project file. In [`LoadMode::Layered`] with the default merge
//! actions the project file wins.
//!
//! Absolute names ignore the search roots.

use std::path::PathBuf;

/// Where to look for relative resource names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPath {
    /// Platform config directory for the named application
    /// (`~/.config/{app}` on Linux, `~/Library/Application Support/{app}` on macOS).
    Platform(String),
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(String),
    /// Current working directory.
    Cwd,
    /// An explicit directory.
    Path(PathBuf),
}

/// How the resolved resources become one tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Parse each resource on its own and merge them in order, later on top.
    #[default]
    Layered,
    /// Join all resources into one document before parsing, so anchors
    /// defined in an earlier file can be referenced from a later one.
    Concatenate,
}
