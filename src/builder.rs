use std::sync::Arc;

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::extrapolate::PropertySource;
use crate::merge::MergeAction;
use crate::node::Node;
use crate::resolve::{self, ResolveInput};
use crate::resource::{FsResolver, Resource, ResourceResolver};
use crate::types::{LoadMode, SearchPath};

impl Config {
    /// Start building a config from resources.
    pub fn loader() -> ConfigLoader {
        ConfigLoader::new()
    }

    /// Load `patterns` from the current directory with the default settings.
    pub fn load<S: AsRef<str>>(patterns: &[S]) -> Result<Config> {
        patterns
            .iter()
            .fold(ConfigLoader::new(), |loader, p| loader.resource(p.as_ref()))
            .load()
    }
}

/// Builder for loading a [`Config`] from one or more resources.
///
/// Controls three independent axes:
///
/// - **Discovery**: [`resource()`](Self::resource) names and globs, looked
///   up under [`search_paths()`](Self::search_paths) or through a custom
///   [`resolver()`](Self::resolver).
/// - **Combination**: [`mode()`](Self::mode) and the merge actions decide
///   how the resolved resources become one tree.
/// - **Reading**: [`extrapolate()`](Self::extrapolate) and
///   [`properties()`](Self::properties) set up `${...}` substitution on the
///   loaded config.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    name: Option<String>,
    patterns: Vec<String>,
    resolver: Option<Arc<dyn ResourceResolver>>,
    search_paths: Option<Vec<SearchPath>>,
    mode: LoadMode,
    default_action: MergeAction,
    list_action: MergeAction,
    extrapolate: bool,
    properties: Option<Arc<dyn PropertySource>>,
    env_prefix: Option<String>,
    env_vars: Option<Vec<(String, String)>>,
    overrides: Vec<(String, Node)>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the loaded config (default: the patterns joined with `, `).
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Add a resource name or glob pattern. Patterns are loaded in the order
    /// they are added; later ones take precedence in layered mode.
    pub fn resource(mut self, pattern: &str) -> Self {
        self.patterns.push(pattern.to_string());
        self
    }

    /// Add several resources at once.
    pub fn resources<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Use a custom resolver instead of the filesystem.
    /// Search paths are ignored when a resolver is set.
    pub fn resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Replace the filesystem search roots (default: `[Cwd]`).
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Append a search root. If none have been set yet, starts from `[Cwd]`.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths
            .get_or_insert_with(|| vec![SearchPath::Cwd])
            .push(path);
        self
    }

    /// Set the load mode (default: [`LoadMode::Layered`]).
    pub fn mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Merge action for mapping and scalar collisions between resources
    /// (default: [`MergeAction::KeepExtra`]).
    pub fn default_action(mut self, action: MergeAction) -> Self {
        self.default_action = action;
        self
    }

    /// Merge action for sequence collisions between resources
    /// (default: [`MergeAction::KeepExtra`]).
    pub fn list_action(mut self, action: MergeAction) -> Self {
        self.list_action = action;
        self
    }

    /// Enable `${...}` substitution on reads (default: off).
    pub fn extrapolate(mut self, extrapolate: bool) -> Self {
        self.extrapolate = extrapolate;
        self
    }

    /// Source for `${sys:...}` and `${env:...}` references
    /// (default: [`ProcessProperties`](crate::ProcessProperties)).
    pub fn properties(mut self, properties: impl PropertySource + 'static) -> Self {
        self.properties = Some(Arc::new(properties));
        self
    }

    /// Merge `{PREFIX}__*` environment variables on top of the resources.
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Read the env layer from `vars` instead of the process environment.
    pub fn env_vars(mut self, vars: Vec<(String, String)>) -> Self {
        self.env_vars = Some(vars);
        self
    }

    /// Set `path` to `value` on top of every other layer.
    pub fn set(mut self, path: &str, value: impl Into<Node>) -> Self {
        self.overrides.push((path.to_string(), value.into()));
        self
    }

    /// Like [`set`](Self::set); `None` values are ignored (useful for
    /// optional command-line arguments).
    pub fn set_opt<V: Into<Node>>(self, path: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(path, v),
            None => self,
        }
    }

    fn effective_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.patterns.join(", "),
        }
    }

    fn effective_resolver(&self) -> Arc<dyn ResourceResolver> {
        if let Some(resolver) = &self.resolver {
            return Arc::clone(resolver);
        }
        match &self.search_paths {
            Some(paths) => Arc::new(FsResolver::with_search_paths(paths.clone())),
            None => Arc::new(FsResolver::new()),
        }
    }

    /// Resolve every pattern, in order.
    fn collect_resources(&self) -> Result<Vec<Resource>> {
        let resolver = self.effective_resolver();
        let mut resources = Vec::new();
        for pattern in &self.patterns {
            resources.extend(resolver.resolve(pattern)?);
        }
        if resources.is_empty() && !self.patterns.is_empty() {
            return Err(ConfigError::ResourceNotFound(self.patterns.clone()));
        }
        Ok(resources)
    }

    /// Build the [`ResolveInput`] from current builder state.
    fn build_input(&self) -> Result<ResolveInput> {
        let resources = self.collect_resources()?;
        let env_vars = match (&self.env_prefix, &self.env_vars) {
            (None, _) => Vec::new(),
            (Some(_), Some(vars)) => vars.clone(),
            (Some(_), None) => std::env::vars().collect(),
        };

        Ok(ResolveInput {
            name: self.effective_name(),
            resources,
            mode: self.mode,
            default_action: self.default_action,
            list_action: self.list_action,
            env_vars,
            env_prefix: self.env_prefix.clone(),
            overrides: self.overrides.clone(),
        })
    }

    /// Resolve, parse and merge everything into a [`Config`].
    ///
    /// Fails with [`ConfigError::ResourceNotFound`] if resources were
    /// requested but none of them exist.
    pub fn load(self) -> Result<Config> {
        let input = self.build_input()?;
        let mut config = resolve::resolve(input)?.with_extrapolate(self.extrapolate);
        if let Some(properties) = self.properties {
            config = config.with_properties(properties);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::props;
    use crate::resource::MemoryResolver;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn memory() -> MemoryResolver {
        MemoryResolver::new()
            .with("base.yaml", "server:\n  host: localhost\n  port: 8080\ntags: [a]\n")
            .with("conf.d/20-port.yaml", "server:\n  port: 9090\n")
            .with("conf.d/10-host.yaml", "server:\n  host: example.org\n")
            .with("extra.yaml", "tags: [b]\n")
    }

    #[test]
    fn single_resource() {
        let config = ConfigLoader::new()
            .resolver(memory())
            .resource("base.yaml")
            .load()
            .unwrap();
        assert_eq!(config.get_integer("server.port").unwrap(), 8080);
        assert_eq!(config.name(), "base.yaml");
    }

    #[test]
    fn glob_then_argument_order() {
        let config = ConfigLoader::new()
            .resolver(memory())
            .resource("base.yaml")
            .resource("conf.d/*.yaml")
            .load()
            .unwrap();
        assert_eq!(config.get_string("server.host").unwrap(), "example.org");
        assert_eq!(config.get_integer("server.port").unwrap(), 9090);
    }

    #[test]
    fn list_action_is_applied() {
        let config = ConfigLoader::new()
            .resolver(memory())
            .resources(["base.yaml", "extra.yaml"])
            .list_action(MergeAction::Union)
            .load()
            .unwrap();
        assert_eq!(config.get_string_list("tags").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn nothing_found_is_resource_not_found() {
        let err = ConfigLoader::new()
            .resolver(memory())
            .resource("missing.yaml")
            .resource("nope/*.yaml")
            .load()
            .unwrap_err();
        match err {
            ConfigError::ResourceNotFound(patterns) => {
                assert_eq!(patterns, vec!["missing.yaml", "nope/*.yaml"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn partially_missing_is_fine() {
        let config = ConfigLoader::new()
            .resolver(memory())
            .resources(["missing.yaml", "base.yaml"])
            .load()
            .unwrap();
        assert_eq!(config.get_integer("server.port").unwrap(), 8080);
    }

    #[test]
    fn no_resources_builds_from_overrides() {
        let config = ConfigLoader::new()
            .name("inline")
            .set("server.port", 1234i64)
            .set_opt("server.host", None::<&str>)
            .load()
            .unwrap();
        assert_eq!(config.get_integer("server.port").unwrap(), 1234);
        assert!(!config.contains("server.host"));
        assert_eq!(config.name(), "inline");
    }

    #[test]
    fn env_and_overrides_layer_on_top() {
        let config = ConfigLoader::new()
            .resolver(memory())
            .resource("base.yaml")
            .env_prefix("APP")
            .env_vars(vec![
                ("APP__SERVER__PORT".into(), "7000".into()),
                ("APP__SERVER__HOST".into(), "env-host".into()),
            ])
            .set("server.host", "cli-host")
            .load()
            .unwrap();
        assert_eq!(config.get_integer("server.port").unwrap(), 7000);
        assert_eq!(config.get_string("server.host").unwrap(), "cli-host");
    }

    #[test]
    fn extrapolation_settings_reach_the_config() {
        let resolver = MemoryResolver::new().with("app.yaml", "home: ${env:HOME}/app\n");
        let config = ConfigLoader::new()
            .resolver(resolver.clone())
            .resource("app.yaml")
            .extrapolate(true)
            .properties(props())
            .load()
            .unwrap();
        assert_eq!(config.get_string("home").unwrap(), "/home/tester/app");

        let raw = ConfigLoader::new()
            .resolver(resolver)
            .resource("app.yaml")
            .load()
            .unwrap();
        assert_eq!(raw.get_string("home").unwrap(), "${env:HOME}/app");
    }

    #[test]
    fn concatenate_mode() {
        let resolver = MemoryResolver::new()
            .with("a.yaml", "base: &base\n  retries: 3\n")
            .with("b.yaml", "job:\n  <<: *base\n");
        let config = ConfigLoader::new()
            .resolver(resolver)
            .resources(["a.yaml", "b.yaml"])
            .mode(LoadMode::Concatenate)
            .load()
            .unwrap();
        assert_eq!(config.get_integer("job.retries").unwrap(), 3);
    }

    #[test]
    fn filesystem_search_paths_in_order() {
        let system = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(system.path().join("app.yaml"), "port: 1\nhost: sys\n").unwrap();
        fs::write(project.path().join("app.yaml"), "port: 2\n").unwrap();

        let config = ConfigLoader::new()
            .search_paths(vec![
                SearchPath::Path(system.path().to_path_buf()),
                SearchPath::Path(project.path().to_path_buf()),
            ])
            .resource("app.yaml")
            .load()
            .unwrap();
        assert_eq!(config.get_integer("port").unwrap(), 2);
        assert_eq!(config.get_string("host").unwrap(), "sys");
    }

    #[test]
    fn config_load_shortcut() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("app.yaml");
        fs::write(&file, "k: v\n").unwrap();
        let config = Config::load(&[file.to_str().unwrap()]).unwrap();
        assert_eq!(config.get_string("k").unwrap(), "v");
    }
}
