//! Deployment path resolution for the hosted runtime.
//!
//! Before the first application instance boots, the host's init parameters
//! are turned into the filesystem locations and environment variables the
//! runtime expects. [`Booter`] computes them into a [`BootEnvironment`]; it
//! never touches the process environment itself, leaving the host to export
//! [`BootEnvironment::variables`] where it builds instances.

use std::collections::BTreeMap;
use std::env;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

pub(crate) const BOOT_TARGET: &str = "rackpool::boot";

/// Init parameter naming the public document root.
pub const PUBLIC_ROOT_PARAM: &str = "public.root";
/// Init parameter naming the gem search path.
pub const GEM_PATH_PARAM: &str = "gem.path";
/// Fallback init parameter for the gem search path.
pub const GEM_HOME_PARAM: &str = "gem.home";
/// Init parameter carrying the runtime environment name.
pub const RACK_ENV_PARAM: &str = "rack.env";

/// Variable exported with the runtime environment name.
pub const RACK_ENV_VAR: &str = "RACK_ENV";
/// Variable exported with the gem search path.
pub const GEM_PATH_VAR: &str = "GEM_PATH";

/// Separator used when joining search paths.
#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';
/// Separator used when joining search paths.
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

const DEFAULT_PUBLIC_ROOT: &str = "/";
const DEFAULT_GEM_PARENT: &str = "/WEB-INF";
const INIT_SCRIPTS: [&str; 2] = ["/META-INF/init.rb", "/WEB-INF/init.rb"];

/// Host services consulted while booting.
pub trait BootContext {
    /// Looks up a deployment init parameter.
    fn init_parameter(&self, name: &str) -> Option<String>;

    /// Maps a deployment-relative path to a filesystem path.
    fn real_path(&self, path: &str) -> Option<String>;

    /// Returns `true` when the deployment contains `path`.
    fn resource_exists(&self, path: &str) -> bool;

    /// Writes a message to the host log.
    fn log(&self, message: &str);
}

/// Locations and variables computed for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootEnvironment {
    public_path: Utf8PathBuf,
    gem_path: Utf8PathBuf,
    rack_env: Option<String>,
    variables: BTreeMap<String, String>,
    init_scripts: Vec<String>,
}

impl BootEnvironment {
    /// Filesystem location of the public document root.
    #[must_use]
    pub fn public_path(&self) -> &Utf8Path {
        &self.public_path
    }

    /// Filesystem location of the deployment's gems.
    #[must_use]
    pub fn gem_path(&self) -> &Utf8Path {
        &self.gem_path
    }

    /// Runtime environment name, when configured.
    #[must_use]
    pub fn rack_env(&self) -> Option<&str> {
        self.rack_env.as_deref()
    }

    /// Environment variables to export before instances boot.
    #[must_use]
    pub const fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// Looks up one exported variable.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Deployment-relative init scripts present, in load order.
    #[must_use]
    pub fn init_scripts(&self) -> &[String] {
        &self.init_scripts
    }
}

/// Resolves a [`BootEnvironment`] from a [`BootContext`].
#[derive(Debug)]
pub struct Booter<C> {
    context: C,
}

impl<C: BootContext> Booter<C> {
    /// Wraps `context`.
    #[must_use]
    pub const fn new(context: C) -> Self {
        Self { context }
    }

    /// The wrapped context.
    #[must_use]
    pub const fn context(&self) -> &C {
        &self.context
    }

    /// Resolves the environment, extending the process's current `GEM_PATH`.
    #[must_use]
    pub fn boot(&self) -> BootEnvironment {
        let existing = env::var(GEM_PATH_VAR).ok();
        self.boot_with_gem_path(existing.as_deref())
    }

    /// Resolves the environment, extending `existing_gem_path` when given.
    #[must_use]
    pub fn boot_with_gem_path(&self, existing_gem_path: Option<&str>) -> BootEnvironment {
        let public_path = self.resolve_public_path();
        let gem_path = self.resolve_gem_path();
        let rack_env = self.context.init_parameter(RACK_ENV_PARAM);

        let mut variables = BTreeMap::new();
        if let Some(name) = rack_env.as_ref() {
            variables.insert(RACK_ENV_VAR.to_owned(), name.clone());
        }
        variables.insert(
            GEM_PATH_VAR.to_owned(),
            join_search_path(gem_path.as_str(), existing_gem_path),
        );

        let init_scripts: Vec<String> = INIT_SCRIPTS
            .iter()
            .filter(|script| self.context.resource_exists(script))
            .map(|script| (*script).to_owned())
            .collect();

        debug!(
            target: BOOT_TARGET,
            public_path = %public_path,
            gem_path = %gem_path,
            rack_env = rack_env.as_deref().unwrap_or("-"),
            init_scripts = init_scripts.len(),
            "resolved boot environment"
        );

        BootEnvironment {
            public_path,
            gem_path,
            rack_env,
            variables,
            init_scripts,
        }
    }

    /// Logger writing to the host log.
    #[must_use]
    pub const fn logger(&self) -> BootLogger<'_, C> {
        BootLogger {
            context: &self.context,
        }
    }

    fn resolve_public_path(&self) -> Utf8PathBuf {
        let root = self
            .context
            .init_parameter(PUBLIC_ROOT_PARAM)
            .unwrap_or_else(|| DEFAULT_PUBLIC_ROOT.to_owned());
        let real = self.real_path_or_virtual(trim_trailing_slashes(&root));
        Utf8PathBuf::from(trim_trailing_slashes(&real))
    }

    fn resolve_gem_path(&self) -> Utf8PathBuf {
        self.context
            .init_parameter(GEM_PATH_PARAM)
            .or_else(|| self.context.init_parameter(GEM_HOME_PARAM))
            .map_or_else(
                || Utf8PathBuf::from(self.real_path_or_virtual(DEFAULT_GEM_PARENT)).join("gems"),
                |configured| Utf8PathBuf::from(self.real_path_or_virtual(&configured)),
            )
    }

    fn real_path_or_virtual(&self, path: &str) -> String {
        self.context
            .real_path(path)
            .unwrap_or_else(|| path.to_owned())
    }
}

/// Forwards runtime log lines to the host log.
#[derive(Debug)]
pub struct BootLogger<'a, C> {
    context: &'a C,
}

impl<C: BootContext> BootLogger<'_, C> {
    /// Logs at debug level.
    pub fn debug(&self, message: &str) {
        self.write("DEBUG", message);
    }

    /// Logs at info level.
    pub fn info(&self, message: &str) {
        self.write("INFO", message);
    }

    /// Logs at warn level.
    pub fn warn(&self, message: &str) {
        self.write("WARN", message);
    }

    /// Logs at error level.
    pub fn error(&self, message: &str) {
        self.write("ERROR", message);
    }

    fn write(&self, level: &str, message: &str) {
        self.context.log(&format!("{level}: {message}"));
    }
}

/// [`BootContext`] backed by an exploded deployment directory.
///
/// Deployment-relative paths resolve below `root`; init parameters come from
/// an in-memory map and log lines go to `tracing`.
#[derive(Debug, Clone)]
pub struct DirectoryBootContext {
    root: Utf8PathBuf,
    parameters: BTreeMap<String, String>,
}

impl DirectoryBootContext {
    /// Serves the deployment rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Adds an init parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    fn resolve(&self, path: &str) -> Utf8PathBuf {
        let relative = path.trim_start_matches('/');
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }
}

impl BootContext for DirectoryBootContext {
    fn init_parameter(&self, name: &str) -> Option<String> {
        self.parameters.get(name).cloned()
    }

    fn real_path(&self, path: &str) -> Option<String> {
        Some(self.resolve(path).into_string())
    }

    fn resource_exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn log(&self, message: &str) {
        tracing::info!(target: BOOT_TARGET, "{message}");
    }
}

/// Strips trailing slashes, keeping a lone root slash.
fn trim_trailing_slashes(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

fn join_search_path(head: &str, existing: Option<&str>) -> String {
    existing
        .filter(|value| !value.is_empty())
        .map_or_else(|| head.to_owned(), |tail| format!("{head}{PATH_SEPARATOR}{tail}"))
}
