//! Behavioural checks for configuration layering: defaults, file,
//! environment and command line, in increasing precedence.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rackpool_config::{
    Config, DEFAULT_MAX_INSTANCES, DEFAULT_MIN_INSTANCES, LogFormat, default_acquire_timeout_ms,
    default_log_filter, default_log_format,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

/// Serialises scenarios that touch `RACKPOOL_*` variables.
static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct Harness {
    temp_dir: TempDir,
    file_lines: RefCell<Vec<String>>,
    cli_args: RefCell<Vec<OsString>>,
    env_overrides: RefCell<Vec<(String, Option<OsString>)>>,
    loaded: RefCell<Option<Result<Config, String>>>,
    _env_lock: MutexGuard<'static, ()>,
}

impl Harness {
    fn new() -> Self {
        let env_lock = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
        let temp_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(error) => panic!("failed to create temporary directory: {error}"),
        };
        Self {
            temp_dir,
            file_lines: RefCell::new(Vec::new()),
            cli_args: RefCell::new(vec![OsString::from("rackpool")]),
            env_overrides: RefCell::new(Vec::new()),
            loaded: RefCell::new(None),
            _env_lock: env_lock,
        }
    }

    fn set_env(&self, key: &str, value: &str) {
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` on edition 2024; `Drop` restores it.
        unsafe { std::env::set_var(key, value) };
        self.env_overrides
            .borrow_mut()
            .push((key.to_owned(), previous));
    }

    fn args(&self) -> Vec<OsString> {
        let mut args = self.cli_args.borrow().clone();
        let lines = self.file_lines.borrow();
        if !lines.is_empty() {
            let path = self.temp_dir.path().join("rackpool.toml");
            if let Err(error) = fs::write(&path, lines.join("\n")) {
                panic!("failed to write configuration: {error}");
            }
            args.push(OsString::from("--config-path"));
            args.push(path.into_os_string());
        }
        args
    }

    fn config(&self) -> Config {
        if self.loaded.borrow().is_none() {
            let result = Config::load_from_iter(self.args()).map_err(|error| error.to_string());
            *self.loaded.borrow_mut() = Some(result);
        }
        match self.loaded.borrow().as_ref() {
            Some(Ok(config)) => config.clone(),
            Some(Err(error)) => panic!("configuration failed to load: {error}"),
            None => panic!("configuration was not loaded"),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let mut overrides = self.env_overrides.borrow_mut();
        while let Some((key, value)) = overrides.pop() {
            match value {
                Some(previous) => unsafe { std::env::set_var(&key, previous) },
                None => unsafe { std::env::remove_var(&key) },
            }
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[given("a configuration file setting {field} to {value}")]
fn given_file_setting(harness: &Harness, field: String, value: u64) {
    harness
        .file_lines
        .borrow_mut()
        .push(format!("{field} = {value}"));
}

#[given("the environment sets \"{key}\" to \"{value}\"")]
fn given_environment(harness: &Harness, key: String, value: String) {
    harness.set_env(&key, &value);
}

#[when("the CLI sets \"{flag}\" to \"{value}\"")]
fn when_cli_sets(harness: &Harness, flag: String, value: String) {
    let mut args = harness.cli_args.borrow_mut();
    args.push(OsString::from(flag));
    args.push(OsString::from(value));
}

#[when("the configuration loads without overrides")]
fn when_load_without_overrides(harness: &Harness) {
    let _ = harness.config();
}

#[then("the built-in defaults are applied")]
fn then_defaults_applied(harness: &Harness) {
    let config = harness.config();
    assert_eq!(config.min_instances, DEFAULT_MIN_INSTANCES);
    assert_eq!(config.max_instances, DEFAULT_MAX_INSTANCES);
    assert_eq!(config.acquire_timeout_ms, default_acquire_timeout_ms());
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
}

#[then("min_instances resolves to {count}")]
fn then_min_instances(harness: &Harness, count: usize) {
    assert_eq!(harness.config().min_instances, count);
}

#[then("min_instances keeps its default")]
fn then_min_instances_default(harness: &Harness) {
    assert_eq!(harness.config().min_instances, DEFAULT_MIN_INSTANCES);
}

#[then("max_instances resolves to {count}")]
fn then_max_instances(harness: &Harness, count: usize) {
    assert_eq!(harness.config().max_instances, count);
}

#[then("the log filter resolves to \"{filter}\"")]
fn then_log_filter(harness: &Harness, filter: String) {
    assert_eq!(harness.config().log_filter(), filter);
}

#[then("the log format resolves to \"{format}\"")]
fn then_log_format(harness: &Harness, format: String) {
    let expected: LogFormat = match format.parse() {
        Ok(parsed) => parsed,
        Err(error) => panic!("invalid expected format '{format}': {error}"),
    };
    assert_eq!(harness.config().log_format(), expected);
}

#[then("the pool settings are rejected")]
fn then_pool_settings_rejected(harness: &Harness) {
    let config = harness.config();
    assert!(
        config.pool_settings().is_err(),
        "min {} above max {} should not validate",
        config.min_instances,
        config.max_instances
    );
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Built-in defaults apply without overrides"
)]
fn defaults_apply(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Command-line flags override defaults"
)]
fn cli_overrides_defaults(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Environment variables override the configuration file"
)]
fn environment_overrides_file(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Command-line flags override environment variables"
)]
fn cli_overrides_environment(#[from(harness)] harness: Harness) {
    drop(harness);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Inverted pool bounds load but fail validation"
)]
fn inverted_bounds_fail_validation(#[from(harness)] harness: Harness) {
    drop(harness);
}
