//! Configuration discovery: TOML file, then environment overrides, then validation.
//!
//! Lookup order for the file:
//! 1. the path in `ANTMON_CONFIG`, when it points at a file;
//! 2. `antmon.toml` in the working directory;
//! 3. `antmon.toml` in the parent of the working directory.
//!
//! When none exists the built-in defaults are used.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::defaults::{
    BIND_ADDR_ENV, CONFIG_FILE_NAME, CONFIG_PATH_ENV, HTTP_PORT_ENV, LOG_FORMAT_ENV,
    LOG_LEVEL_ENV,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;

/// Configuration together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Effective configuration.
    pub config: AppConfig,
    /// File the configuration was read from, if any.
    pub source: Option<PathBuf>,
}

/// Load configuration using the process environment and working directory.
///
/// # Errors
///
/// Returns an error if a discovered file cannot be read or parsed, an
/// environment override is malformed, or validation fails.
pub fn load_from_env() -> ConfigResult<LoadedConfig> {
    let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
        operation: "config.current_dir",
        path: PathBuf::from("."),
        source,
    })?;
    load_with(|name| std::env::var(name).ok(), &cwd)
}

/// Load configuration with an injected variable lookup and working directory.
///
/// # Errors
///
/// See [`load_from_env`].
pub fn load_with<F>(lookup: F, cwd: &Path) -> ConfigResult<LoadedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let source = discover_file(&lookup, cwd);
    let mut config = match source.as_deref() {
        Some(path) => {
            info!(path = %path.display(), "loading configuration file");
            parse_file(path)?
        }
        None => {
            debug!("no configuration file found; using defaults");
            AppConfig::default()
        }
    };
    apply_env_overrides(&mut config, &lookup)?;
    config.validate()?;
    Ok(LoadedConfig { config, source })
}

/// Parse a TOML document into an [`AppConfig`] without applying overrides.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] when the document does not match the schema.
pub fn parse_str(document: &str, origin: &Path) -> ConfigResult<AppConfig> {
    toml::from_str(document).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source: Box::new(source),
    })
}

fn parse_file(path: &Path) -> ConfigResult<AppConfig> {
    let document = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read",
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&document, path)
}

fn discover_file<F>(lookup: &F, cwd: &Path) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let explicit = lookup(CONFIG_PATH_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .filter(|path| path.is_file());
    if explicit.is_some() {
        return explicit;
    }

    let local = cwd.join(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    cwd.parent()
        .map(|parent| parent.join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

fn apply_env_overrides<F>(config: &mut AppConfig, lookup: &F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(BIND_ADDR_ENV) {
        config.server.bind_addr = value.parse().map_err(|_| {
            ConfigError::invalid("server", "bind_addr", Some(value.clone()), "not_an_ip")
        })?;
    }
    if let Some(value) = lookup(HTTP_PORT_ENV) {
        config.server.http_port = value.parse().map_err(|_| {
            ConfigError::invalid("server", "http_port", Some(value.clone()), "not_a_port")
        })?;
    }
    if let Some(value) = lookup(LOG_LEVEL_ENV) {
        config.logging.level = value;
    }
    if let Some(value) = lookup(LOG_FORMAT_ENV) {
        config.logging.format = Some(value);
    }
    Ok(())
}
