// Configuration loading and parsing (config/vbox.toml plus environment overrides).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_PRIMARY_URL: &str = "https://api3.boxfarming.in";
pub const DEFAULT_FALLBACK_URL: &str = "https://v-box-backend.vercel.app";
pub const DEFAULT_AUTH_URL: &str = "https://v-box-backend.vercel.app";

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_POLL_PAGE_SIZE: u32 = 50;
pub const MAX_POLL_PAGE_SIZE: u32 = 500;
pub const DEFAULT_TRACE_CAPACITY: usize = 50;

/// File name of the database when no explicit path is configured.
const DB_FILE_NAME: &str = "vbox.db";

/// Environment variables consulted after the config file is applied.
pub const ENV_API_PRIMARY: &str = "VBOX_API_PRIMARY";
pub const ENV_API_FALLBACK: &str = "VBOX_API_FALLBACK";
pub const ENV_AUTH_API: &str = "VBOX_AUTH_API";
pub const ENV_DB_PATH: &str = "VBOX_DB_PATH";

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api: ApiConfig,
    pub poller: PollerConfig,
    pub diagnostics: DiagnosticsConfig,
    pub db_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            poller: PollerConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            db_path: default_db_path(),
        }
    }
}

/// Backend hosts. Every dispatched call tries `primary_url` first and
/// `fallback_url` second; authentication calls go to `auth_url` only.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub primary_url: String,
    pub fallback_url: String,
    pub auth_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            fallback_url: DEFAULT_FALLBACK_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_secs: u64,
    pub page_size: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            page_size: DEFAULT_POLL_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Number of request traces kept in memory before the oldest is evicted.
    pub trace_capacity: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            trace_capacity: DEFAULT_TRACE_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// vbox.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire vbox.toml file. Every section
/// is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiConfig,
    poller: PollerConfig,
    diagnostics: DiagnosticsConfig,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct DatabaseSection {
    path: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/vbox.toml` relative to
/// `base_dir`, then apply overrides produced by `lookup_env`.
///
/// A missing `vbox.toml` is not an error: every field has a default.
/// `lookup_env` is injected so tests don't touch the process environment.
pub fn load_config_from<F>(base_dir: &Path, lookup_env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = base_dir.join("config").join("vbox.toml");

    let file = if config_path.exists() {
        let text = read_file(&config_path)?;
        toml::from_str::<ConfigFile>(&text).map_err(|e| ConfigError::ParseError {
            path: config_path.clone(),
            source: e,
        })?
    } else {
        ConfigFile::default()
    };

    let mut config = Config {
        api: file.api,
        poller: file.poller,
        diagnostics: file.diagnostics,
        db_path: file.database.path.unwrap_or_else(default_db_path),
    };

    apply_env_overrides(&mut config, lookup_env);
    normalize(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory using the real process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd, |key| std::env::var(key).ok())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn apply_env_overrides<F>(config: &mut Config, lookup_env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup_env(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty(ENV_API_PRIMARY) {
        config.api.primary_url = url;
    }
    if let Some(url) = non_empty(ENV_API_FALLBACK) {
        config.api.fallback_url = url;
    }
    if let Some(url) = non_empty(ENV_AUTH_API) {
        config.api.auth_url = url;
    }
    if let Some(path) = non_empty(ENV_DB_PATH) {
        config.db_path = path;
    }
}

fn normalize(config: &mut Config) {
    for url in [
        &mut config.api.primary_url,
        &mut config.api.fallback_url,
        &mut config.api.auth_url,
    ] {
        let trimmed = url.trim().trim_end_matches('/').to_string();
        *url = trimmed;
    }
}

/// Database location under the platform data directory, or the working
/// directory when no home directory can be resolved.
fn default_db_path() -> String {
    directories::ProjectDirs::from("in", "boxfarming", "vbox")
        .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
        .to_string_lossy()
        .into_owned()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url_fields: &[(&str, &str)] = &[
        ("api.primary_url", &config.api.primary_url),
        ("api.fallback_url", &config.api.fallback_url),
        ("api.auth_url", &config.api.auth_url),
    ];
    for (name, url) in url_fields {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must start with http:// or https://, got {url:?}"),
            });
        }
    }

    if config.poller.interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "poller.interval_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    let page_size = config.poller.page_size;
    if !(1..=MAX_POLL_PAGE_SIZE).contains(&page_size) {
        return Err(ConfigError::ValidationError {
            field: "poller.page_size".into(),
            message: format!("must be between 1 and {MAX_POLL_PAGE_SIZE}, got {page_size}"),
        });
    }

    if config.diagnostics.trace_capacity == 0 {
        return Err(ConfigError::ValidationError {
            field: "diagnostics.trace_capacity".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
