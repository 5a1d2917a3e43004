//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Paperboard has two configuration scopes:
//! - **Global**: User-level settings
//! - **Workspace**: Directory-level overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Workspace config file
//! 4. Environment (`PAPERBOARD_TOKEN`)
//! 5. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$PAPERBOARD_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/paperboard/config.toml`
//! 3. `~/.paperboard/config.toml` (canonical write location)
//!
//! # Example
//!
//! ```no_run
//! use paperboard::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/workspace"))).unwrap();
//! let config = result.config;
//!
//! println!("Server: {}", config.api_base());
//! println!("Timeout: {:?}", config.timeout());
//! ```

pub mod schema;

pub use schema::{GestureSettings, GlobalConfig, ServerConfig, WorkspaceConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Default REST API base URL.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

/// Default persistence timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default pointer travel before a press becomes a drag.
pub const DEFAULT_ACTIVATION_DISTANCE: f64 = 8.0;

/// Default keyboard drag step.
pub const DEFAULT_KEYBOARD_STEP: f64 = 25.0;

/// Environment variable overriding the bearer token.
pub const TOKEN_ENV: &str = "PAPERBOARD_TOKEN";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence automatically: workspace overrides global,
/// global overrides defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Workspace configuration (if present)
    pub workspace: Option<WorkspaceConfig>,
    /// Token taken from the environment
    pub(crate) env_token: Option<String>,
    pub(crate) global_path: Option<PathBuf>,
    pub(crate) workspace_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `workspace_dir` is provided, also loads
    /// `<workspace_dir>/.paperboard/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing files are not an error.
    pub fn load(workspace_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let global_path = Self::find_global();
        let mut result = Self::load_from(global_path.as_deref(), workspace_dir)?;
        result.config.env_token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty());
        Ok(result)
    }

    /// Load configuration from an explicit global file and workspace directory.
    ///
    /// Environment variables are not consulted.
    pub fn load_from(
        global_file: Option<&Path>,
        workspace_dir: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let (global, global_path) = match global_file {
            Some(path) if path.exists() => (Self::read_toml::<GlobalConfig>(path)?, Some(path.to_path_buf())),
            _ => (GlobalConfig::default(), None),
        };

        let (workspace, workspace_path) = match workspace_dir {
            Some(dir) => {
                let path = Self::workspace_config_path(dir);
                if path.exists() {
                    (Some(Self::read_toml::<WorkspaceConfig>(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref w) = workspace {
            w.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                workspace,
                env_token: None,
                global_path,
                workspace_path,
            },
        })
    }

    /// Locate the global config file, if any exists.
    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("PAPERBOARD_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("paperboard/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        let path = dirs::home_dir()?.join(".paperboard/config.toml");
        path.exists().then_some(path)
    }

    fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for global config.
    ///
    /// Returns `~/.paperboard/config.toml`.
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".paperboard/config.toml"))
    }

    /// Get the path for workspace config under `dir`.
    pub fn workspace_config_path(dir: &Path) -> PathBuf {
        dir.join(".paperboard/config.toml")
    }

    /// Write global config atomically.
    pub fn write_global(config: &GlobalConfig) -> Result<PathBuf, ConfigError> {
        let path = Self::global_config_path()?;
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write workspace config atomically.
    pub fn write_workspace(dir: &Path, config: &WorkspaceConfig) -> Result<PathBuf, ConfigError> {
        let path = Self::workspace_config_path(dir);
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write a config file atomically (temp file in the same directory, then rename).
    fn write_config_atomic<T: serde::Serialize>(
        path: &Path,
        config: &T,
    ) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    fn server_field<T>(&self, pick: impl Fn(&ServerConfig) -> Option<T>) -> Option<T> {
        self.workspace
            .as_ref()
            .and_then(|w| w.server.as_ref())
            .and_then(&pick)
            .or_else(|| self.global.server.as_ref().and_then(&pick))
    }

    fn gesture_field<T>(&self, pick: impl Fn(&GestureSettings) -> Option<T>) -> Option<T> {
        self.workspace
            .as_ref()
            .and_then(|w| w.gesture.as_ref())
            .and_then(&pick)
            .or_else(|| self.global.gesture.as_ref().and_then(&pick))
    }

    /// Base URL of the board server.
    ///
    /// Defaults to [`DEFAULT_API_BASE`].
    pub fn api_base(&self) -> String {
        self.server_field(|s| s.api_base.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }

    /// Persistence call timeout.
    ///
    /// Defaults to [`DEFAULT_TIMEOUT_MS`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.server_field(|s| s.timeout_ms).unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Bearer token. The environment wins over config files.
    pub fn token(&self) -> Option<String> {
        self.env_token
            .clone()
            .or_else(|| self.server_field(|s| s.token.clone()))
    }

    /// Pointer travel before a drag activates.
    pub fn activation_distance(&self) -> f64 {
        self.gesture_field(|g| g.activation_distance)
            .unwrap_or(DEFAULT_ACTIVATION_DISTANCE)
    }

    /// Keyboard drag step.
    pub fn keyboard_step(&self) -> f64 {
        self.gesture_field(|g| g.keyboard_step)
            .unwrap_or(DEFAULT_KEYBOARD_STEP)
    }

    /// Project commands default to, if configured.
    pub fn default_project(&self) -> Option<&str> {
        self.workspace
            .as_ref()
            .and_then(|w| w.default_project.as_deref())
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded workspace config file.
    pub fn workspace_config_loaded_from(&self) -> Option<&Path> {
        self.workspace_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_files() {
        let result = Config::load_from(None, None).unwrap();
        let config = result.config;

        assert_eq!(config.api_base(), DEFAULT_API_BASE);
        assert_eq!(config.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.activation_distance(), DEFAULT_ACTIVATION_DISTANCE);
        assert_eq!(config.keyboard_step(), DEFAULT_KEYBOARD_STEP);
        assert!(config.token().is_none());
        assert!(config.default_project().is_none());
        assert!(config.global_config_loaded_from().is_none());
    }

    #[test]
    fn load_global_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [server]
            api_base = "https://papers.example.org/api"
            timeout_ms = 1500
            token = "secret"
            "#,
        )
        .unwrap();

        let config = Config::load_from(Some(&path), None).unwrap().config;
        assert_eq!(config.api_base(), "https://papers.example.org/api");
        assert_eq!(config.timeout(), Duration::from_millis(1500));
        assert_eq!(config.token().as_deref(), Some("secret"));
        assert_eq!(config.global_config_loaded_from(), Some(path.as_path()));
    }

    #[test]
    fn workspace_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        fs::write(
            &global,
            r#"
            [server]
            api_base = "https://global.example.org/api"
            timeout_ms = 1500

            [gesture]
            activation_distance = 3.0
            "#,
        )
        .unwrap();

        let workspace = temp.path().join("ws");
        Config::write_workspace(
            &workspace,
            &WorkspaceConfig {
                default_project: Some("lab".into()),
                server: Some(ServerConfig {
                    api_base: Some("http://localhost:9000/api".into()),
                    ..Default::default()
                }),
                gesture: None,
            },
        )
        .unwrap();

        let config = Config::load_from(Some(&global), Some(&workspace))
            .unwrap()
            .config;
        assert_eq!(config.api_base(), "http://localhost:9000/api");
        // not overridden: falls through to global
        assert_eq!(config.timeout(), Duration::from_millis(1500));
        assert_eq!(config.activation_distance(), 3.0);
        assert_eq!(config.default_project(), Some("lab"));
        assert!(config.workspace_config_loaded_from().is_some());
    }

    #[test]
    fn invalid_value_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[server]\ntimeout_ms = 0\n").unwrap();

        let result = Config::load_from(Some(&path), None);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "mystery = true\n").unwrap();

        let result = Config::load_from(Some(&path), None);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn env_token_wins() {
        let config = Config {
            global: GlobalConfig {
                server: Some(ServerConfig {
                    token: Some("from-file".into()),
                    ..Default::default()
                }),
                gesture: None,
            },
            env_token: Some("from-env".into()),
            ..Default::default()
        };
        assert_eq!(config.token().as_deref(), Some("from-env"));
    }

    #[test]
    fn write_workspace_config_atomic() {
        let temp = TempDir::new().unwrap();
        let config = WorkspaceConfig {
            default_project: Some("proj".into()),
            ..Default::default()
        };

        let path = Config::write_workspace(temp.path(), &config).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = Config::load_from(None, Some(temp.path())).unwrap();
        assert_eq!(loaded.config.default_project(), Some("proj"));
    }
}
