//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$PAPERBOARD_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/paperboard/config.toml`
//! 3. `~/.paperboard/config.toml` (canonical write location)
//!
//! # Workspace Config
//!
//! Located at `.paperboard/config.toml` in the working directory.
//!
//! # Validation
//!
//! Config values are validated after parsing so that a bad timeout or a
//! malformed URL is reported at load time rather than on the first move.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::ProjectId;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// [server]
/// api_base = "https://papers.example.org/api"
/// timeout_ms = 5000
///
/// [gesture]
/// activation_distance = 6.0
/// keyboard_step = 20.0
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Board server settings
    pub server: Option<ServerConfig>,

    /// Drag gesture tuning
    pub gesture: Option<GestureSettings>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(server) = &self.server {
            server.validate()?;
        }
        if let Some(gesture) = &self.gesture {
            gesture.validate()?;
        }
        Ok(())
    }
}

/// Workspace configuration (directory scope).
///
/// Overrides the global config for boards worked on from this directory.
///
/// # Example
///
/// ```toml
/// default_project = "lab-reading-group"
///
/// [server]
/// api_base = "http://localhost:9000/api"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Project whose board commands default to
    pub default_project: Option<String>,

    /// Board server overrides
    pub server: Option<ServerConfig>,

    /// Drag gesture overrides
    pub gesture: Option<GestureSettings>,
}

impl WorkspaceConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(project) = &self.default_project {
            ProjectId::new(project.as_str())
                .map_err(|e| ConfigError::InvalidValue(format!("default_project: {}", e)))?;
        }
        if let Some(server) = &self.server {
            server.validate()?;
        }
        if let Some(gesture) = &self.gesture {
            gesture.validate()?;
        }
        Ok(())
    }
}

/// Board server settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Base URL of the REST API
    pub api_base: Option<String>,

    /// Persistence call timeout in milliseconds
    pub timeout_ms: Option<u64>,

    /// Bearer token sent with every request
    pub token: Option<String>,
}

impl ServerConfig {
    /// Validate server settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base) = &self.api_base {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "server.api_base must be an http(s) URL, got '{}'",
                    base
                )));
            }
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue(
                "server.timeout_ms must be greater than zero".into(),
            ));
        }
        if let Some(token) = &self.token {
            if token.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "server.token cannot be blank".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Drag gesture tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GestureSettings {
    /// Pointer travel (px) before a press becomes a drag
    pub activation_distance: Option<f64>,

    /// Distance (px) one arrow key moves a keyboard drag
    pub keyboard_step: Option<f64>,
}

impl GestureSettings {
    /// Validate gesture settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(distance) = self.activation_distance {
            if !distance.is_finite() || distance < 0.0 {
                return Err(ConfigError::InvalidValue(format!(
                    "gesture.activation_distance must be a non-negative number, got {}",
                    distance
                )));
            }
        }
        if let Some(step) = self.keyboard_step {
            if !step.is_finite() || step <= 0.0 {
                return Err(ConfigError::InvalidValue(format!(
                    "gesture.keyboard_step must be positive, got {}",
                    step
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod global_config {
        use super::*;

        #[test]
        fn defaults() {
            let config = GlobalConfig::default();
            assert!(config.server.is_none());
            assert!(config.gesture.is_none());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn parses_sections() {
            let config: GlobalConfig = toml::from_str(
                r#"
                [server]
                api_base = "https://example.org/api"
                timeout_ms = 2500

                [gesture]
                activation_distance = 4.0
                "#,
            )
            .unwrap();
            assert!(config.validate().is_ok());
            let server = config.server.unwrap();
            assert_eq!(server.timeout_ms, Some(2500));
            assert_eq!(config.gesture.unwrap().activation_distance, Some(4.0));
        }

        #[test]
        fn roundtrip() {
            let config = GlobalConfig {
                server: Some(ServerConfig {
                    api_base: Some("http://localhost:1/api".into()),
                    timeout_ms: Some(100),
                    token: None,
                }),
                gesture: None,
            };
            let text = toml::to_string_pretty(&config).unwrap();
            let parsed: GlobalConfig = toml::from_str(&text).unwrap();
            assert_eq!(config, parsed);
        }

        #[test]
        fn reject_unknown_fields() {
            let result: Result<GlobalConfig, _> = toml::from_str("colour = \"blue\"");
            assert!(result.is_err());
        }
    }

    mod server_config {
        use super::*;

        #[test]
        fn non_http_base_rejected() {
            let server = ServerConfig {
                api_base: Some("ftp://example.org".into()),
                ..Default::default()
            };
            assert!(server.validate().is_err());
        }

        #[test]
        fn zero_timeout_rejected() {
            let server = ServerConfig {
                timeout_ms: Some(0),
                ..Default::default()
            };
            assert!(server.validate().is_err());
        }

        #[test]
        fn blank_token_rejected() {
            let server = ServerConfig {
                token: Some("   ".into()),
                ..Default::default()
            };
            assert!(server.validate().is_err());
        }
    }

    mod gesture_settings {
        use super::*;

        #[test]
        fn negative_distance_rejected() {
            let gesture = GestureSettings {
                activation_distance: Some(-1.0),
                keyboard_step: None,
            };
            assert!(gesture.validate().is_err());
        }

        #[test]
        fn zero_distance_allowed() {
            let gesture = GestureSettings {
                activation_distance: Some(0.0),
                keyboard_step: Some(10.0),
            };
            assert!(gesture.validate().is_ok());
        }

        #[test]
        fn zero_step_rejected() {
            let gesture = GestureSettings {
                activation_distance: None,
                keyboard_step: Some(0.0),
            };
            assert!(gesture.validate().is_err());
        }
    }

    mod workspace_config {
        use super::*;

        #[test]
        fn invalid_project_rejected() {
            let config = WorkspaceConfig {
                default_project: Some("has space".into()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn valid_project_accepted() {
            let config: WorkspaceConfig = toml::from_str("default_project = \"lab\"").unwrap();
            assert!(config.validate().is_ok());
        }
    }
}
