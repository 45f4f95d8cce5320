//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::ConfigError;

/// Runtime environment enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - config errors fall back to defaults
    #[default]
    Development,
    /// Staging mode
    Staging,
    /// Production mode - config errors are fatal
    Production,
}

impl RuntimeEnvironment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Parse the `ASSISTANT_ENV` value; unknown names map to development
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "staging" => Self::Staging,
            _ => Self::Development,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Backend endpoints and timeouts
    #[serde(default)]
    pub backends: BackendsConfig,

    /// Session store bounds
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Household profiles accepted on chat and learn requests
    #[serde(default = "default_valid_user_ids")]
    pub valid_user_ids: Vec<String>,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::default(),
            server: ServerConfig::default(),
            backends: BackendsConfig::default(),
            sessions: SessionConfig::default(),
            valid_user_ids: default_valid_user_ids(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_valid_user_ids() -> Vec<String> {
    ["dad", "mom", "teen", "child"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Settings {
    /// Load settings from a single YAML file, bypassing the layered lookup
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.display(), e)))?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Whether `user_id` is in the household allow-list
    pub fn is_valid_user_id(&self, user_id: &str) -> bool {
        self.valid_user_ids.iter().any(|id| id == user_id)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_backends()?;
        self.validate_sessions()?;

        if self.valid_user_ids.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "valid_user_ids".to_string(),
                message: "At least one user id is required".to_string(),
            });
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if server.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.request_timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if server.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_upload_bytes".to_string(),
                message: "Upload limit must be positive".to_string(),
            });
        }

        if self.environment.is_production() && server.cors_enabled && server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 Any origin will be allowed."
            );
        }

        Ok(())
    }

    fn validate_backends(&self) -> Result<(), ConfigError> {
        let backends = &self.backends;

        for (field, url) in [
            ("backends.voice_url", &backends.voice_url),
            ("backends.llm_url", &backends.llm_url),
            ("backends.learning_url", &backends.learning_url),
        ] {
            if url.trim().is_empty() {
                return Err(ConfigError::MissingField(field.to_string()));
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Must start with http:// or https://, got '{}'", url),
                });
            }
        }

        if backends.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backends.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if backends.health_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backends.health_timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }

    fn validate_sessions(&self) -> Result<(), ConfigError> {
        let sessions = &self.sessions;

        if sessions.max_history == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sessions.max_history".to_string(),
                message: "History bound must be at least 1".to_string(),
            });
        }

        if sessions.max_age_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sessions.max_age_seconds".to_string(),
                message: "Max age must be at least 1 second".to_string(),
            });
        }

        if sessions.sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sessions.sweep_interval_seconds".to_string(),
                message: "Sweep interval must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// End-to-end request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Maximum accepted request body, covers audio uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    120
}
fn default_max_upload_bytes() -> usize {
    32 * 1024 * 1024
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Backend endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsConfig {
    /// Speech transcription and speaker identification service
    #[serde(default = "default_voice_url")]
    pub voice_url: String,

    /// Reply generation service
    #[serde(default = "default_llm_url")]
    pub llm_url: String,

    /// Correction review service
    #[serde(default = "default_learning_url")]
    pub learning_url: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_backend_timeout")]
    pub timeout_seconds: u64,

    /// Per-backend health check timeout in seconds
    #[serde(default = "default_health_timeout")]
    pub health_timeout_seconds: u64,
}

fn default_voice_url() -> String {
    "http://127.0.0.1:8001".to_string()
}
fn default_llm_url() -> String {
    "http://127.0.0.1:8002".to_string()
}
fn default_learning_url() -> String {
    "http://127.0.0.1:8003".to_string()
}
fn default_backend_timeout() -> u64 {
    30
}
fn default_health_timeout() -> u64 {
    5
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            voice_url: default_voice_url(),
            llm_url: default_llm_url(),
            learning_url: default_learning_url(),
            timeout_seconds: default_backend_timeout(),
            health_timeout_seconds: default_health_timeout(),
        }
    }
}

impl BackendsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_seconds)
    }
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Messages kept per session before the oldest are dropped
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Inactivity after which a session is swept
    #[serde(default = "default_max_age")]
    pub max_age_seconds: u64,

    /// Interval between sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_max_history() -> usize {
    20
}
fn default_max_age() -> u64 {
    24 * 60 * 60
}
fn default_sweep_interval() -> u64 {
    60 * 60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            max_age_seconds: default_max_age(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl SessionConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from `config/` relative to the working directory
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from files in `dir`, then environment variables
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::from(dir.join("default")).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("ASSISTANT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("valid_user_ids")
            .with_list_parse_key("server.cors_origins"),
    );

    let config = builder.build()?;
    let mut settings: Settings = config.try_deserialize()?;

    if let Some(env_name) = env {
        settings.environment = RuntimeEnvironment::from_name(env_name);
    }

    settings.validate()?;

    Ok(settings)
}
