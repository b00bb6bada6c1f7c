//! Service Configuration
//!
//! Layered, lowest priority first: built-in defaults, `config/default.toml`,
//! the file named by `SHS_CONFIG`, then `SHS__SECTION__KEY` environment
//! variables.

use crate::rate_limit::RateLimitConfig;
use ::config::{Config, ConfigError, Environment, File};
use inference_engine::RiskThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Secret shipped in the defaults; a warning is logged while it is in use
pub const DEFAULT_TOKEN_SECRET: &str = "change-me-in-production";

const CONFIG_PATH_VAR: &str = "SHS_CONFIG";
const ENV_PREFIX: &str = "SHS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub risk: RiskThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding `manifest.json` and the classifier graph
    pub dir: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://health_surveillance.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_secret: String,
    pub token_ttl_hours: i64,
    /// Password for the `admin` account created when no admin exists
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: DEFAULT_TOKEN_SECRET.to_string(),
            token_ttl_hours: auth::DEFAULT_TOKEN_TTL_HOURS,
            admin_password: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve Prometheus text on `GET /metrics`
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ServiceConfig {
    /// Load from all layers
    pub fn load() -> Result<Self, ConfigError> {
        let extra = std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from);
        Self::load_from(Path::new("config/default"), extra.as_deref(), Some(environment()))
    }

    /// Load from a base file (optional), an extra file (required when given)
    /// and an environment layer, if any
    pub fn load_from(
        base: &Path,
        extra: Option<&Path>,
        env: Option<Environment>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&ServiceConfig::default())?)
            .add_source(File::from(base).required(false));

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path));
        }
        if let Some(env) = env {
            builder = builder.add_source(env);
        }

        let config: ServiceConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.risk.validate().map_err(ConfigError::Message)?;

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.auth.token_secret.is_empty() {
            return Err(ConfigError::Message(
                "auth.token_secret must not be empty".to_string(),
            ));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::Message(
                "auth.token_ttl_hours must be positive".to_string(),
            ));
        }
        if self.rate_limit.enabled && (self.rate_limit.per_second == 0 || self.rate_limit.burst_size == 0)
        {
            return Err(ConfigError::Message(
                "rate_limit.per_second and rate_limit.burst_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// `SHS__SECTION__KEY` variables, with `SHS__SERVER__CORS_ORIGINS` split on commas
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("server.cors_origins")
}
