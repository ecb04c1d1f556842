//! Client configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! optional TOML files plus `REFILL__*` environment variables. Each
//! sub-module represents a logical configuration section.

pub mod auth;
pub mod http;
pub mod logging;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use self::auth::AuthConfig;
pub use self::http::HttpConfig;
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;

use crate::error::AppError;

/// Root client configuration.
///
/// Every section has defaults, so an empty source produces a usable
/// configuration pointed at the development backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// REST API settings.
    #[serde(default)]
    pub http: HttpConfig,
    /// Token lifecycle settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Realtime event connection settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default` with an environment-specific overlay and
    /// environment variables prefixed with `REFILL__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("REFILL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        tracing::debug!(env, base_url = %config.http.base_url, "Configuration loaded");
        Ok(config)
    }
}
