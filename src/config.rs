use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::Role;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Root of the versioned REST API, e.g. `http://localhost:8080/api/v1`
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub email: Option<String>,
    pub password: Option<String>,
    /// Role of the configured account. The login endpoint only returns a
    /// token, so the role has to be known up front.
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            role: Role::SuperAdmin,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("config").required(false));

        // QS_API__BASE_URL, QS_AUTH__EMAIL, ...
        config = config.add_source(
            config::Environment::with_prefix("QS")
                .separator("__")
                .prefix_separator("_"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Credentials for the binary, if both halves are configured.
    pub fn credentials(&self) -> anyhow::Result<(String, String)> {
        match (&self.auth.email, &self.auth.password) {
            (Some(email), Some(password)) => Ok((email.clone(), password.clone())),
            _ => anyhow::bail!("QS_AUTH__EMAIL and QS_AUTH__PASSWORD must be set"),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
