//! Server settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional file,
//! then `HIMS__SECTION__KEY` environment variables (for example
//! `HIMS__DATABASE__URL` or `HIMS__AUTH__JWT_SECRET`).

use std::time::Duration;

use auth_identity::{CreateStaffRequest, IdentityConfig, StaffRole};
use config::{Config, ConfigError, Environment, File};
use database_layer::{ConnectionConfig, RetryPolicy};
use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub server: HttpSettings,
    pub database: DatabaseSettings,
    pub auth: IdentityConfig,
    pub retry: RetrySettings,
    pub logging: LoggingSettings,
    /// Administrator created at startup when no account uses its email
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub host: String,
    pub port: u16,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Postgres URL; the in-memory store is used when absent
    pub url: Option<String>,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 20,
            connect_timeout_secs: 30,
        }
    }
}

impl DatabaseSettings {
    pub fn connection(&self) -> Option<ConnectionConfig> {
        let url = self.url.as_deref().map(str::trim).filter(|url| !url.is_empty())?;
        Some(ConnectionConfig {
            url: url.to_string(),
            max_connections: self.max_connections,
            connect_timeout_secs: self.connect_timeout_secs,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 10,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub json: bool,
    pub level: String,
    /// PII redaction for the notification and WebSocket logs
    pub redaction: LoggerConfig,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            json: false,
            level: "info".to_string(),
            redaction: LoggerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_first_name")]
    pub first_name: String,
    #[serde(default = "default_admin_last_name")]
    pub last_name: String,
}

fn default_admin_first_name() -> String {
    "System".to_string()
}

fn default_admin_last_name() -> String {
    "Administrator".to_string()
}

impl BootstrapAdmin {
    pub fn request(&self) -> CreateStaffRequest {
        CreateStaffRequest {
            email: self.email.clone(),
            password: self.password.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            employee_id: None,
            role: StaffRole::Admin,
            department: None,
            phone: None,
        }
    }
}

impl ServerSettings {
    /// Defaults, then `path` if given and present, then the environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix("HIMS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// In-memory settings with cheap password hashing and no retry delay
    pub fn for_tests() -> Self {
        Self {
            auth: IdentityConfig::for_tests(),
            retry: RetrySettings {
                max_attempts: 10,
                base_delay_ms: 1,
            },
            ..Self::default()
        }
    }
}
