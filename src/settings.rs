//! Handles settings for the server. Configuration is read from an optional
//! `settings.toml` and overridden by `SPLITLEDGER_*` environment variables,
//! e.g. `SPLITLEDGER_DATABASE__URI`.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Database {
    pub uri: String,
    pub name: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            name: "SplitLedger".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Auth {
    /// HMAC key for bearer tokens.
    pub secret: String,
    pub token_ttl_hours: i64,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl_hours: 24 * 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Log {
    pub level: String,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub auth: Auth,
    pub log: Log,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("settings")
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SPLITLEDGER").separator("__"))
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        if settings.auth.secret.is_empty() {
            return Err(ConfigError::NotFound("auth.secret".to_string()));
        }
        Ok(settings)
    }
}
