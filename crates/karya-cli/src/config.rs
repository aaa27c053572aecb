// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: Apache-2.0

//! Layered configuration (§10): `config/default.toml` → `config/local.toml`
//! (git-ignored) → environment variables prefixed `KARYA__`, in that
//! precedence order. Grounded in this workspace's own `Settings` convention.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// The §4.7 floor: a resumer tick more frequent than once a second is
/// almost certainly a misconfiguration, not an intentional polling rate.
const MIN_POLL_INTERVAL_SECONDS: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub resumer: ResumerConfig,
    pub invoker: InvokerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumerConfig {
    pub poll_interval_seconds: u64,
    pub max_jobs_per_tick: usize,
}

impl ResumerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokerConfig {
    pub request_timeout_seconds: u64,
}

impl InvokerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Settings {
    /// Loads from `./config` with the default layering.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("KARYA")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Rejects non-sensical values before the process accepts traffic (§10).
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be greater than 0".to_string());
        }
        if self.database.url.is_empty() {
            return Err("database.url cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("database.max_connections must be greater than 0".to_string());
        }
        if self.database.min_connections > self.database.max_connections {
            return Err("database.min_connections cannot exceed max_connections".to_string());
        }
        if self.resumer.poll_interval_seconds < MIN_POLL_INTERVAL_SECONDS {
            return Err(format!(
                "resumer.poll_interval_seconds must be at least {MIN_POLL_INTERVAL_SECONDS}"
            ));
        }
        if self.resumer.max_jobs_per_tick == 0 {
            return Err("resumer.max_jobs_per_tick must be greater than 0".to_string());
        }
        if self.invoker.request_timeout_seconds == 0 {
            return Err("invoker.request_timeout_seconds must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/karya".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_seconds: 10,
                idle_timeout_seconds: 300,
            },
            resumer: ResumerConfig {
                poll_interval_seconds: 5,
                max_jobs_per_tick: 100,
            },
            invoker: InvokerConfig {
                request_timeout_seconds: 30,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn validation_catches_empty_database_url() {
        let mut settings = Settings::default();
        settings.database.url = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validation_catches_zero_port() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validation_catches_poll_interval_below_floor() {
        let mut settings = Settings::default();
        settings.resumer.poll_interval_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validation_catches_min_exceeding_max_connections() {
        let mut settings = Settings::default();
        settings.database.min_connections = 20;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn layered_load_falls_back_to_config_error_on_missing_required_fields() {
        let dir = std::env::temp_dir().join("karya-config-test-missing");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("default.toml"), "").unwrap();
        let result = Settings::load_from_path(&dir);
        assert!(result.is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
