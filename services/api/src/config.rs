//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use image_prompt_core::catalog::{DEFAULT_IMAGE_MODEL, DEFAULT_RELAY_ANALYSIS_MODEL};
use image_prompt_core::PromptSchema;
use std::net::SocketAddr;
use tracing::Level;

const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1";
const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub gateway_url: String,
    /// Optional at startup; relay calls fail with a 500 while it is absent.
    pub gateway_api_key: Option<String>,
    pub analysis_model: String,
    pub image_model: String,
    pub prompt_schema: PromptSchema,
    pub max_body_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue("MAX_BODY_BYTES".to_string(), e.to_string())
            })?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        // --- Gateway Settings ---
        let gateway_url = lookup("AI_GATEWAY_URL").unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());
        if !gateway_url.starts_with("http://") && !gateway_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "AI_GATEWAY_URL".to_string(),
                format!("'{}' is not an http(s) URL", gateway_url),
            ));
        }
        let gateway_api_key = lookup("AI_GATEWAY_API_KEY").filter(|key| !key.trim().is_empty());

        // --- Model and Schema Settings ---
        let analysis_model =
            lookup("ANALYSIS_MODEL").unwrap_or_else(|| DEFAULT_RELAY_ANALYSIS_MODEL.to_string());
        let image_model = lookup("IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());
        let prompt_schema = match lookup("PROMPT_SCHEMA") {
            Some(raw) => raw
                .parse::<PromptSchema>()
                .map_err(|e| ConfigError::InvalidValue("PROMPT_SCHEMA".to_string(), e))?,
            None => PromptSchema::default(),
        };

        Ok(Self {
            bind_address,
            log_level,
            gateway_url,
            gateway_api_key,
            analysis_model,
            image_model,
            prompt_schema,
            max_body_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.gateway_url, DEFAULT_GATEWAY_URL);
        assert_eq!(config.gateway_api_key, None);
        assert_eq!(config.analysis_model, DEFAULT_RELAY_ANALYSIS_MODEL);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.prompt_schema, PromptSchema::Structured);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn values_are_read_from_the_source() {
        let config = load(&[
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("RUST_LOG", "debug"),
            ("AI_GATEWAY_URL", "http://localhost:9000/v1"),
            ("AI_GATEWAY_API_KEY", "secret"),
            ("PROMPT_SCHEMA", "flat"),
            ("MAX_BODY_BYTES", "1024"),
        ])
        .unwrap();
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.gateway_api_key.as_deref(), Some("secret"));
        assert_eq!(config.prompt_schema, PromptSchema::Flat);
        assert_eq!(config.max_body_bytes, 1024);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = load(&[("AI_GATEWAY_API_KEY", "  ")]).unwrap();
        assert!(config.gateway_api_key.is_none());
    }

    #[test]
    fn invalid_values_are_reported_by_variable() {
        for (key, value) in [
            ("BIND_ADDRESS", "nowhere"),
            ("RUST_LOG", "chatty"),
            ("PROMPT_SCHEMA", "nested"),
            ("AI_GATEWAY_URL", "ftp://gateway"),
            ("MAX_BODY_BYTES", "lots"),
        ] {
            match load(&[(key, value)]) {
                Err(ConfigError::InvalidValue(var, _)) => assert_eq!(var, key),
                other => panic!("expected InvalidValue for {key}, got {other:?}"),
            }
        }
    }
}
