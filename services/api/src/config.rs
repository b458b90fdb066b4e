//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

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
    pub openai_api_key: Option<String>,
    pub explain_model: String,
    pub artifact_model: String,
    pub verify_model: String,
    pub quiz_model: String,
    pub roleplay_model: String,
    pub sst_model: String,
    pub tts_voice: String,
    /// Whether every new query also fact-checks itself.
    pub auto_verify_on_query: bool,
    /// The browser origin allowed by CORS.
    pub cors_origin: String,
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
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        // --- Server Settings ---
        let bind_address_str = or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = or("CORS_ORIGIN", "http://localhost:5173");

        // --- API Keys (optional until an adapter is built) ---
        let openai_api_key = var("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());

        // --- Adapter-specific Settings ---
        let explain_model = or("EXPLAIN_MODEL", "gpt-4o");
        let artifact_model = or("ARTIFACT_MODEL", "gpt-4o");
        let verify_model = or("VERIFY_MODEL", "gpt-4o");
        let quiz_model = or("QUIZ_MODEL", "gpt-4o-mini");
        let roleplay_model = or("ROLEPLAY_MODEL", "gpt-4o-mini");
        let sst_model = or("SST_MODEL", "whisper-1");
        let tts_voice = or("TTS_VOICE", "alloy");

        let auto_verify_on_query = match var("AUTO_VERIFY_ON_QUERY") {
            None => true,
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "AUTO_VERIFY_ON_QUERY".to_string(),
                    format!("'{}' is not true or false", raw),
                )
            })?,
        };

        Ok(Self {
            bind_address,
            log_level,
            openai_api_key,
            explain_model,
            artifact_model,
            verify_model,
            quiz_model,
            roleplay_model,
            sst_model,
            tts_voice,
            auto_verify_on_query,
            cors_origin,
        })
    }

    pub fn require_openai_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.auto_verify_on_query);
        assert!(config.openai_api_key.is_none());
        assert!(config.require_openai_key().is_err());
    }

    #[test]
    fn auto_verify_can_be_switched_off() {
        let config = load(&[("AUTO_VERIFY_ON_QUERY", "false")]).unwrap();
        assert!(!config.auto_verify_on_query);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = load(&[("AUTO_VERIFY_ON_QUERY", "sometimes")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref name, _) if name == "AUTO_VERIFY_ON_QUERY"));

        let err = load(&[("BIND_ADDRESS", "nowhere")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref name, _) if name == "BIND_ADDRESS"));
    }
}
