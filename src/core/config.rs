//! Configuration management

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::core::errors::{Result, TranslationError};

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Hosted model used for every translation
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// Base URL of the Generative Language API
pub const DEFAULT_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Fixed instruction that frames the model as a translator
pub const SYSTEM_INSTRUCTION: &str = "You are a professional translator. Translate the following Japanese text into natural English. Output only the translation.";

/// Low temperature favours accuracy and speed over creative variation
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Configuration for translator
#[derive(Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Secret API key
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// API base URL, without the `/models/...` suffix
    pub api_endpoint: String,
    /// System instruction sent with each request
    pub system_instruction: String,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

// The key never reaches logs.
impl fmt::Debug for TranslatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_endpoint", &self.api_endpoint)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl TranslatorConfig {
    /// Create a configuration with the fixed defaults and the given key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Override the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = endpoint.into();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Only the API key is read from the environment; it must be present and
    /// non-empty.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(TranslationError::config(format!(
                "{} environment variable is required",
                API_KEY_ENV
            )));
        }

        let config = Self::new(api_key.trim());
        config.validate()?;

        info!("Loaded configuration for model {}", config.model);
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(TranslationError::config("API key is required"));
        }

        if self.model.is_empty() {
            return Err(TranslationError::config("Model identifier is required"));
        }

        if self.api_endpoint.is_empty() {
            return Err(TranslationError::config("API endpoint is required"));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(TranslationError::config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_validation() {
        let config = TranslatorConfig::new("test_key");
        assert!(config.validate().is_ok());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn test_config_validation_missing_key() {
        let config = TranslatorConfig {
            api_key: "   ".to_string(),
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_config_validation_temperature_range() {
        let config = TranslatorConfig {
            temperature: 3.5,
            ..TranslatorConfig::new("test_key")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = TranslatorConfig::new("super-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains(DEFAULT_MODEL));
    }

    #[test]
    #[serial]
    fn test_from_env_requires_key() {
        std::env::remove_var(API_KEY_ENV);
        let err = TranslatorConfig::from_env().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_key() {
        std::env::set_var(API_KEY_ENV, "env_key");
        let config = TranslatorConfig::from_env().unwrap();
        std::env::remove_var(API_KEY_ENV);

        assert_eq!(config.api_key, "env_key");
        assert_eq!(config.api_endpoint, DEFAULT_API_ENDPOINT);
    }
}
