//! Runtime settings.
//!
//! Settings come from environment variables, optionally seeded from a `.env`
//! file in the working directory. Command-line flags override them.

use std::fmt;
use thiserror::Error;

use crate::agent::DEFAULT_MAX_STEPS;
use crate::llm::OPENROUTER_BASE_URL;
use crate::tools::DEFAULT_TOOL_ATTEMPTS;

/// Credential for the LLM API.
pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";
/// Base URL of the OpenAI-compatible API.
pub const API_BASE_VAR: &str = "TRACEMEND_API_BASE";
pub const MODEL_VAR: &str = "TRACEMEND_MODEL";
pub const MAX_STEPS_VAR: &str = "TRACEMEND_MAX_STEPS";
pub const TOOL_RETRIES_VAR: &str = "TRACEMEND_TOOL_RETRIES";
pub const TEMPERATURE_VAR: &str = "TRACEMEND_TEMPERATURE";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Settings for one invocation.
#[derive(Clone)]
pub struct Settings {
    /// API key sent as a bearer token.
    pub api_key: String,
    pub api_base: String,
    /// Explicit model; `None` selects the best available one.
    pub model: Option<String>,
    /// Step budget per agent phase.
    pub max_steps: usize,
    /// Attempts per tool invocation.
    pub tool_retries: u32,
    pub temperature: f64,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("max_steps", &self.max_steps)
            .field("tool_retries", &self.tool_retries)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Settings {
    /// Settings with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: OPENROUTER_BASE_URL.to_string(),
            model: None,
            max_steps: DEFAULT_MAX_STEPS,
            tool_retries: DEFAULT_TOOL_ATTEMPTS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Creates settings from environment variables.
    ///
    /// A `.env` file is loaded first when present; variables already set in
    /// the environment take precedence over it.
    ///
    /// # Environment Variables
    ///
    /// - `OPENROUTER_API_KEY`: API key (required)
    /// - `TRACEMEND_API_BASE`: API base URL (default: https://openrouter.ai/api/v1)
    /// - `TRACEMEND_MODEL`: Model override (default: best available)
    /// - `TRACEMEND_MAX_STEPS`: Step budget per phase (default: 25)
    /// - `TRACEMEND_TOOL_RETRIES`: Attempts per tool call (default: 2)
    /// - `TRACEMEND_TEMPERATURE`: Sampling temperature (default: 0.2)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the key is missing or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!(error = %err, "Failed to load .env file"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(API_KEY_VAR.to_string()))?;
        let mut settings = Self::new(api_key.trim());

        if let Some(val) = lookup(API_BASE_VAR) {
            settings.api_base = val.trim().trim_end_matches('/').to_string();
        }

        if let Some(val) = lookup(MODEL_VAR) {
            let val = val.trim();
            if !val.is_empty() {
                settings.model = Some(val.to_string());
            }
        }

        if let Some(val) = lookup(MAX_STEPS_VAR) {
            settings.max_steps = parse_env_value(&val, MAX_STEPS_VAR)?;
        }

        if let Some(val) = lookup(TOOL_RETRIES_VAR) {
            settings.tool_retries = parse_env_value(&val, TOOL_RETRIES_VAR)?;
        }

        if let Some(val) = lookup(TEMPERATURE_VAR) {
            settings.temperature = parse_env_value(&val, TEMPERATURE_VAR)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validates the settings values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api_base cannot be empty".to_string(),
            ));
        }

        if self.max_steps == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_steps must be greater than 0".to_string(),
            ));
        }

        if self.tool_retries == 0 {
            return Err(ConfigError::ValidationFailed(
                "tool_retries must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Builder method to set the step budget.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Builder method to set attempts per tool call.
    pub fn with_tool_retries(mut self, retries: u32) -> Self {
        self.tool_retries = retries;
        self
    }

    /// Builder method to set the temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[(API_KEY_VAR, "sk-test")])).unwrap();
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.api_base, OPENROUTER_BASE_URL);
        assert_eq!(settings.model, None);
        assert_eq!(settings.max_steps, 25);
        assert_eq!(settings.tool_retries, 2);
        assert!((settings.temperature - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_api_key() {
        let err = Settings::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == API_KEY_VAR));

        let err = Settings::from_lookup(lookup_from(&[(API_KEY_VAR, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup_from(&[
            (API_KEY_VAR, "sk-test"),
            (API_BASE_VAR, "http://localhost:4000/v1/"),
            (MODEL_VAR, "openai/gpt-4.1"),
            (MAX_STEPS_VAR, "10"),
            (TOOL_RETRIES_VAR, "3"),
            (TEMPERATURE_VAR, "0.5"),
        ]))
        .unwrap();
        assert_eq!(settings.api_base, "http://localhost:4000/v1");
        assert_eq!(settings.model.as_deref(), Some("openai/gpt-4.1"));
        assert_eq!(settings.max_steps, 10);
        assert_eq!(settings.tool_retries, 3);
        assert!((settings.temperature - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_blank_model_means_auto() {
        let settings =
            Settings::from_lookup(lookup_from(&[(API_KEY_VAR, "k"), (MODEL_VAR, " ")])).unwrap();
        assert_eq!(settings.model, None);
    }

    #[test]
    fn test_invalid_values() {
        let err = Settings::from_lookup(lookup_from(&[(API_KEY_VAR, "k"), (MAX_STEPS_VAR, "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == MAX_STEPS_VAR));

        let err = Settings::from_lookup(lookup_from(&[(API_KEY_VAR, "k"), (TEMPERATURE_VAR, "3.5")]))
            .unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_validation() {
        assert!(Settings::new("k").validate().is_ok());
        assert!(Settings::new("k")
            .with_max_steps(0)
            .validate()
            .unwrap_err()
            .to_string()
            .contains("max_steps"));
        assert!(Settings::new("k")
            .with_tool_retries(0)
            .validate()
            .unwrap_err()
            .to_string()
            .contains("tool_retries"));
        assert!(Settings::new("k").with_temperature(-0.1).validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", Settings::new("sk-secret-value"));
        assert!(!rendered.contains("sk-secret-value"));
        assert!(rendered.contains("<redacted>"));
    }
}
