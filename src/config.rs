use std::fmt;
use std::path::PathBuf;

use crate::tutor::session::ModeChangePolicy;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    MissingVar(&'static str),
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(name) => {
                write!(f, "required environment variable {name} is missing or empty")
            }
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub telegram_bot_token: String,
    /// Display name used in the greeting.
    pub bot_name: String,
    pub openai_api_key: String,
    /// Path to Whisper model file (.bin). Absent means voice notes are
    /// answered with an "unsupported" reply.
    pub whisper_model_path: Option<PathBuf>,
    /// Directory for state files (logs, voice scratch). Defaults to `.`.
    pub data_dir: PathBuf,
    /// Whether a user may re-pick a mode after their first choice.
    pub mode_change: ModeChangePolicy,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an injected variable lookup. Tests pass a map so they never
    /// touch process state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let telegram_bot_token = require(&lookup, "TELEGRAM_BOT_TOKEN")?;
        let bot_name = require(&lookup, "BOT_NAME")?;
        let openai_api_key = require(&lookup, "OPENAI_API_KEY")?;

        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2
            || token_parts[0].parse::<u64>().is_err()
            || token_parts[1].is_empty()
        {
            return Err(ConfigError::Validation(
                "TELEGRAM_BOT_TOKEN appears invalid (expected format: 123456789:ABCdefGHI...)"
                    .into(),
            ));
        }

        let whisper_model_path = lookup("WHISPER_MODEL_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let data_dir = lookup("DATA_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let mode_change = match lookup("MODE_CHANGE").filter(|v| !v.is_empty()) {
            None => ModeChangePolicy::default(),
            Some(value) => ModeChangePolicy::from_env_value(&value).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "MODE_CHANGE must be 'locked' or 'allowed', got '{value}'"
                ))
            })?,
        };

        Ok(Self {
            telegram_bot_token,
            bot_name,
            openai_api_key,
            whisper_model_path,
            data_dir,
            mode_change,
        })
    }
}

fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    lookup(name)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars = env(pairs);
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    fn valid_base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("TELEGRAM_BOT_TOKEN", "123456789:ABCdefGHIjklMNOpqrsTUVwxyz"),
            ("BOT_NAME", "Fluently"),
            ("OPENAI_API_KEY", "sk-test"),
        ]
    }

    fn assert_err(result: Result<Config, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config_with_defaults() {
        let config = load(&valid_base()).expect("should load valid config");
        assert_eq!(config.bot_name, "Fluently");
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert_eq!(config.mode_change, ModeChangePolicy::Locked);
        assert!(config.whisper_model_path.is_none());
    }

    #[test]
    fn test_optional_vars_applied() {
        let mut pairs = valid_base();
        pairs.push(("WHISPER_MODEL_PATH", "/models/ggml-base.en.bin"));
        pairs.push(("DATA_DIR", "/var/lib/fluently"));
        pairs.push(("MODE_CHANGE", "allowed"));

        let config = load(&pairs).unwrap();
        assert_eq!(
            config.whisper_model_path,
            Some(PathBuf::from("/models/ggml-base.en.bin"))
        );
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/fluently"));
        assert_eq!(config.mode_change, ModeChangePolicy::Allowed);
    }

    #[test]
    fn test_missing_token() {
        let err = assert_err(load(&[("BOT_NAME", "x"), ("OPENAI_API_KEY", "y")]));
        assert!(matches!(err, ConfigError::MissingVar("TELEGRAM_BOT_TOKEN")));
    }

    #[test]
    fn test_empty_token_counts_as_missing() {
        let mut pairs = valid_base();
        pairs[0] = ("TELEGRAM_BOT_TOKEN", "");
        let err = assert_err(load(&pairs));
        assert!(matches!(err, ConfigError::MissingVar("TELEGRAM_BOT_TOKEN")));
    }

    #[test]
    fn test_missing_bot_name() {
        let err = assert_err(load(&[
            ("TELEGRAM_BOT_TOKEN", "123456789:ABCdef"),
            ("OPENAI_API_KEY", "y"),
        ]));
        assert!(matches!(err, ConfigError::MissingVar("BOT_NAME")));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let mut pairs = valid_base();
        pairs[0] = ("TELEGRAM_BOT_TOKEN", "invalid_token_no_colon");
        let err = assert_err(load(&pairs));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_non_numeric_id() {
        let mut pairs = valid_base();
        pairs[0] = ("TELEGRAM_BOT_TOKEN", "notanumber:ABCdef");
        let err = assert_err(load(&pairs));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_token_format_empty_secret() {
        let mut pairs = valid_base();
        pairs[0] = ("TELEGRAM_BOT_TOKEN", "123456789:");
        let err = assert_err(load(&pairs));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_mode_change_value() {
        let mut pairs = valid_base();
        pairs.push(("MODE_CHANGE", "sometimes"));
        let err = assert_err(load(&pairs));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("MODE_CHANGE"));
    }
}
