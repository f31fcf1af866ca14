use std::env;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+:[\w-]{35}$").expect("token regex compiles"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("bot token does not look like <bot id>:<35 character secret>")]
    InvalidToken,
    #[error("environment variable {0} is not set")]
    MissingToken(String),
    #[error("invalid TELEGRAM_HTTP_TIMEOUT_SECS value {0:?}")]
    InvalidTimeout(String),
}

pub fn validate_token(token: &str) -> Result<(), ConfigError> {
    if TOKEN_RE.is_match(token) {
        Ok(())
    } else {
        Err(ConfigError::InvalidToken)
    }
}

/// Connection settings for one bot.
#[derive(Clone)]
pub struct BotConfig {
    pub token: String,
    pub api_base: String,
    pub timeout: Duration,
    /// Routes calls to the test environment (`/bot<token>/test/<method>`).
    pub test_environment: bool,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .field("test_environment", &self.test_environment)
            .finish()
    }
}

impl BotConfig {
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        validate_token(&token)?;
        Ok(Self {
            token,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            test_environment: false,
        })
    }

    /// Builds the config for `token`, honouring `TELEGRAM_API_BASE`,
    /// `TELEGRAM_HTTP_TIMEOUT_SECS` and `TELEGRAM_TEST_ENV`.
    pub fn from_env(token: impl Into<String>) -> Result<Self, ConfigError> {
        Self::from_lookup(token, |key| env::var(key).ok())
    }

    /// Reads the token itself from the environment variable `token_env`.
    pub fn from_token_env(token_env: &str) -> Result<Self, ConfigError> {
        let token =
            env::var(token_env).map_err(|_| ConfigError::MissingToken(token_env.to_string()))?;
        Self::from_env(token)
    }

    pub(crate) fn from_lookup<F>(token: impl Into<String>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(token)?;
        if let Some(base) = lookup("TELEGRAM_API_BASE").filter(|v| !v.trim().is_empty()) {
            config.api_base = base;
        }
        if let Some(raw) = lookup("TELEGRAM_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
            config.timeout = Duration::from_secs(secs);
        }
        config.test_environment = lookup("TELEGRAM_TEST_ENV")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);
        Ok(config)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_test_environment(mut self, enabled: bool) -> Self {
        self.test_environment = enabled;
        self
    }

    pub fn method_url(&self, method: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        if self.test_environment {
            format!("{base}/bot{}/test/{method}", self.token)
        } else {
            format!("{base}/bot{}/{method}", self.token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TOKEN: &str = "123456:ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghi";

    #[test]
    fn accepts_well_formed_tokens() {
        assert!(validate_token(TOKEN).is_ok());
        assert!(validate_token(&format!("1:{}-_", "a".repeat(33))).is_ok());
        assert!(validate_token(&format!("1:{}", "a".repeat(36))).is_err());
    }

    #[test]
    fn rejects_malformed_tokens() {
        for token in ["", "abc:def", "123456:short", "x123:ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghi"] {
            assert_eq!(validate_token(token), Err(ConfigError::InvalidToken), "{token}");
        }
    }

    #[test]
    fn builds_method_urls() {
        let config = BotConfig::new(TOKEN).unwrap().with_api_base("http://local:8081/");
        assert_eq!(config.method_url("getMe"), format!("http://local:8081/bot{TOKEN}/getMe"));
        let config = config.with_test_environment(true);
        assert_eq!(
            config.method_url("getMe"),
            format!("http://local:8081/bot{TOKEN}/test/getMe")
        );
    }

    #[test]
    fn env_overrides_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TELEGRAM_API_BASE", "http://mock:9000"),
            ("TELEGRAM_HTTP_TIMEOUT_SECS", "5"),
            ("TELEGRAM_TEST_ENV", "true"),
        ]);
        let config =
            BotConfig::from_lookup(TOKEN, |key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.api_base, "http://mock:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.test_environment);
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = BotConfig::from_lookup(TOKEN, |key| {
            (key == "TELEGRAM_HTTP_TIMEOUT_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout("soon".into()));
    }

    #[test]
    fn debug_output_hides_token() {
        let config = BotConfig::new(TOKEN).unwrap();
        assert!(!format!("{config:?}").contains(TOKEN));
    }
}
