//! Diagnostics collaborator injected into the client and webhook layers.

use std::fmt;
use std::sync::Arc;

/// Receives diagnostic messages. Never used for control flow.
pub trait Logger: fmt::Debug + Send + Sync {
    fn debug(&self, message: &str);
    fn error(&self, message: &str);
}

pub type SharedLogger = Arc<dyn Logger>;

/// Forwards to `tracing` under the given target label.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: &'static str,
}

impl TracingLogger {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn shared(component: &'static str) -> SharedLogger {
        Arc::new(Self::new(component))
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("tgb")
    }
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(component = self.component, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(component = self.component, "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Replaces every occurrence of `token` in `text`, so URLs of the form
/// `/bot<token>/method` can be logged.
pub fn redact_token(text: &str, token: &str) -> String {
    if token.is_empty() {
        return text.to_string();
    }
    text.replace(token, "<redacted>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn redacts_token_in_urls() {
        let url = "https://api.telegram.org/bot123:abc/getMe";
        assert_eq!(
            redact_token(url, "123:abc"),
            "https://api.telegram.org/bot<redacted>/getMe"
        );
        assert_eq!(redact_token(url, ""), url);
    }

    #[traced_test]
    #[test]
    fn tracing_logger_emits_events() {
        let logger = TracingLogger::new("webhook");
        logger.error("handler failed: boom");
        assert!(logs_contain("handler failed: boom"));
        assert!(logs_contain("webhook"));
    }
}
