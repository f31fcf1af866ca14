//! HTTP client for the Telegram Bot API built on the `tgb-core` codec.
mod bot;
pub mod config;
pub mod transport;

pub use bot::Bot;
pub use config::{BotConfig, ConfigError, validate_token};
pub use transport::ReqwestTransport;
