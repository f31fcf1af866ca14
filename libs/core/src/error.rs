//! Error taxonomy shared by the encoder, the decoder and the caller.

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hint attached to a failed call telling the caller how to proceed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseParameters {
    /// The group has been migrated to a supergroup with this identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrate_to_chat_id: Option<i64>,
    /// Seconds to wait before the request can be repeated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u32>,
}

/// A well formed `{"ok": false}` envelope.
///
/// This is an ordinary outcome of a call, callers are expected to branch on
/// [`ApiError::code`] and [`ApiError::description`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: i32,
    pub description: String,
    pub parameters: Option<ResponseParameters>,
}

impl ApiError {
    pub fn new(code: i32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: ResponseParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn migrate_to_chat_id(&self) -> Option<i64> {
        self.parameters.as_ref().and_then(|p| p.migrate_to_chat_id)
    }

    pub fn retry_after(&self) -> Option<u32> {
        self.parameters.as_ref().and_then(|p| p.retry_after)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.code, self.description)?;
        if let Some(params) = &self.parameters {
            write!(
                f,
                " migrate to chat id: {}, retry after: {}",
                params.migrate_to_chat_id.unwrap_or_default(),
                params.retry_after.unwrap_or_default()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Local failure while building a request payload.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("serialize parameters")]
    Serialize(#[source] serde_json::Error),
    #[error("parameters must serialize to a JSON object")]
    NotAnObject,
    #[error("attachment path {0} does not exist in the serialized parameters")]
    MissingAttachmentPath(String),
    #[error("copy attachment {name} into multipart body")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid multipart part name {0:?}")]
    InvalidPartName(String),
}

/// Malformed envelope, malformed result or unrecognized discriminator.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed payload")]
    Malformed(#[source] serde_json::Error),
    #[error("envelope reported ok but carried no result")]
    MissingResult,
    #[error("{type_name}: discriminator field {field:?} is missing or not a string")]
    MissingDiscriminator {
        type_name: &'static str,
        field: &'static str,
    },
    #[error("{type_name}: unknown {field} {value:?}")]
    UnknownVariant {
        type_name: &'static str,
        field: &'static str,
        value: String,
    },
}

impl From<serde_json::Error> for DecodeError {
    /// A discriminator failure nested in a serde derived type reaches here as
    /// a plain `serde_json::Error`; it is turned back into its own kind.
    fn from(err: serde_json::Error) -> Self {
        crate::variant::take_nested_failure(&err).unwrap_or(DecodeError::Malformed(err))
    }
}

/// Network or HTTP layer failure.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("server error {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid request")]
    Request(#[source] http::Error),
}

/// Everything a call through the client can end with, besides success.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("encode request")]
    Encode(#[from] EncodeError),
    #[error("transport")]
    Transport(#[from] TransportError),
    #[error("api error {0}")]
    Api(#[from] ApiError),
    #[error("decode response")]
    Decode(#[from] DecodeError),
}

impl BotError {
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            BotError::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_unknown_variant(&self) -> bool {
        matches!(self, BotError::Decode(DecodeError::UnknownVariant { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_text_without_hint() {
        let err = ApiError::new(400, "bad request");
        assert_eq!(err.to_string(), r#"400 "bad request""#);
    }

    #[test]
    fn api_error_text_with_hint() {
        let err = ApiError::new(400, "bad request").with_parameters(ResponseParameters {
            migrate_to_chat_id: Some(1),
            retry_after: Some(2),
        });
        assert_eq!(
            err.to_string(),
            r#"400 "bad request" migrate to chat id: 1, retry after: 2"#
        );
        assert_eq!(err.migrate_to_chat_id(), Some(1));
        assert_eq!(err.retry_after(), Some(2));
    }

    #[test]
    fn bot_error_exposes_api_error() {
        let err = BotError::from(ApiError::new(403, "Forbidden: bot was blocked by the user"));
        assert_eq!(err.as_api().map(|e| e.code), Some(403));
        assert!(!err.is_unknown_variant());
    }
}
