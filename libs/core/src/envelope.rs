//! Response envelope returned by every Bot API call.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{ApiError, BotError, DecodeError, ResponseParameters};
use crate::variant::{decode_slice, TaggedUnion};

/// `{"ok": .., "result": .., "error_code": .., "description": .., "parameters": ..}`
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<Box<RawValue>>,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

impl ApiEnvelope {
    pub fn parse(raw: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Converts a failed envelope into its error, `None` when `ok` is true.
    pub fn error(&self) -> Option<ApiError> {
        if self.ok {
            return None;
        }
        Some(ApiError {
            code: self.error_code,
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        })
    }

    /// Decodes `result` into `T` with serde.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, BotError> {
        self.into_result_with(|raw| Ok(serde_json::from_slice(raw)?))
    }

    /// Decodes `result` with a custom decoder, used for results whose shape
    /// is picked by a discriminator.
    pub fn into_result_with<T, F>(self, decode: F) -> Result<T, BotError>
    where
        F: FnOnce(&[u8]) -> Result<T, DecodeError>,
    {
        if let Some(err) = self.error() {
            return Err(BotError::Api(err));
        }
        let raw = self.result.ok_or(DecodeError::MissingResult)?;
        Ok(decode(raw.get().as_bytes())?)
    }
}

/// Parses a response body and decodes the typed result.
pub fn decode_response<T: DeserializeOwned>(raw: &[u8]) -> Result<T, BotError> {
    ApiEnvelope::parse(raw)?.into_result()
}

/// Parses a response body whose result is a tagged union.
pub fn decode_tagged_response<T: TaggedUnion>(raw: &[u8]) -> Result<T, BotError> {
    ApiEnvelope::parse(raw)?.into_result_with(decode_slice::<T>)
}
