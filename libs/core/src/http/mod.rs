//! Byte-level HTTP transport used for outgoing calls.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};

use crate::error::TransportError;

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub type RawRequest = Request<Bytes>;

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: RawRequest) -> Result<RawResponse, TransportError>;
}
