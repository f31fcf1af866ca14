//! Wire-level building blocks for the Telegram Bot API.
//!
//! This crate holds everything that does not need a network: the request
//! encoder (JSON or multipart with `attach://` references), the response
//! envelope decoder, discriminator-driven decoding of polymorphic fields, the
//! typed method parameters and the wire types they carry.
pub mod encode;
pub mod envelope;
pub mod error;
pub mod http;
pub mod input_file;
pub mod log;
pub mod methods;
pub mod multipart;
pub mod types;
pub mod variant;

pub use encode::{Attachment, AttachmentRef, RequestPayload, attachment_ref, encode_request};
pub use envelope::{ApiEnvelope, decode_response, decode_tagged_response};
pub use error::{ApiError, BotError, DecodeError, EncodeError, ResponseParameters, TransportError};
pub use http::{HttpTransport, RawRequest, RawResponse};
pub use input_file::{BytesSource, InputFile, NamedSource, PathSource};
pub use log::{Logger, NoopLogger, SharedLogger, TracingLogger};
pub use methods::ApiMethod;
pub use variant::{TaggedUnion, Variant};
