//! Webhook ingress for Telegram bots.
//!
//! Every backend runs the same cycle from [`ingress`]: POST only, secret
//! token header checked before the body is read, raw body handed to the
//! [`WebhookHandler`], 200 on success and 500 on failure. Rejection detail
//! goes to the injected logger, never into the response.
pub mod backends;
pub mod ingress;
pub mod multibot;
pub mod routes;
pub mod server;
pub mod updates;

pub use backends::{AxumServer, BlockingServer, HyperServer, router};
pub use ingress::{
    HandlerFn, IngressRejection, SECRET_TOKEN_HEADER, WebhookHandler, WebhookIngress, handler_fn,
};
pub use multibot::MultiBot;
pub use routes::Routes;
pub use server::{Backend, ServerOptions, WebhookError, WebhookServer};
pub use updates::UpdateSink;
