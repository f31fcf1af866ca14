use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::backends::{AxumServer, BlockingServer, HyperServer};
use crate::ingress::WebhookIngress;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("server already running")]
    AlreadyRunning,
    #[error("server is not running")]
    NotRunning,
    #[error("webhook path must start with '/': {0:?}")]
    InvalidPath(String),
    #[error("webhook path {0} is already registered")]
    DuplicatePath(String),
    #[error("server task failed: {0}")]
    Task(String),
    #[error("graceful shutdown did not finish within {0:?}")]
    ShutdownTimeout(Duration),
    #[error("route table lock poisoned")]
    Poisoned,
}

/// A running HTTP server that webhook endpoints can be attached to.
#[async_trait]
pub trait WebhookServer: Send + Sync {
    async fn start(&self, addr: SocketAddr) -> Result<(), WebhookError>;

    /// Stops accepting connections and waits for in-flight requests.
    async fn stop(&self) -> Result<(), WebhookError>;

    fn register_handler(&self, path: &str, ingress: WebhookIngress) -> Result<(), WebhookError>;

    /// Bound address once started; useful when binding port 0.
    fn local_addr(&self) -> Option<SocketAddr>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Axum,
    Hyper,
    Blocking,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Axum, Backend::Hyper, Backend::Blocking];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Axum => "axum",
            Backend::Hyper => "hyper",
            Backend::Blocking => "blocking",
        }
    }

    pub fn server(self, options: ServerOptions) -> Arc<dyn WebhookServer> {
        match self {
            Backend::Axum => Arc::new(AxumServer::new(options)),
            Backend::Hyper => Arc::new(HyperServer::new(options)),
            Backend::Blocking => Arc::new(BlockingServer::new(options)),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "axum" => Ok(Backend::Axum),
            "hyper" => Ok(Backend::Hyper),
            "blocking" => Ok(Backend::Blocking),
            other => Err(format!("unknown webhook backend {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// How long `stop` waits for in-flight requests.
    pub shutdown_timeout: Duration,
    /// Worker threads of the blocking backend.
    pub workers: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(10),
            workers: 4,
        }
    }
}
