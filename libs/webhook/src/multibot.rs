//! Many bots behind one server.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::ingress::WebhookIngress;
use crate::server::{WebhookError, WebhookServer};

pub type SharedOutcome = Result<(), Arc<WebhookError>>;

type Run = Shared<BoxFuture<'static, SharedOutcome>>;

/// Wraps a [`WebhookServer`] so that `start` and `stop` each run at most
/// once, however many bots call them and from however many tasks. Every
/// caller gets the outcome of the single real run. `register_handler` is
/// passed through untouched.
///
/// The real run is spawned onto the runtime, so a caller that is dropped
/// half way (a timeout, a losing `select!` arm) does not abandon it and the
/// next caller joins the same run.
pub struct MultiBot<S: ?Sized = dyn WebhookServer> {
    server: Arc<S>,
    started: OnceLock<Run>,
    stopped: OnceLock<Run>,
}

impl<S: WebhookServer + ?Sized + 'static> MultiBot<S> {
    pub fn new(server: Arc<S>) -> Self {
        Self {
            server,
            started: OnceLock::new(),
            stopped: OnceLock::new(),
        }
    }

    pub async fn start(&self, addr: SocketAddr) -> SharedOutcome {
        let run = self.started.get_or_init(|| {
            let server = self.server.clone();
            detach("start", async move { server.start(addr).await })
        });
        run.clone().await
    }

    pub async fn stop(&self) -> SharedOutcome {
        let run = self.stopped.get_or_init(|| {
            let server = self.server.clone();
            detach("stop", async move { server.stop().await })
        });
        run.clone().await
    }

    pub fn register_handler(&self, path: &str, ingress: WebhookIngress) -> Result<(), WebhookError> {
        self.server.register_handler(path, ingress)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    pub fn server(&self) -> &Arc<S> {
        &self.server
    }
}

fn detach<F>(action: &'static str, run: F) -> Run
where
    F: Future<Output = Result<(), WebhookError>> + Send + 'static,
{
    let handle = tokio::spawn(run);
    async move {
        match handle.await {
            Ok(outcome) => outcome.map_err(Arc::new),
            Err(err) => Err(Arc::new(WebhookError::Task(format!("{action}: {err}")))),
        }
    }
    .boxed()
    .shared()
}
