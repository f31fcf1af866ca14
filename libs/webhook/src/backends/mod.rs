//! HTTP engines behind [`crate::WebhookServer`]. Each one only adapts its
//! native request type to [`crate::Routes::dispatch`].

mod axum;
mod blocking;
mod hyper;

pub use self::axum::{AxumServer, router};
pub use self::blocking::BlockingServer;
pub use self::hyper::HyperServer;

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::server::WebhookError;

pub(crate) type ShutdownFn = Box<dyn FnOnce() + Send>;

/// Pause after a failed accept before trying again. Errors such as running
/// out of file descriptors persist for a while.
pub(crate) const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// A started server: where it listens, how to ask it to stop, and the task
/// that finishes once it has.
pub(crate) struct Running {
    pub addr: SocketAddr,
    pub shutdown: ShutdownFn,
    pub task: JoinHandle<Result<(), String>>,
}

#[derive(Default)]
pub(crate) struct Lifecycle {
    running: Mutex<Option<Running>>,
}

impl Lifecycle {
    pub fn install(&self, running: Running, backend: &'static str) -> Result<(), WebhookError> {
        let mut slot = self.running.lock().map_err(|_| WebhookError::Poisoned)?;
        if slot.is_some() {
            (running.shutdown)();
            return Err(WebhookError::AlreadyRunning);
        }
        tracing::info!(
            event = "webhook_server",
            action = "started",
            backend = backend,
            addr = %running.addr
        );
        *slot = Some(running);
        Ok(())
    }

    pub async fn stop(&self, timeout: Duration, backend: &'static str) -> Result<(), WebhookError> {
        let running = self
            .running
            .lock()
            .map_err(|_| WebhookError::Poisoned)?
            .take()
            .ok_or(WebhookError::NotRunning)?;
        (running.shutdown)();
        let outcome = match tokio::time::timeout(timeout, running.task).await {
            Err(_) => Err(WebhookError::ShutdownTimeout(timeout)),
            Ok(Err(join)) => Err(WebhookError::Task(join.to_string())),
            Ok(Ok(Err(message))) => Err(WebhookError::Task(message)),
            Ok(Ok(Ok(()))) => Ok(()),
        };
        match &outcome {
            Ok(()) => tracing::info!(event = "webhook_server", action = "stopped", backend = backend),
            Err(err) => tracing::warn!(
                event = "webhook_server",
                action = "stop_failed",
                backend = backend,
                error = %err
            ),
        }
        outcome
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().ok()?.as_ref().map(|running| running.addr)
    }
}
