use std::io::{self, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};
use tokio::runtime::Handle;

use super::{ACCEPT_ERROR_BACKOFF, Lifecycle, Running};
use crate::ingress::{WebhookIngress, record_status};
use crate::routes::Routes;
use crate::server::{ServerOptions, WebhookError, WebhookServer};

const BACKEND: &str = "blocking";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Classic blocking server on `tiny_http` with a fixed pool of worker
/// threads. Handlers still run on the tokio runtime that called `start`;
/// handlers doing tokio IO or timers need that runtime to be multi-threaded.
pub struct BlockingServer {
    routes: Routes,
    options: ServerOptions,
    lifecycle: Lifecycle,
}

impl BlockingServer {
    pub fn new(options: ServerOptions) -> Self {
        Self {
            routes: Routes::new(),
            options,
            lifecycle: Lifecycle::default(),
        }
    }
}

struct Worker {
    server: Arc<tiny_http::Server>,
    routes: Routes,
    runtime: Handle,
    stopping: Arc<AtomicBool>,
}

impl Worker {
    fn run(self) {
        while !self.stopping.load(Ordering::SeqCst) {
            match self.server.recv_timeout(POLL_INTERVAL) {
                Ok(Some(request)) => self.serve(request),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(event = "webhook_server", backend = BACKEND, error = %err, "receive failed");
                    back_off(&self.stopping);
                }
            }
        }
    }

    fn serve(&self, mut request: tiny_http::Request) {
        let path = request
            .url()
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();
        let headers = header_map(request.headers());
        let declared_len = request.body_length();
        let status = match Method::from_bytes(request.method().as_str().as_bytes()) {
            Ok(method) => process(
                &self.routes,
                &self.runtime,
                &path,
                &method,
                &headers,
                declared_len,
                request.as_reader(),
            ),
            Err(_) => unrepresentable_method(&self.routes, &path),
        };
        let response = tiny_http::Response::empty(status.as_u16());
        if let Err(err) = request.respond(response) {
            tracing::debug!(backend = BACKEND, path = %path, error = %err, "write response failed");
        }
    }
}

/// Sleeps after a failed receive, waking early once the server is stopping.
fn back_off(stopping: &AtomicBool) {
    let mut waited = Duration::ZERO;
    while waited < ACCEPT_ERROR_BACKOFF && !stopping.load(Ordering::SeqCst) {
        thread::sleep(POLL_INTERVAL);
        waited += POLL_INTERVAL;
    }
}

/// Runs the shared ingress cycle from a worker thread.
///
/// `tiny_http` ends the body reader quietly when the peer closes early, so a
/// body shorter than its `Content-Length` is turned into a read error here.
fn process(
    routes: &Routes,
    runtime: &Handle,
    path: &str,
    method: &Method,
    headers: &HeaderMap,
    declared_len: Option<usize>,
    reader: &mut dyn Read,
) -> StatusCode {
    runtime.block_on(routes.dispatch(path, method, headers, || async move {
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;
        match declared_len {
            Some(expected) if body.len() < expected => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("body ended after {} of {expected} bytes", body.len()),
            )),
            _ => Ok(Bytes::from(body)),
        }
    }))
}

/// Status for a request whose method `http` cannot represent. Such a method
/// is never POST, so a known path answers 405 and any other path 404, as the
/// other backends do.
fn unrepresentable_method(routes: &Routes, path: &str) -> StatusCode {
    let status = match routes.get(path) {
        Some(_) => StatusCode::METHOD_NOT_ALLOWED,
        None => StatusCode::NOT_FOUND,
    };
    record_status(status);
    status
}

fn header_map(headers: &[tiny_http::Header]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for header in headers {
        let name = HeaderName::from_bytes(header.field.as_str().as_str().as_bytes());
        let value = HeaderValue::from_str(header.value.as_str());
        if let (Ok(name), Ok(value)) = (name, value) {
            map.append(name, value);
        }
    }
    map
}

#[async_trait]
impl WebhookServer for BlockingServer {
    async fn start(&self, addr: SocketAddr) -> Result<(), WebhookError> {
        let server = tiny_http::Server::http(addr).map_err(|err| WebhookError::Bind {
            addr,
            source: std::io::Error::other(err),
        })?;
        let bound = server.server_addr().to_ip().unwrap_or(addr);
        let server = Arc::new(server);
        let stopping = Arc::new(AtomicBool::new(false));
        let runtime = Handle::current();

        let mut threads = Vec::with_capacity(self.options.workers.max(1));
        for index in 0..self.options.workers.max(1) {
            let worker = Worker {
                server: server.clone(),
                routes: self.routes.clone(),
                runtime: runtime.clone(),
                stopping: stopping.clone(),
            };
            let spawned = thread::Builder::new()
                .name(format!("tgb-webhook-{index}"))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => threads.push(handle),
                Err(err) => {
                    stopping.store(true, Ordering::SeqCst);
                    return Err(WebhookError::Task(format!("spawn worker thread: {err}")));
                }
            }
        }

        let task = tokio::task::spawn_blocking(move || {
            let mut panicked = 0;
            for handle in threads {
                if handle.join().is_err() {
                    panicked += 1;
                }
            }
            if panicked > 0 {
                Err(format!("{panicked} worker thread(s) panicked"))
            } else {
                Ok(())
            }
        });
        self.lifecycle.install(
            Running {
                addr: bound,
                shutdown: Box::new(move || {
                    stopping.store(true, Ordering::SeqCst);
                    server.unblock();
                }),
                task,
            },
            BACKEND,
        )
    }

    async fn stop(&self) -> Result<(), WebhookError> {
        self.lifecycle
            .stop(self.options.shutdown_timeout, BACKEND)
            .await
    }

    fn register_handler(&self, path: &str, ingress: WebhookIngress) -> Result<(), WebhookError> {
        self.routes.insert(path, ingress)
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.lifecycle.local_addr()
    }
}
