use std::convert::Infallible;
use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

use super::{ACCEPT_ERROR_BACKOFF, Lifecycle, Running};
use crate::ingress::{BoxError, WebhookIngress};
use crate::routes::Routes;
use crate::server::{ServerOptions, WebhookError, WebhookServer};

const BACKEND: &str = "hyper";

/// Bare `hyper` HTTP/1 server: one task per connection on the tokio event
/// loop.
pub struct HyperServer {
    routes: Routes,
    options: ServerOptions,
    lifecycle: Lifecycle,
}

impl HyperServer {
    pub fn new(options: ServerOptions) -> Self {
        Self {
            routes: Routes::new(),
            options,
            lifecycle: Lifecycle::default(),
        }
    }
}

pub(crate) async fn serve<B>(routes: Routes, request: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let (parts, body) = request.into_parts();
    let status = routes
        .dispatch(parts.uri.path(), &parts.method, &parts.headers, || async move {
            body.collect().await.map(|collected| collected.to_bytes())
        })
        .await;
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

async fn accept_loop(listener: TcpListener, routes: Routes, mut shutdown: watch::Receiver<bool>) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        tracing::warn!(event = "webhook_server", backend = BACKEND, error = %err, "accept failed");
                        if back_off(&mut shutdown).await {
                            break;
                        }
                        continue;
                    }
                };
                let routes = routes.clone();
                let mut shutdown = shutdown.clone();
                connections.spawn(async move {
                    let service = service_fn(move |request| {
                        let routes = routes.clone();
                        async move { Ok::<_, Infallible>(serve(routes, request).await) }
                    });
                    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                    let mut conn = std::pin::pin!(conn);
                    let result = tokio::select! {
                        result = conn.as_mut() => result,
                        _ = shutdown.changed() => {
                            conn.as_mut().graceful_shutdown();
                            conn.await
                        }
                    };
                    if let Err(err) = result {
                        tracing::debug!(backend = BACKEND, peer = %peer, error = %err, "connection closed with error");
                    }
                });
            }
            _ = shutdown.changed() => break,
        }
    }
    drop(listener);
    while connections.join_next().await.is_some() {}
}

/// Waits out an accept error. Returns true when shutdown was requested
/// meanwhile.
async fn back_off(shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => false,
        _ = shutdown.changed() => true,
    }
}

#[async_trait]
impl WebhookServer for HyperServer {
    async fn start(&self, addr: SocketAddr) -> Result<(), WebhookError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| WebhookError::Bind { addr, source })?;
        let bound = listener
            .local_addr()
            .map_err(|source| WebhookError::Bind { addr, source })?;
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn({
            let routes = self.routes.clone();
            async move {
                accept_loop(listener, routes, rx).await;
                Ok(())
            }
        });
        self.lifecycle.install(
            Running {
                addr: bound,
                shutdown: Box::new(move || {
                    let _ = tx.send(true);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingress::handler_fn;
    use futures::stream;
    use http::StatusCode;
    use http_body_util::StreamBody;
    use hyper::body::Frame;
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn routes(calls: Arc<AtomicUsize>) -> Routes {
        let routes = Routes::new();
        routes
            .insert(
                "/hook",
                WebhookIngress::new(handler_fn(move |_body| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })),
            )
            .unwrap();
        routes
    }

    #[tokio::test]
    async fn full_body_is_dispatched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let request = Request::post("/hook")
            .body(Full::new(Bytes::from_static(b"{}")))
            .unwrap();
        let response = serve(routes(calls.clone()), request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn body_read_error_is_500() {
        let calls = Arc::new(AtomicUsize::new(0));
        let frames: Vec<Result<Frame<Bytes>, io::Error>> = vec![
            Ok(Frame::data(Bytes::from_static(b"{"))),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let request = Request::post("/hook")
            .body(StreamBody::new(stream::iter(frames)))
            .unwrap();
        let response = serve(routes(calls.clone()), request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn accept_error_backs_off_before_retrying() {
        let (_tx, mut rx) = watch::channel(false);
        let started = tokio::time::Instant::now();
        assert!(!back_off(&mut rx).await);
        assert!(started.elapsed() >= ACCEPT_ERROR_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn accept_back_off_ends_on_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        let started = tokio::time::Instant::now();
        assert!(back_off(&mut rx).await);
        assert!(started.elapsed() < ACCEPT_ERROR_BACKOFF);
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let server = HyperServer::new(ServerOptions::default());
        server.start("127.0.0.1:0".parse().unwrap()).await.unwrap();
        assert!(server.local_addr().is_some());
        assert!(matches!(
            server.start("127.0.0.1:0".parse().unwrap()).await,
            Err(WebhookError::AlreadyRunning)
        ));
        server.stop().await.unwrap();
        assert!(server.local_addr().is_none());
    }
}
