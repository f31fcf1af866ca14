use std::net::SocketAddr;

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use http_body_util::BodyExt;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use super::{Lifecycle, Running};
use crate::ingress::WebhookIngress;
use crate::routes::Routes;
use crate::server::{ServerOptions, WebhookError, WebhookServer};

const BACKEND: &str = "axum";

/// Path multiplexer on `axum`. Every registered path is served by one
/// fallback handler, so paths can be added while the server runs.
pub struct AxumServer {
    routes: Routes,
    options: ServerOptions,
    lifecycle: Lifecycle,
}

impl AxumServer {
    pub fn new(options: ServerOptions) -> Self {
        Self {
            routes: Routes::new(),
            options,
            lifecycle: Lifecycle::default(),
        }
    }

    /// Router serving the registered webhooks, for mounting into an
    /// application that runs its own listener.
    pub fn router(&self) -> Router {
        router(self.routes.clone())
    }
}

pub fn router(routes: Routes) -> Router {
    Router::new().fallback(handle).with_state(routes)
}

async fn handle(State(routes): State<Routes>, request: Request) -> StatusCode {
    let (parts, body) = request.into_parts();
    routes
        .dispatch(parts.uri.path(), &parts.method, &parts.headers, || async move {
            body.collect().await.map(|collected| collected.to_bytes())
        })
        .await
}

#[async_trait]
impl WebhookServer for AxumServer {
    async fn start(&self, addr: SocketAddr) -> Result<(), WebhookError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| WebhookError::Bind { addr, source })?;
        let bound = listener
            .local_addr()
            .map_err(|source| WebhookError::Bind { addr, source })?;
        let (tx, rx) = oneshot::channel::<()>();
        let app = self.router();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    rx.await.ok();
                })
                .await
                .map_err(|err| err.to_string())
        });
        self.lifecycle.install(
            Running {
                addr: bound,
                shutdown: Box::new(move || {
                    let _ = tx.send(());
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
    use crate::ingress::{SECRET_TOKEN_HEADER, handler_fn};
    use axum::body::Body;
    use bytes::Bytes;
    use futures::stream;
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn counting_server(calls: Arc<AtomicUsize>) -> AxumServer {
        let server = AxumServer::new(ServerOptions::default());
        server
            .register_handler(
                "/hook",
                WebhookIngress::new(handler_fn(move |_body| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }))
                .with_secret_token("s3cret"),
            )
            .unwrap();
        server
    }

    #[tokio::test]
    async fn mounted_router_serves_registered_paths() {
        let calls = Arc::new(AtomicUsize::new(0));
        let server = counting_server(calls.clone());

        let response = server
            .router()
            .oneshot(
                axum::http::Request::post("/hook")
                    .header(SECRET_TOKEN_HEADER, "s3cret")
                    .body(Body::from(r#"{"update_id":1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = server
            .router()
            .oneshot(axum::http::Request::post("/other").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn body_stream_error_is_500() {
        let calls = Arc::new(AtomicUsize::new(0));
        let server = counting_server(calls.clone());
        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"upd")),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "client went away")),
        ];
        let response = server
            .router()
            .oneshot(
                axum::http::Request::post("/hook")
                    .header(SECRET_TOKEN_HEADER, "s3cret")
                    .body(Body::from_stream(stream::iter(chunks)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stop_before_start_is_an_error() {
        let server = AxumServer::new(ServerOptions::default());
        assert!(matches!(server.stop().await, Err(WebhookError::NotRunning)));
    }
}
