//! Authentication and dispatch shared by every webhook backend.
//!
//! A backend only translates its native request into
//! `(method, headers, body reader)` and writes back the returned status.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use http::{HeaderMap, Method, StatusCode};
use metrics::counter;
use subtle::ConstantTimeEq;
use tgb_core::log::{SharedLogger, TracingLogger};
use thiserror::Error;

pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// User logic invoked with the raw update body.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn handle(&self, body: Bytes) -> anyhow::Result<()>;
}

/// Adapts an async closure into a [`WebhookHandler`].
pub struct HandlerFn<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Bytes) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> WebhookHandler for HandlerFn<F>
where
    F: Fn(Bytes) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle(&self, body: Bytes) -> anyhow::Result<()> {
        (self.0)(body).await
    }
}

/// Why an inbound request did not reach a successful handler run.
#[derive(Debug, Error)]
pub enum IngressRejection {
    #[error("no webhook registered for path {0}")]
    NotFound(String),
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),
    #[error("secret token mismatch")]
    Unauthorized,
    #[error("read request body")]
    BodyRead(#[source] BoxError),
    #[error("handler failed")]
    Handler(#[source] anyhow::Error),
}

impl IngressRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            IngressRejection::NotFound(_) => StatusCode::NOT_FOUND,
            IngressRejection::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            IngressRejection::Unauthorized => StatusCode::UNAUTHORIZED,
            IngressRejection::BodyRead(_) | IngressRejection::Handler(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// One webhook endpoint: optional secret, handler and logger.
#[derive(Clone)]
pub struct WebhookIngress {
    secret_token: Option<String>,
    handler: Arc<dyn WebhookHandler>,
    logger: SharedLogger,
}

impl std::fmt::Debug for WebhookIngress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookIngress")
            .field("secret_token", &self.secret_token.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl WebhookIngress {
    pub fn new(handler: impl WebhookHandler + 'static) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    pub fn from_arc(handler: Arc<dyn WebhookHandler>) -> Self {
        Self {
            secret_token: None,
            handler,
            logger: TracingLogger::shared("tgb_webhook"),
        }
    }

    pub fn with_secret_token(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.secret_token = (!secret.is_empty()).then_some(secret);
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Method and secret checks. Runs before anything reads the body.
    pub fn authorize(&self, method: &Method, headers: &HeaderMap) -> Result<(), IngressRejection> {
        if *method != Method::POST {
            return Err(IngressRejection::MethodNotAllowed(method.clone()));
        }
        if let Some(expected) = &self.secret_token {
            let provided = headers
                .get(SECRET_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            if !constant_time_eq(expected, provided) {
                return Err(IngressRejection::Unauthorized);
            }
        }
        Ok(())
    }

    /// Full request cycle. `read_body` is only polled once authorization
    /// passed; the handler only runs once the whole body has been read.
    pub async fn process<R, Fut, E>(
        &self,
        method: &Method,
        headers: &HeaderMap,
        read_body: R,
    ) -> Result<(), IngressRejection>
    where
        R: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
        E: Into<BoxError>,
    {
        self.authorize(method, headers)?;
        let body = read_body()
            .await
            .map_err(|err| IngressRejection::BodyRead(err.into()))?;
        match AssertUnwindSafe(self.handler.handle(body))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(IngressRejection::Handler(err)),
            Err(panic) => Err(IngressRejection::Handler(anyhow::anyhow!(
                "handler panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }

    /// [`WebhookIngress::process`] mapped to a status code, with the
    /// rejection detail sent to the logger only.
    pub async fn respond<R, Fut, E>(
        &self,
        method: &Method,
        headers: &HeaderMap,
        read_body: R,
    ) -> StatusCode
    where
        R: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
        E: Into<BoxError>,
    {
        let status = match self.process(method, headers, read_body).await {
            Ok(()) => StatusCode::OK,
            Err(rejection) => {
                log_rejection(&self.logger, &rejection);
                rejection.status()
            }
        };
        record_status(status);
        status
    }
}

fn log_rejection(logger: &SharedLogger, rejection: &IngressRejection) {
    match rejection {
        IngressRejection::BodyRead(err) => logger.error(&format!("{rejection}: {err}")),
        IngressRejection::Handler(err) => logger.error(&format!("{rejection}: {err:#}")),
        other => logger.debug(&other.to_string()),
    }
}

pub(crate) fn record_status(status: StatusCode) {
    counter!("tgb_webhook_requests_total", "status" => status.as_str().to_string()).increment(1);
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use std::io;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tgb_core::log::Logger;

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl WebhookHandler for Counting {
        async fn handle(&self, _body: Bytes) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("database unavailable");
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Lines(Mutex<Vec<String>>);

    impl Logger for Lines {
        fn debug(&self, message: &str) {
            self.0.lock().unwrap().push(format!("debug {message}"));
        }

        fn error(&self, message: &str) {
            self.0.lock().unwrap().push(format!("error {message}"));
        }
    }

    fn secret_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SECRET_TOKEN_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    async fn ok_body() -> Result<Bytes, io::Error> {
        Ok(Bytes::from_static(br#"{"update_id":1}"#))
    }

    #[tokio::test]
    async fn accepts_post_with_secret() {
        let handler = Arc::new(Counting::default());
        let ingress = WebhookIngress::from_arc(handler.clone()).with_secret_token("s3cret");
        let status = ingress
            .respond(&Method::POST, &secret_headers("s3cret"), ok_body)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn secret_is_checked_before_the_body_is_read() {
        let handler = Arc::new(Counting::default());
        let ingress = WebhookIngress::from_arc(handler.clone()).with_secret_token("s3cret");
        let body_read = AtomicBool::new(false);
        let status = ingress
            .respond(&Method::POST, &secret_headers("wrong"), || async {
                body_read.store(true, Ordering::SeqCst);
                ok_body().await
            })
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!body_read.load(Ordering::SeqCst));
        let status = ingress
            .respond(&Method::POST, &HeaderMap::new(), ok_body)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_post_is_rejected() {
        let handler = Arc::new(Counting::default());
        let ingress = WebhookIngress::from_arc(handler.clone());
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let status = ingress.respond(&method, &HeaderMap::new(), ok_body).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        }
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn body_read_failure_skips_handler() {
        let handler = Arc::new(Counting::default());
        let ingress = WebhookIngress::from_arc(handler.clone());
        let status = ingress
            .respond(&Method::POST, &HeaderMap::new(), || async {
                Err::<Bytes, _>(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            })
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_failure_is_logged_not_returned() {
        let lines = Arc::new(Lines::default());
        let ingress = WebhookIngress::new(Counting {
            fail: true,
            ..Default::default()
        })
        .with_logger(lines.clone());
        let status = ingress
            .respond(&Method::POST, &HeaderMap::new(), ok_body)
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let lines = lines.0.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("error handler failed"));
        assert!(lines[0].contains("database unavailable"));
    }

    #[tokio::test]
    async fn handler_panic_becomes_500() {
        fn explode() -> anyhow::Result<()> {
            panic!("boom")
        }
        let lines = Arc::new(Lines::default());
        let ingress =
            WebhookIngress::new(handler_fn(|_body| async { explode() })).with_logger(lines.clone());
        let status = ingress
            .respond(&Method::POST, &HeaderMap::new(), ok_body)
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(lines.0.lock().unwrap()[0].contains("handler panicked: boom"));
    }

    #[tokio::test]
    async fn raw_body_reaches_the_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let ingress = WebhookIngress::new(handler_fn({
            let seen = seen.clone();
            move |body: Bytes| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(body);
                    Ok(())
                }
            }
        }));
        ingress
            .respond(&Method::POST, &HeaderMap::new(), ok_body)
            .await;
        assert_eq!(seen.lock().unwrap()[0].as_ref(), br#"{"update_id":1}"#);
    }

    #[test]
    fn empty_secret_disables_the_check() {
        let ingress = WebhookIngress::new(Counting::default()).with_secret_token("");
        assert!(ingress.authorize(&Method::POST, &HeaderMap::new()).is_ok());
    }
}
