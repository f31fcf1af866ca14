use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};

use crate::ingress::{BoxError, IngressRejection, WebhookIngress, record_status};
use crate::server::WebhookError;

/// Path to ingress table shared between a server and its connections.
/// Registration may happen before or after the server started.
#[derive(Clone, Default)]
pub struct Routes {
    inner: Arc<RwLock<HashMap<String, Arc<WebhookIngress>>>>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, ingress: WebhookIngress) -> Result<(), WebhookError> {
        if !path.starts_with('/') {
            return Err(WebhookError::InvalidPath(path.to_string()));
        }
        let mut routes = self
            .inner
            .write()
            .map_err(|_| WebhookError::Poisoned)?;
        if routes.contains_key(path) {
            return Err(WebhookError::DuplicatePath(path.to_string()));
        }
        routes.insert(path.to_string(), Arc::new(ingress));
        tracing::info!(event = "webhook_route", action = "registered", path = %path);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<Arc<WebhookIngress>> {
        self.inner.read().ok()?.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|routes| routes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks the path up and runs the shared ingress cycle.
    pub async fn dispatch<R, Fut, E>(
        &self,
        path: &str,
        method: &Method,
        headers: &HeaderMap,
        read_body: R,
    ) -> StatusCode
    where
        R: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
        E: Into<BoxError>,
    {
        match self.get(path) {
            Some(ingress) => ingress.respond(method, headers, read_body).await,
            None => {
                let rejection = IngressRejection::NotFound(path.to_string());
                tracing::debug!(event = "webhook_request", path = %path, "{rejection}");
                record_status(rejection.status());
                rejection.status()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingress::handler_fn;
    use std::convert::Infallible;
    use tracing_test::traced_test;

    fn ingress() -> WebhookIngress {
        WebhookIngress::new(handler_fn(|_body| async { Ok(()) }))
    }

    async fn body() -> Result<Bytes, Infallible> {
        Ok(Bytes::from_static(b"{}"))
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let routes = Routes::new();
        routes.insert("/bot-a", ingress()).unwrap();
        let status = routes
            .dispatch("/bot-b", &Method::POST, &HeaderMap::new(), body)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let status = routes
            .dispatch("/bot-a", &Method::POST, &HeaderMap::new(), body)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn duplicate_and_relative_paths_are_rejected() {
        let routes = Routes::new();
        routes.insert("/hook", ingress()).unwrap();
        assert!(matches!(
            routes.insert("/hook", ingress()),
            Err(WebhookError::DuplicatePath(_))
        ));
        assert!(matches!(
            routes.insert("hook", ingress()),
            Err(WebhookError::InvalidPath(_))
        ));
        assert_eq!(routes.len(), 1);
    }

    #[traced_test]
    #[test]
    fn registration_is_logged() {
        let routes = Routes::new();
        routes.insert("/bots/alpha", ingress()).unwrap();
        assert!(logs_contain("webhook_route"));
        assert!(logs_contain("/bots/alpha"));
    }
}
