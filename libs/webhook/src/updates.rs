use anyhow::{Context, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use tgb_core::types::Update;
use tokio::sync::mpsc;

use crate::ingress::WebhookHandler;

/// Decodes every webhook body into an [`Update`] and forwards it on a
/// bounded channel. A full channel applies backpressure to the webhook
/// request; a body that is not an update fails the request.
#[derive(Clone)]
pub struct UpdateSink {
    tx: mpsc::Sender<Update>,
}

impl UpdateSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Update>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl WebhookHandler for UpdateSink {
    async fn handle(&self, body: Bytes) -> anyhow::Result<()> {
        let update: Update = serde_json::from_slice(&body).context("decode update")?;
        self.tx
            .send(update)
            .await
            .map_err(|_| anyhow!("update receiver closed"))
    }
}
