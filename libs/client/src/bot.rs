use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::{Method, Request};
use metrics::counter;
use tgb_core::encode::encode_request;
use tgb_core::envelope::ApiEnvelope;
use tgb_core::error::{BotError, TransportError};
use tgb_core::http::HttpTransport;
use tgb_core::log::{SharedLogger, TracingLogger, redact_token};
use tgb_core::methods::{
    ApiMethod, DeleteWebhook, GetChatMember, GetMe, GetWebhookInfo, SendMessage, SetWebhook,
};
use tgb_core::types::{ChatId, ChatMember, Message, User, WebhookInfo};

use crate::config::BotConfig;
use crate::transport::ReqwestTransport;

/// Calls Bot API methods for one bot.
///
/// Each call encodes its parameters, POSTs them once and decodes the
/// envelope. Nothing is retried here: a `retry_after` hint is returned to the
/// caller inside [`tgb_core::ApiError`].
#[derive(Clone)]
pub struct Bot {
    config: Arc<BotConfig>,
    transport: Arc<dyn HttpTransport>,
    logger: SharedLogger,
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot").field("config", &self.config).finish()
    }
}

impl Bot {
    pub fn new(config: BotConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: BotConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            logger: TracingLogger::shared("tgb_client"),
        }
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub async fn call<M: ApiMethod>(&self, params: &M) -> Result<M::Response, BotError> {
        let outcome = self.execute(params).await;
        let label = match &outcome {
            Ok(_) => "ok",
            Err(BotError::Api(_)) => "api_error",
            Err(BotError::Transport(_)) => "transport_error",
            Err(BotError::Encode(_)) => "encode_error",
            Err(BotError::Decode(_)) => "decode_error",
        };
        counter!("tgb_api_calls_total", "method" => M::NAME, "outcome" => label).increment(1);
        if let Err(err) = &outcome {
            self.logger
                .error(&format!("{} failed: {}", M::NAME, describe(err)));
        }
        outcome
    }

    async fn execute<M: ApiMethod>(&self, params: &M) -> Result<M::Response, BotError> {
        let payload = encode_request(params, &params.attachments())?;
        let url = self.config.method_url(M::NAME);
        self.logger.debug(&format!(
            "POST {} content_type={} bytes={}",
            redact_token(&url, &self.config.token),
            payload.content_type,
            payload.body.len()
        ));

        let request = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header(CONTENT_TYPE, payload.content_type)
            .body(payload.body)
            .map_err(TransportError::Request)?;
        let response = self.transport.execute(request).await?;

        if response.status.as_u16() >= 500 {
            return Err(TransportError::Status {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            }
            .into());
        }
        ApiEnvelope::parse(&response.body)?.into_result_with(M::decode_result)
    }

    pub async fn get_me(&self) -> Result<User, BotError> {
        self.call(&GetMe::default()).await
    }

    pub async fn send_message(
        &self,
        chat_id: impl Into<ChatId>,
        text: impl Into<String>,
    ) -> Result<Message, BotError> {
        self.call(&SendMessage::new(chat_id, text)).await
    }

    pub async fn get_chat_member(
        &self,
        chat_id: impl Into<ChatId>,
        user_id: i64,
    ) -> Result<ChatMember, BotError> {
        self.call(&GetChatMember {
            chat_id: chat_id.into(),
            user_id,
        })
        .await
    }

    pub async fn get_webhook_info(&self) -> Result<WebhookInfo, BotError> {
        self.call(&GetWebhookInfo::default()).await
    }

    pub async fn set_webhook(&self, params: &SetWebhook) -> Result<bool, BotError> {
        self.call(params).await
    }

    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<bool, BotError> {
        self.call(&DeleteWebhook {
            drop_pending_updates: Some(drop_pending_updates),
        })
        .await
    }
}

fn describe(err: &BotError) -> String {
    use std::error::Error as _;

    match err {
        BotError::Api(api) => api.to_string(),
        other => {
            let mut text = other.to_string();
            let mut source = other.source();
            while let Some(inner) = source {
                text.push_str(": ");
                text.push_str(&inner.to_string());
                source = inner.source();
            }
            text
        }
    }
}
