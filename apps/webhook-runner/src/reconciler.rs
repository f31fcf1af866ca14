use crate::config::BotEntry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use rand::{Rng, rng};
use tgb_client::Bot;
use tgb_core::methods::SetWebhook;
use tgb_core::types::WebhookInfo;
use tracing::{info, warn};

/// The two Bot API calls reconciliation needs.
#[async_trait]
pub trait WebhookApi: Send + Sync {
    async fn get_webhook_info(&self) -> Result<WebhookInfo>;
    async fn set_webhook(&self, params: &SetWebhook) -> Result<()>;
}

#[async_trait]
impl WebhookApi for Bot {
    async fn get_webhook_info(&self) -> Result<WebhookInfo> {
        Ok(Bot::get_webhook_info(self).await?)
    }

    async fn set_webhook(&self, params: &SetWebhook) -> Result<()> {
        Bot::set_webhook(self, params).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileResult {
    Applied,
    Noop,
    Error,
}

impl ReconcileResult {
    fn as_str(self) -> &'static str {
        match self {
            ReconcileResult::Applied => "applied",
            ReconcileResult::Noop => "noop",
            ReconcileResult::Error => "error",
        }
    }
}

/// Secret the webhook should carry. A configured secret is stable across
/// restarts; a generated one exists only for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotSecret {
    Configured(String),
    Generated(String),
}

impl BotSecret {
    pub fn for_entry(entry: &BotEntry) -> Self {
        match entry.secret_token.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => BotSecret::Configured(secret.to_string()),
            _ => BotSecret::Generated(generate_secret()),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            BotSecret::Configured(value) | BotSecret::Generated(value) => value,
        }
    }
}

pub async fn reconcile_bot<A>(
    api: &A,
    entry: &BotEntry,
    public_webhook_base: &str,
    secret: &BotSecret,
) -> ReconcileResult
where
    A: WebhookApi + ?Sized,
{
    let want_url = desired_webhook_url(public_webhook_base, &entry.path());
    match reconcile_inner(api, entry, &want_url, secret).await {
        Ok((result, current_url, drop_pending)) => {
            info!(
                event = "webhook_reconcile",
                bot = %entry.id,
                action = result.as_str(),
                want_url = %want_url,
                current_url = %current_url,
                drop_pending = drop_pending,
            );
            record_metric(result);
            result
        }
        Err(err) => {
            warn!(
                event = "webhook_reconcile",
                bot = %entry.id,
                action = "error",
                error = %format!("{err:#}")
            );
            record_metric(ReconcileResult::Error);
            ReconcileResult::Error
        }
    }
}

async fn reconcile_inner<A>(
    api: &A,
    entry: &BotEntry,
    want_url: &str,
    secret: &BotSecret,
) -> Result<(ReconcileResult, String, bool)>
where
    A: WebhookApi + ?Sized,
{
    let info = api
        .get_webhook_info()
        .await
        .with_context(|| format!("get webhook info for {}", entry.id))?;

    // Telegram never reports the secret, so a fresh one always has to be pushed.
    let secret_is_stable = matches!(secret, BotSecret::Configured(_));
    if secret_is_stable && !info.url.trim().is_empty() && urls_match(&info.url, want_url) {
        return Ok((ReconcileResult::Noop, info.url, false));
    }

    let drop_pending = info.url.is_empty() && entry.drop_pending_on_first_install();
    let mut params = SetWebhook::new(want_url);
    params.allowed_updates = entry.allowed_updates();
    params.secret_token = Some(secret.value().to_string());
    params.drop_pending_updates = drop_pending.then_some(true);
    api.set_webhook(&params)
        .await
        .with_context(|| format!("set webhook for {want_url}"))?;
    Ok((ReconcileResult::Applied, info.url, drop_pending))
}

fn record_metric(result: ReconcileResult) {
    counter!("tgb_webhook_reconciles_total", "result" => result.as_str()).increment(1);
}

pub fn desired_webhook_url(public_webhook_base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        public_webhook_base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn urls_match(current: &str, desired: &str) -> bool {
    current.trim_end_matches('/') == desired.trim_end_matches('/')
}

/// 32 characters from the alphabet Telegram accepts for secret tokens.
pub fn generate_secret() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut rng = rng();
    (0..32)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use tokio::sync::Mutex;

    struct MockApi {
        info: Result<WebhookInfo, String>,
        set_calls: Mutex<Vec<SetWebhook>>,
    }

    impl MockApi {
        fn new(info_url: &str) -> Self {
            Self {
                info: Ok(WebhookInfo {
                    url: info_url.to_string(),
                    ..WebhookInfo::default()
                }),
                set_calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                info: Err("Unauthorized".into()),
                set_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WebhookApi for MockApi {
        async fn get_webhook_info(&self) -> Result<WebhookInfo> {
            self.info.clone().map_err(|err| anyhow!(err))
        }

        async fn set_webhook(&self, params: &SetWebhook) -> Result<()> {
            self.set_calls.lock().await.push(params.clone());
            Ok(())
        }
    }

    fn entry(secret: Option<&str>) -> BotEntry {
        BotEntry {
            id: "support".into(),
            token_env: "SUPPORT_BOT_TOKEN".into(),
            path: None,
            secret_token: secret.map(str::to_string),
            allowed_updates: Some(vec!["message".into()]),
            drop_pending_on_first_install: Some(true),
        }
    }

    #[tokio::test]
    async fn first_install_sets_webhook_and_drops_pending() {
        let api = MockApi::new("");
        let entry = entry(Some("s3cret"));
        let secret = BotSecret::for_entry(&entry);
        let result = reconcile_bot(&api, &entry, "https://bots.example.com/", &secret).await;
        assert_eq!(result, ReconcileResult::Applied);

        let calls = api.set_calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "https://bots.example.com/support");
        assert_eq!(calls[0].secret_token.as_deref(), Some("s3cret"));
        assert_eq!(calls[0].allowed_updates, vec!["message".to_string()]);
        assert_eq!(calls[0].drop_pending_updates, Some(true));
    }

    #[tokio::test]
    async fn matching_url_with_configured_secret_is_noop() {
        let api = MockApi::new("https://bots.example.com/support/");
        let entry = entry(Some("s3cret"));
        let secret = BotSecret::for_entry(&entry);
        let result = reconcile_bot(&api, &entry, "https://bots.example.com", &secret).await;
        assert_eq!(result, ReconcileResult::Noop);
        assert!(api.set_calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn generated_secret_is_always_pushed() {
        let api = MockApi::new("https://bots.example.com/support");
        let entry = entry(None);
        let secret = BotSecret::for_entry(&entry);
        assert!(matches!(secret, BotSecret::Generated(_)));

        let result = reconcile_bot(&api, &entry, "https://bots.example.com", &secret).await;
        assert_eq!(result, ReconcileResult::Applied);
        let calls = api.set_calls.lock().await;
        assert_eq!(calls[0].secret_token.as_deref(), Some(secret.value()));
        // Not a first install, pending updates stay.
        assert_eq!(calls[0].drop_pending_updates, None);
    }

    #[tokio::test]
    async fn api_failure_reports_error() {
        let api = MockApi::failing();
        let entry = entry(Some("s3cret"));
        let secret = BotSecret::for_entry(&entry);
        let result = reconcile_bot(&api, &entry, "https://bots.example.com", &secret).await;
        assert_eq!(result, ReconcileResult::Error);
        assert!(api.set_calls.lock().await.is_empty());
    }

    #[test]
    fn blank_configured_secret_falls_back_to_generated() {
        let secret = BotSecret::for_entry(&entry(Some("   ")));
        assert!(matches!(secret, BotSecret::Generated(_)));
    }

    #[test]
    fn generated_secret_uses_allowed_alphabet() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 32);
        assert!(
            secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(secret, generate_secret());
    }

    #[test]
    fn url_helpers() {
        assert_eq!(
            desired_webhook_url("https://a.example/", "/hooks/b"),
            "https://a.example/hooks/b"
        );
        assert!(urls_match("https://a.example/x/", "https://a.example/x"));
        assert!(!urls_match("https://a.example/x", "https://a.example/y"));
    }
}
