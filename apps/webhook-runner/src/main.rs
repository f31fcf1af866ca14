//! Serves the webhooks of every configured bot from one HTTP server.
//!
//! Each bot gets its own route and secret on a shared [`MultiBot`] server.
//! Once the server listens, the runner points every bot's webhook at it and
//! logs the updates that arrive until ctrl-c.

mod config;
mod reconciler;

use anyhow::{Context, Result};
use std::path::Path;
use tgb_client::{Bot, BotConfig};
use tgb_core::types::Update;
use tgb_webhook::{MultiBot, ServerOptions, UpdateSink, WebhookIngress};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{BotEntry, RunnerConfig, load_bots};
use crate::reconciler::{BotSecret, ReconcileResult, reconcile_bot};

const UPDATE_BUFFER: usize = 256;

struct PreparedBot {
    entry: BotEntry,
    bot: Bot,
    secret: BotSecret,
}

#[tokio::main]
async fn main() -> Result<()> {
    tgb_telemetry::install("tgb-webhook-runner", env!("CARGO_PKG_VERSION"))?;

    let config = RunnerConfig::from_env()?;
    let entries = load_bots(Path::new(&config.bots_file))?;
    let server = MultiBot::new(config.backend.server(ServerOptions::default()));

    let mut prepared = Vec::with_capacity(entries.len());
    for entry in entries {
        let bot_config = BotConfig::from_token_env(&entry.token_env)
            .with_context(|| format!("token for bot {}", entry.id))?;
        let bot = Bot::new(bot_config).with_context(|| format!("http client for bot {}", entry.id))?;
        let secret = BotSecret::for_entry(&entry);

        let (sink, updates) = UpdateSink::channel(UPDATE_BUFFER);
        server.register_handler(
            &entry.path(),
            WebhookIngress::new(sink).with_secret_token(secret.value()),
        )?;
        tokio::spawn(log_updates(entry.id.clone(), updates));
        prepared.push(PreparedBot { entry, bot, secret });
    }

    server.start(config.bind).await?;
    info!(
        event = "runner_started",
        backend = %config.backend,
        addr = ?server.local_addr(),
        bots = prepared.len(),
    );

    let mut failed = 0usize;
    for PreparedBot { entry, bot, secret } in &prepared {
        if reconcile_bot(bot, entry, &config.public_webhook_base, secret).await
            == ReconcileResult::Error
        {
            failed += 1;
        }
    }
    if failed > 0 {
        warn!(
            event = "runner_reconcile",
            failed, "some webhooks could not be registered; their routes stay up"
        );
    }

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    info!(event = "runner_stopping");
    server.stop().await?;
    Ok(())
}

async fn log_updates(bot_id: String, mut updates: mpsc::Receiver<Update>) {
    while let Some(update) = updates.recv().await {
        info!(
            event = "update",
            bot = %bot_id,
            update_id = update.update_id,
            kind = update.kind(),
            chat_id = ?update.chat_id(),
        );
    }
}
