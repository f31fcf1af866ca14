//! Runner configuration: process settings from the environment and the bot
//! list from a YAML file.

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::{env, fs, net::SocketAddr, path::Path};
use tgb_webhook::Backend;

#[derive(Debug, Clone, Deserialize)]
pub struct BotEntry {
    pub id: String,
    /// Environment variable holding the bot token.
    pub token_env: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub secret_token: Option<String>,
    #[serde(default = "default_allowed_updates_opt")]
    pub allowed_updates: Option<Vec<String>>,
    #[serde(default = "default_drop_pending_opt")]
    pub drop_pending_on_first_install: Option<bool>,
}

impl BotEntry {
    /// Route of this bot on the shared server, `/<id>` unless configured.
    pub fn path(&self) -> String {
        match &self.path {
            Some(path) if path.starts_with('/') => path.clone(),
            Some(path) => format!("/{path}"),
            None => format!("/{}", self.id),
        }
    }

    pub fn allowed_updates(&self) -> Vec<String> {
        self.allowed_updates
            .clone()
            .unwrap_or_else(default_allowed_updates)
    }

    pub fn drop_pending_on_first_install(&self) -> bool {
        self.drop_pending_on_first_install
            .unwrap_or_else(default_drop_pending)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct BotsFile {
    bots: Vec<BotEntry>,
}

pub fn load_bots(path: &Path) -> Result<Vec<BotEntry>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read bots config {}", path.display()))?;
    let file: BotsFile = serde_yaml_bw::from_str(&raw)
        .with_context(|| format!("parse bots config {}", path.display()))?;
    if file.bots.is_empty() {
        bail!("bots config {} lists no bots", path.display());
    }
    let mut seen = std::collections::HashSet::new();
    for bot in &file.bots {
        if !seen.insert(bot.path()) {
            bail!("bots {} share the webhook path {}", bot.id, bot.path());
        }
    }
    Ok(file.bots)
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub bind: SocketAddr,
    pub public_webhook_base: String,
    pub backend: Backend,
    pub bots_file: String,
}

impl RunnerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup("BIND")
            .unwrap_or_else(|| "0.0.0.0:8080".into())
            .parse()
            .context("parse BIND")?;
        let public_webhook_base = lookup("PUBLIC_WEBHOOK_BASE")
            .filter(|v| !v.trim().is_empty())
            .context("PUBLIC_WEBHOOK_BASE must be set")?;
        let backend = lookup("WEBHOOK_BACKEND")
            .map(|v| v.parse::<Backend>().map_err(|err| anyhow!(err)))
            .transpose()?
            .unwrap_or_default();
        let bots_file = lookup("BOTS_FILE").unwrap_or_else(|| "bots.yaml".into());
        Ok(Self {
            bind,
            public_webhook_base,
            backend,
            bots_file,
        })
    }
}

fn default_allowed_updates() -> Vec<String> {
    vec!["message".into(), "callback_query".into()]
}

fn default_allowed_updates_opt() -> Option<Vec<String>> {
    Some(default_allowed_updates())
}

fn default_drop_pending() -> bool {
    true
}

fn default_drop_pending_opt() -> Option<bool> {
    Some(default_drop_pending())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn load_from_file_parses_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bots.yaml");
        fs::write(
            &path,
            r#"
bots:
  - id: support
    token_env: SUPPORT_BOT_TOKEN
    secret_token: "s3cret"
    allowed_updates: ["message", "message_reaction"]
    drop_pending_on_first_install: false
  - id: alerts
    token_env: ALERTS_BOT_TOKEN
    path: hooks/alerts
"#,
        )
        .unwrap();

        let bots = load_bots(&path).expect("load bots from yaml");
        assert_eq!(bots.len(), 2);
        assert_eq!(bots[0].path(), "/support");
        assert_eq!(bots[0].secret_token.as_deref(), Some("s3cret"));
        assert_eq!(bots[0].allowed_updates(), vec!["message", "message_reaction"]);
        assert!(!bots[0].drop_pending_on_first_install());
        assert_eq!(bots[1].path(), "/hooks/alerts");
        assert_eq!(bots[1].allowed_updates(), vec!["message", "callback_query"]);
        assert!(bots[1].drop_pending_on_first_install());
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bots.yaml");
        fs::write(
            &path,
            "bots:\n  - id: a\n    token_env: A\n    path: /same\n  - id: b\n    token_env: B\n    path: /same\n",
        )
        .unwrap();
        let err = load_bots(&path).unwrap_err();
        assert!(err.to_string().contains("/same"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_bots(Path::new("/no/such/bots.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("/no/such/bots.yaml"));
    }

    #[test]
    fn runner_env_defaults() {
        let vars = HashMap::from([("PUBLIC_WEBHOOK_BASE", "https://bots.example.com")]);
        let cfg = RunnerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.backend, Backend::Axum);
        assert_eq!(cfg.bots_file, "bots.yaml");
    }

    #[test]
    fn runner_env_requires_public_base_and_known_backend() {
        assert!(RunnerConfig::from_lookup(|_| None).is_err());
        let vars = HashMap::from([
            ("PUBLIC_WEBHOOK_BASE", "https://bots.example.com"),
            ("WEBHOOK_BACKEND", "blocking"),
            ("BIND", "127.0.0.1:9000"),
        ]);
        let cfg = RunnerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.backend, Backend::Blocking);
        let vars = HashMap::from([
            ("PUBLIC_WEBHOOK_BASE", "https://bots.example.com"),
            ("WEBHOOK_BACKEND", "iis"),
        ]);
        assert!(RunnerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).is_err());
    }
}
