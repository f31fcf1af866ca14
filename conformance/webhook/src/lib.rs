//! Harness for running the same webhook scenarios against every backend over
//! real sockets.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use bytes::Bytes;
use tgb_webhook::{Backend, MultiBot, SECRET_TOKEN_HEADER, ServerOptions, WebhookHandler, WebhookIngress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Accept,
    Fail,
    Panic,
}

/// Handler that records every body it sees.
#[derive(Clone)]
pub struct Recorder {
    behaviour: Behaviour,
    bodies: Arc<Mutex<Vec<Bytes>>>,
}

impl Recorder {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            bodies: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.bodies.lock().map(|bodies| bodies.len()).unwrap_or_default()
    }

    pub fn bodies(&self) -> Vec<Bytes> {
        self.bodies.lock().map(|bodies| bodies.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl WebhookHandler for Recorder {
    async fn handle(&self, body: Bytes) -> Result<()> {
        self.bodies
            .lock()
            .map_err(|_| anyhow!("recorder poisoned"))?
            .push(body);
        match self.behaviour {
            Behaviour::Accept => Ok(()),
            Behaviour::Fail => bail!("handler refused the update"),
            Behaviour::Panic => panic!("handler blew up"),
        }
    }
}

/// A started server plus a client pointed at it.
pub struct Harness {
    pub backend: Backend,
    pub bot: MultiBot,
    pub client: reqwest::Client,
    addr: SocketAddr,
}

impl Harness {
    /// Registers `routes` and starts `backend` on an ephemeral port.
    pub async fn start(backend: Backend, routes: Vec<(&str, WebhookIngress)>) -> Result<Self> {
        let bot = MultiBot::new(backend.server(ServerOptions::default()));
        for (path, ingress) in routes {
            bot.register_handler(path, ingress)?;
        }
        bot.start(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = bot
            .local_addr()
            .ok_or_else(|| anyhow!("{backend} reported no address after start"))?;
        Ok(Self {
            backend,
            bot,
            client: reqwest::Client::new(),
            addr,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POSTs `body` to `path`, with the secret header when given.
    pub async fn post(&self, path: &str, secret: Option<&str>, body: &str) -> Result<u16> {
        let mut request = self.client.post(self.url(path)).body(body.to_string());
        if let Some(secret) = secret {
            request = request.header(SECRET_TOKEN_HEADER, secret);
        }
        Ok(request.send().await?.status().as_u16())
    }

    pub async fn shutdown(self) -> Result<()> {
        self.bot.stop().await?;
        Ok(())
    }
}

pub fn ingress(recorder: &Recorder, secret: Option<&str>) -> WebhookIngress {
    let ingress = WebhookIngress::new(recorder.clone());
    match secret {
        Some(secret) => ingress.with_secret_token(secret),
        None => ingress,
    }
}
