//! Best-effort cache invalidation for the companion frontend.
//!
//! Handlers hand a [`Invalidation`] to the [`Revalidator`] and move on. A single
//! background task drains the queue; each call to the frontend is bounded by a
//! timeout and its failure is only logged.

use serde::Serialize;
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle};
use url::Url;

const QUEUE_CAPACITY: usize = 64;
pub const SECRET_HEADER: &str = "x-revalidate-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    Events,
    Clubs,
}

impl Invalidation {
    fn tag(self) -> &'static str {
        match self {
            Invalidation::Events => "events",
            Invalidation::Clubs => "clubs",
        }
    }
}

#[derive(Serialize)]
struct RevalidateBody<'a> {
    tags: [&'a str; 1],
}

#[derive(Clone, Default)]
pub struct Revalidator {
    tx: Option<mpsc::Sender<Invalidation>>,
}

impl Revalidator {
    /// Drops every notification; used when no frontend is configured.
    pub fn disabled() -> Self {
        Revalidator { tx: None }
    }

    pub fn spawn(target: Url, secret: Option<String>, timeout: Duration) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let worker = Worker {
            client: reqwest::Client::new(),
            target,
            secret,
            timeout,
        };
        let handle = tokio::spawn(worker.run(rx));
        (Revalidator { tx: Some(tx) }, handle)
    }

    /// Never waits; a full queue drops the notification.
    pub fn notify(&self, what: Invalidation) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.try_send(what) {
            tracing::warn!(tag = what.tag(), error = %e, "dropping frontend revalidation");
        }
    }
}

struct Worker {
    client: reqwest::Client,
    target: Url,
    secret: Option<String>,
    timeout: Duration,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<Invalidation>) {
        while let Some(what) = rx.recv().await {
            match tokio::time::timeout(self.timeout, self.send(what)).await {
                Ok(Ok(())) => tracing::debug!(tag = what.tag(), "frontend revalidated"),
                Ok(Err(e)) => {
                    tracing::warn!(tag = what.tag(), error = %e, "frontend revalidation failed")
                }
                Err(_) => tracing::warn!(tag = what.tag(), "frontend revalidation timed out"),
            }
        }
    }

    async fn send(&self, what: Invalidation) -> reqwest::Result<()> {
        let mut request = self
            .client
            .post(self.target.clone())
            .json(&RevalidateBody { tags: [what.tag()] });
        if let Some(secret) = &self.secret {
            request = request.header(SECRET_HEADER, secret);
        }
        request.send().await?.error_for_status()?;
        Ok(())
    }
}
