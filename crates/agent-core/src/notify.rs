//! Run notifications for the surrounding application.
//!
//! Exactly one [`RunEvent`] is emitted per run. Delivery is fire-and-forget: a notifier never
//! fails the run, it only logs.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{info, warn};

use crate::{errors::AgentError, payload::ListingPayload};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    RunSucceeded,
    RunFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    #[serde(rename = "event")]
    pub kind: RunEventKind,
    pub marketplace: String,
    /// Echo of the payload the run was started with.
    pub listing: ListingPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub iterations: u32,
    pub emitted_at: DateTime<Utc>,
}

#[async_trait]
pub trait RunNotifier: Send + Sync {
    async fn notify(&self, event: RunEvent);

    /// Wait for deliveries still in flight. Called before the process exits.
    async fn flush(&self) {}
}

/// Writes run events to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl RunNotifier for LogNotifier {
    async fn notify(&self, event: RunEvent) {
        match event.kind {
            RunEventKind::RunSucceeded => info!(
                marketplace = %event.marketplace,
                url = event.url.as_deref().unwrap_or_default(),
                iterations = event.iterations,
                title = %event.listing.title,
                "listing run succeeded"
            ),
            RunEventKind::RunFailed => warn!(
                marketplace = %event.marketplace,
                error = event.error.as_deref().unwrap_or_default(),
                iterations = event.iterations,
                title = %event.listing.title,
                "listing run failed"
            ),
        }
    }
}

/// Posts run events as JSON to a configured URL on a background task.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, AgentError> {
        let url = url.into();
        url::Url::parse(&url)
            .map_err(|err| AgentError::config(format!("invalid webhook url {url}: {err}")))?;
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|err| AgentError::config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            url,
            pending: Mutex::new(Vec::new()),
        })
    }

    async fn deliver(client: Client, url: String, event: RunEvent) {
        let result = client.post(&url).json(&event).send().await;
        match result {
            Ok(response) if response.status().is_success() => {
                info!(target: "notify", %url, "webhook delivered");
            }
            Ok(response) => {
                warn!(target: "notify", %url, status = response.status().as_u16(), "webhook rejected");
            }
            Err(err) => warn!(target: "notify", %url, %err, "webhook delivery failed"),
        }
    }
}

#[async_trait]
impl RunNotifier for WebhookNotifier {
    async fn notify(&self, event: RunEvent) {
        let task = tokio::spawn(Self::deliver(self.client.clone(), self.url.clone(), event));
        self.pending.lock().await.push(task);
    }

    async fn flush(&self) {
        let tasks: Vec<_> = self.pending.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(err) = task.await {
                warn!(target: "notify", %err, "webhook task aborted");
            }
        }
    }
}

/// Forwards every event to each inner notifier in turn.
#[derive(Default, Clone)]
pub struct FanoutNotifier {
    notifiers: Vec<Arc<dyn RunNotifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn RunNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }
}

#[async_trait]
impl RunNotifier for FanoutNotifier {
    async fn notify(&self, event: RunEvent) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone()).await;
        }
    }

    async fn flush(&self) {
        for notifier in &self.notifiers {
            notifier.flush().await;
        }
    }
}
