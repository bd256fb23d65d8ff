//! Out-of-band alerts to a human channel.
//!
//! Delivery is best effort. [`dispatch`] runs the send on its own task and
//! logs failures; nothing here can change a pipeline outcome.

use askrc_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// One alert message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    /// Channel label (e.g. "slack")
    pub channel: String,
    pub title: String,
    pub body: String,
    /// Original question, appended as a quoted block when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        channel: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            title: title.into(),
            body: body.into(),
            question: None,
            raised_at: Utc::now(),
        }
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        let question = question.into();
        if !question.trim().is_empty() {
            self.question = Some(question);
        }
        self
    }

    /// Chat-markdown rendering: bold title, body, optional quoted question.
    pub fn to_text(&self) -> String {
        let mut text = format!("*{}*\n{}", self.title, self.body);
        if let Some(ref question) = self.question {
            text.push_str("\n\n*User Question:*\n");
            let quoted: Vec<String> = question.lines().map(|line| format!(">{}", line)).collect();
            text.push_str(&quoted.join("\n"));
        }
        text
    }
}

/// Alert sink.
///
/// Wrapping a notifier (queueing, retrying, fanning out) needs no change to
/// callers since the pipeline only sees `Arc<dyn Notifier>`.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, alert: &Alert) -> AppResult<()>;
}

/// Send `alert` on a background task. Failures are logged, never returned.
pub fn dispatch(notifier: Arc<dyn Notifier>, alert: Alert) -> JoinHandle<()> {
    let task = async move {
        match notifier.notify(&alert).await {
            Ok(()) => tracing::info!(
                notifier = notifier.name(),
                title = %alert.title,
                "Alert sent"
            ),
            Err(e) => tracing::warn!(
                notifier = notifier.name(),
                title = %alert.title,
                "Failed to send alert: {}",
                e
            ),
        }
    };

    tokio::spawn(task.in_current_span())
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    text: String,
}

/// Incoming-webhook notifier (Slack and compatible chat services).
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> AppResult<Self> {
        let webhook_url = webhook_url.into();
        if webhook_url.trim().is_empty() {
            return Err(AppError::Config(
                "Slack webhook URL is not configured properly".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Notification(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            webhook_url,
            client,
        })
    }

    fn payload(alert: &Alert) -> WebhookPayload {
        WebhookPayload {
            text: alert.to_text(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn notify(&self, alert: &Alert) -> AppResult<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&Self::payload(alert))
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("Failed to reach webhook: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Notification(format!(
                "Webhook rejected alert ({}): {}",
                status, error_text
            )));
        }

        Ok(())
    }
}

/// Notifier that only writes alerts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, alert: &Alert) -> AppResult<()> {
        tracing::warn!(
            channel = %alert.channel,
            title = %alert.title,
            question = alert.question.as_deref().unwrap_or(""),
            "ALERT: {}",
            alert.body
        );
        Ok(())
    }
}
