//! Worker implementation for asynchronous Slack messaging.
//!
//! This module provides a worker that processes Slack actions one at a time
//! from a channel. Rate limiting and retries come from the `SlackNotifier` it
//! owns, so a burst of actions drains at the pace Slack accepts.

use error_stack::report;
use tokio::sync::mpsc::Receiver;

use crate::error::{Error, NotifierResult, ReportDisplayExt};

use super::{actions::SlackAction, notifier::SlackNotifier};

/// A worker that delivers Slack actions in arrival order.
///
/// Failed deliveries, after the notifier's retries, are logged and dropped so
/// one bad message never blocks the queue.
#[derive(Debug)]
pub struct SlackWorker {
    notifier: SlackNotifier,
    receiver: Receiver<SlackAction>,
}

impl SlackWorker {
    pub fn new(notifier: SlackNotifier, receiver: Receiver<SlackAction>) -> Self {
        Self { notifier, receiver }
    }

    /// Runs until the channel is closed and drained.
    pub async fn run(mut self) {
        tracing::info!("SlackWorker started.");

        while let Some(action) = self.receiver.recv().await {
            let kind = action.kind();
            if let Err(e) = self.deliver(action).await {
                tracing::error!(
                    action = kind,
                    retryable = e.current_context().is_retryable(),
                    "Slack action dropped: {}",
                    e.format()
                );
            }
        }

        tracing::info!("SlackWorker shutting down.");
    }

    async fn deliver(&self, action: SlackAction) -> NotifierResult<()> {
        match action {
            SlackAction::SendWebhook(message) => self.notifier.send_webhook_message(&message).await,
            SlackAction::SendApi(message) => {
                self.notifier.send_api_message(&message).await.map(|_| ())
            }
            SlackAction::Schedule { message, post_at } => self
                .notifier
                .schedule_api_message(&message, post_at)
                .await
                .map(|_| ()),
            SlackAction::Delayed { id, .. } | SlackAction::CancelDelayed { id } => {
                Err(report!(Error::ScheduleError(format!(
                    "{id} reached the worker; delays are handled by SlackManager"
                ))))
            }
        }
    }
}
