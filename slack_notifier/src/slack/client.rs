//! Slack client for sending messages to Slack channels.
//!
//! This module provides a simple client interface for interacting with Slack.
//! It hides the manager and worker behind a queue, so callers return as soon
//! as the message is handed over.

use std::{fmt, time::Duration};

use crate::error::{Error, NotifierResult};
use chrono::{DateTime, Utc};
use error_stack::{ResultExt, report};
use tokio::sync::mpsc::Sender;

use super::{
    actions::{DelayId, SlackAction},
    message::{ApiMessage, WebhookMessage},
};

/// Where `send_message` text ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A channel reached through `chat.postMessage`.
    Api(String),
    /// The incoming webhook, optionally overriding its channel.
    Webhook(Option<String>),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Api(channel) => write!(f, "api:{channel}"),
            Destination::Webhook(Some(channel)) => write!(f, "webhook:{channel}"),
            Destination::Webhook(None) => write!(f, "webhook"),
        }
    }
}

/// Client for sending messages to one Slack destination.
///
/// `SlackClient` is cheap to clone. It only talks to a `SlackManager` through
/// a bounded queue; rate limiting and retries happen on the worker side.
#[derive(Debug, Clone)]
pub struct SlackClient {
    /// Channel for sending commands to the Slack manager
    command_tx: Sender<SlackAction>,
    /// Target of `send_message`
    destination: Destination,
}

impl SlackClient {
    pub fn new(command_tx: Sender<SlackAction>, destination: Destination) -> Self {
        Self {
            command_tx,
            destination,
        }
    }

    pub fn for_channel(command_tx: Sender<SlackAction>, channel: impl Into<String>) -> Self {
        Self::new(command_tx, Destination::Api(channel.into()))
    }

    pub fn for_webhook(command_tx: Sender<SlackAction>) -> Self {
        Self::new(command_tx, Destination::Webhook(None))
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    fn text_action(&self, text: String) -> SlackAction {
        match &self.destination {
            Destination::Api(channel) => SlackAction::SendApi(ApiMessage::new(channel.clone(), text)),
            Destination::Webhook(channel) => {
                let mut message = WebhookMessage::new(text);
                message.channel = channel.clone();
                SlackAction::SendWebhook(message)
            }
        }
    }

    /// Queues a plain text message for this client's destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be handed to the manager,
    /// typically because it has been shut down.
    pub async fn send_message(&self, text: String) -> NotifierResult<()> {
        let action = self.text_action(text);
        self.send(action).await
    }

    /// Queues any action.
    pub async fn send(&self, action: SlackAction) -> NotifierResult<()> {
        let kind = action.kind();
        self.command_tx
            .send(action)
            .await
            .change_context(Error::ClientMessageError(format!(
                "Failed to queue {kind} action for Slack destination: {}",
                self.destination
            )))
    }

    /// Queues a plain text message to be delivered after `delay`.
    pub async fn send_message_after(&self, text: String, delay: Duration) -> NotifierResult<DelayId> {
        let action = self.text_action(text);
        self.send_after(action, delay).await
    }

    /// Queues `action` to be delivered after `delay`; the id can cancel it.
    pub async fn send_after(&self, action: SlackAction, delay: Duration) -> NotifierResult<DelayId> {
        let id = DelayId::next();
        self.send(SlackAction::Delayed {
            id,
            delay,
            action: Box::new(action),
        })
        .await?;
        Ok(id)
    }

    /// Queues a Slack-side scheduled message for `post_at`. Needs an API destination.
    pub async fn schedule_message(&self, text: String, post_at: DateTime<Utc>) -> NotifierResult<()> {
        let channel = match &self.destination {
            Destination::Api(channel) => channel.clone(),
            Destination::Webhook(_) => {
                return Err(report!(Error::ScheduleError(
                    "Webhooks cannot be scheduled by Slack, use send_message_after".to_string()
                )));
            }
        };
        self.send(SlackAction::Schedule {
            message: ApiMessage::new(channel, text),
            post_at,
        })
        .await
    }

    pub async fn cancel(&self, id: DelayId) -> NotifierResult<()> {
        self.send(SlackAction::CancelDelayed { id }).await
    }
}
