use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use chrono::{DateTime, Utc};

use super::message::{ApiMessage, WebhookMessage};

static NEXT_DELAY_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a locally delayed action, used to cancel it before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelayId(u64);

impl DelayId {
    pub fn next() -> Self {
        DelayId(NEXT_DELAY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delay-{}", self.0)
    }
}

/// Commands understood by the Slack manager and worker.
#[derive(Debug, Clone)]
pub enum SlackAction {
    /// Posts through the incoming webhook.
    SendWebhook(WebhookMessage),
    /// Posts through `chat.postMessage`.
    SendApi(ApiMessage),
    /// Lets Slack hold the message until `post_at` (`chat.scheduleMessage`).
    Schedule {
        message: ApiMessage,
        post_at: DateTime<Utc>,
    },
    /// Holds `action` locally for `delay`, then delivers it. Works for webhooks too.
    Delayed {
        id: DelayId,
        delay: Duration,
        action: Box<SlackAction>,
    },
    /// Drops a `Delayed` action that has not fired yet.
    CancelDelayed { id: DelayId },
}

impl SlackAction {
    pub fn kind(&self) -> &'static str {
        match self {
            SlackAction::SendWebhook(_) => "webhook",
            SlackAction::SendApi(_) => "chat.postMessage",
            SlackAction::Schedule { .. } => "chat.scheduleMessage",
            SlackAction::Delayed { .. } => "delayed",
            SlackAction::CancelDelayed { .. } => "cancel_delayed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_ids_are_unique() {
        let a = DelayId::next();
        let b = DelayId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("delay-"));
    }
}
