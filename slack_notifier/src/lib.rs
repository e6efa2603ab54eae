//! Thin client for posting formatted messages to Slack.
//!
//! Messages go out through an incoming webhook or the Web API
//! (`chat.postMessage`) with a bot token. Delivery can be immediate, held
//! locally for a delay, or handed to Slack's own scheduler.

pub mod config;
pub mod error;
pub mod log;
pub mod network;
pub mod slack;
#[cfg(test)]
pub mod tests;

pub use config::NotifierConfig;
pub use error::{Error, NotifierResult};
pub use slack::{
    message::{ApiMessage, Attachment, AttachmentField, WebhookMessage},
    notifier::SlackNotifier,
};
