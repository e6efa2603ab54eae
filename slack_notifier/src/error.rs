use std::time::Duration;

use error_stack::{AttachmentKind, FrameKind, Report};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type NotifierResult<T> = Result<T, Report<Error>>;

#[derive(Error, Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error")]
    ParseError,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Serde serialize error: {0}")]
    SerdeSerialize(String),

    #[error("Serde deserialize error: {0}")]
    SerdeDeserialize(String),

    #[error("Reqwest error: {0}")]
    ReqwestError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Rate limit exceeded, retry after {0:?}")]
    RatelimitExceeded(Option<Duration>),

    #[error("Slack API error: {0}")]
    SlackApiError(String),

    #[error("Webhook error: {0}")]
    WebhookError(String),

    #[error("Schedule error: {0}")]
    ScheduleError(String),

    #[error("Client message error: {0}")]
    ClientMessageError(String),

    #[error("Module stopped: {0}")]
    ModuleStopped(String),

    #[error("Unknown error")]
    Unknown,
}

impl Error {
    /// Whether a failed delivery may succeed if sent again unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::TransportError(_) | Error::ServerError(_) | Error::RatelimitExceeded(_)
        )
    }
}

pub trait ReportDisplayExt {
    fn format(&self) -> String;
}

impl ReportDisplayExt for Report<Error> {
    fn format(&self) -> String {
        let mut output = self.current_context().to_string();

        for frame in self.frames() {
            if let FrameKind::Attachment(AttachmentKind::Printable(attachment)) = frame.kind() {
                output.push_str(&format!(": {attachment}"));
            }
        }

        output
    }
}
