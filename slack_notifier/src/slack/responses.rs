use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every Web API answer, matched by shape in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SlackResponse {
    #[serde(untagged)]
    ScheduleMessage(ScheduleMessageResponse),
    #[serde(untagged)]
    PostMessage(PostMessageResponse),
    #[serde(untagged)]
    ScheduledMessages(ScheduledMessagesResponse),
    #[serde(untagged)]
    AuthTest(AuthTestResponse),
    #[serde(untagged)]
    Error(SlackError),
    #[serde(untagged)]
    Ok(SlackOk),
    #[serde(untagged)]
    UnknownResponse(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessageResponse {
    pub ok: bool,
    pub channel: String,
    pub ts: String,
    #[serde(default)]
    pub message: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleMessageResponse {
    pub ok: bool,
    pub channel: String,
    pub scheduled_message_id: String,
    pub post_at: i64,
    #[serde(default)]
    pub message: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub id: String,
    pub channel_id: String,
    pub post_at: i64,
    pub date_created: i64,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledMessagesResponse {
    pub ok: bool,
    pub scheduled_messages: Vec<ScheduledMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTestResponse {
    pub ok: bool,
    pub url: String,
    pub team: String,
    pub user: String,
    pub team_id: String,
    pub user_id: String,
    #[serde(default)]
    pub bot_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackError {
    pub ok: bool,
    pub error: String,
}

/// Bare `{"ok": true}` answer, e.g. from `chat.deleteScheduledMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackOk {
    pub ok: bool,
}
