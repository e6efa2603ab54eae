//! Outbound message payloads.
//!
//! Field names follow Slack's JSON schema so the structs serialize straight
//! into request bodies. Unset optional fields and empty lists are omitted.

use std::str::FromStr;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use error_stack::report;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::{Error, NotifierResult};

use super::constants::{MAX_ATTACHMENTS, MAX_BLOCKS, MAX_SCHEDULE_DAYS, MAX_TEXT_LEN};

/// Colours Slack renders by name on an attachment's side bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NamedColor {
    Good,
    Warning,
    Danger,
}

fn is_valid_color(color: &str) -> bool {
    if NamedColor::from_str(color).is_ok() {
        return true;
    }
    match color.strip_prefix('#') {
        Some(hex) => hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    #[serde(default)]
    pub short: bool,
}

impl AttachmentField {
    pub fn new(title: impl Into<String>, value: impl Into<String>, short: bool) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short,
        }
    }
}

/// Legacy secondary attachment.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub fallback: Option<String>,
    pub color: Option<String>,
    pub pretext: Option<String>,
    pub author_name: Option<String>,
    pub author_link: Option<String>,
    pub author_icon: Option<String>,
    pub title: Option<String>,
    pub title_link: Option<String>,
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<AttachmentField>,
    pub image_url: Option<String>,
    pub thumb_url: Option<String>,
    pub footer: Option<String>,
    pub footer_icon: Option<String>,
    pub ts: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<String>,
}

impl Attachment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn pretext(mut self, pretext: impl Into<String>) -> Self {
        self.pretext = Some(pretext.into());
        self
    }

    pub fn author(mut self, name: impl Into<String>, link: Option<String>) -> Self {
        self.author_name = Some(name.into());
        self.author_link = link;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn title_link(mut self, link: impl Into<String>) -> Self {
        self.title_link = Some(link.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn field(mut self, field: AttachmentField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.ts = Some(at.timestamp());
        self
    }

    /// Marks attachment fields whose text should be rendered as mrkdwn.
    pub fn markdown_in(mut self, fields: &[&str]) -> Self {
        self.mrkdwn_in = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    fn is_empty(&self) -> bool {
        self.fallback.is_none()
            && self.pretext.is_none()
            && self.title.is_none()
            && self.text.is_none()
            && self.fields.is_empty()
            && self.image_url.is_none()
            && self.thumb_url.is_none()
            && self.author_name.is_none()
            && self.footer.is_none()
    }

    pub fn validate(&self) -> NotifierResult<()> {
        if let Some(color) = &self.color {
            if !is_valid_color(color) {
                return Err(report!(Error::InvalidMessage(format!(
                    "Attachment color {color:?} is neither good/warning/danger nor #RRGGBB"
                ))));
            }
        }
        if self.is_empty() {
            return Err(report!(Error::InvalidMessage(
                "Attachment has no visible content".to_string()
            )));
        }
        Ok(())
    }
}

fn validate_body(text: &str, attachments: &[Attachment], blocks: &[Value]) -> NotifierResult<()> {
    if text.trim().is_empty() && attachments.is_empty() && blocks.is_empty() {
        return Err(report!(Error::InvalidMessage(
            "Message needs text, attachments or blocks".to_string()
        )));
    }
    let text_len = text.chars().count();
    if text_len > MAX_TEXT_LEN {
        return Err(report!(Error::InvalidMessage(format!(
            "Message text is {text_len} characters, limit is {MAX_TEXT_LEN}"
        ))));
    }
    if blocks.len() > MAX_BLOCKS {
        return Err(report!(Error::InvalidMessage(format!(
            "Message has {} blocks, limit is {MAX_BLOCKS}",
            blocks.len()
        ))));
    }
    if attachments.len() > MAX_ATTACHMENTS {
        return Err(report!(Error::InvalidMessage(format!(
            "Message has {} attachments, limit is {MAX_ATTACHMENTS}",
            attachments.len()
        ))));
    }
    if let Some(block) = blocks.iter().find(|b| b.get("type").is_none()) {
        return Err(report!(Error::InvalidMessage(format!(
            "Block without a type: {block}"
        ))));
    }
    attachments.iter().try_for_each(Attachment::validate)
}

/// Payload for an incoming webhook.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    pub text: String,
    pub channel: Option<String>,
    pub username: Option<String>,
    pub icon_emoji: Option<String>,
    pub icon_url: Option<String>,
    pub mrkdwn: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Value>,
}

impl WebhookMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Only honoured by legacy webhooks; app webhooks are bound to one channel.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn icon_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.icon_emoji = Some(emoji.into());
        self
    }

    pub fn icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = Some(url.into());
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn blocks(mut self, blocks: Vec<Value>) -> Self {
        self.blocks.extend(blocks);
        self
    }

    pub fn validate(&self) -> NotifierResult<()> {
        validate_body(&self.text, &self.attachments, &self.blocks)
    }
}

/// Payload for `chat.postMessage` and `chat.scheduleMessage`.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub channel: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Value>,
    pub thread_ts: Option<String>,
    pub reply_broadcast: Option<bool>,
    pub unfurl_links: Option<bool>,
    pub unfurl_media: Option<bool>,
    pub mrkdwn: Option<bool>,
    pub username: Option<String>,
    pub icon_emoji: Option<String>,
    pub icon_url: Option<String>,
}

impl ApiMessage {
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn blocks(mut self, blocks: Vec<Value>) -> Self {
        self.blocks.extend(blocks);
        self
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>, broadcast: bool) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self.reply_broadcast = broadcast.then_some(true);
        self
    }

    pub fn unfurl(mut self, links: bool, media: bool) -> Self {
        self.unfurl_links = Some(links);
        self.unfurl_media = Some(media);
        self
    }

    /// Needs the `chat:write.customize` scope.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn icon_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.icon_emoji = Some(emoji.into());
        self
    }

    pub fn validate(&self) -> NotifierResult<()> {
        if self.channel.trim().is_empty() {
            return Err(report!(Error::InvalidMessage(
                "Channel is required for API messages".to_string()
            )));
        }
        validate_body(&self.text, &self.attachments, &self.blocks)
    }
}

/// Checks a `chat.scheduleMessage` timestamp against `now`.
pub fn validate_post_at(post_at: DateTime<Utc>, now: DateTime<Utc>) -> NotifierResult<()> {
    if post_at <= now {
        return Err(report!(Error::ScheduleError(format!(
            "post_at {post_at} is not in the future"
        ))));
    }
    if post_at - now > ChronoDuration::days(MAX_SCHEDULE_DAYS) {
        return Err(report!(Error::ScheduleError(format!(
            "post_at {post_at} is more than {MAX_SCHEDULE_DAYS} days ahead"
        ))));
    }
    Ok(())
}
