use std::{path::PathBuf, process, time::Duration};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use error_stack::{ResultExt, report};
use serde::Serialize;
use serde_json::Value;
use slack_notifier::{
    ApiMessage, Attachment, AttachmentField, NotifierConfig, SlackNotifier, WebhookMessage,
    error::{Error, NotifierResult, ReportDisplayExt},
    log::{LogFormat, init_tracing},
};

#[derive(Debug, Parser)]
#[command(name = "slack-notify", version, about = "Send formatted messages to Slack")]
struct Cli {
    /// Overrides SLACK_WEBHOOK_URL.
    #[arg(long, global = true)]
    webhook_url: Option<String>,

    /// Overrides SLACK_API_TOKEN.
    #[arg(long, global = true)]
    token: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Post through the incoming webhook.
    Webhook {
        #[command(flatten)]
        message: MessageArgs,
        /// Channel override, honoured by legacy webhooks only.
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        icon_emoji: Option<String>,
        /// Wait this many seconds before sending.
        #[arg(long)]
        delay: Option<u64>,
    },
    /// Post through chat.postMessage.
    Post {
        #[command(flatten)]
        message: MessageArgs,
        /// Channel ID or name; falls back to SLACK_DEFAULT_CHANNEL.
        #[arg(long)]
        channel: Option<String>,
        /// Reply in this thread.
        #[arg(long)]
        thread_ts: Option<String>,
        /// Wait this many seconds before sending.
        #[arg(long)]
        delay: Option<u64>,
    },
    /// Let Slack post the message later (chat.scheduleMessage).
    Schedule {
        #[command(flatten)]
        message: MessageArgs,
        #[arg(long)]
        channel: Option<String>,
        /// RFC 3339 timestamp, e.g. 2026-10-17T09:00:00Z.
        #[arg(long, conflicts_with = "in_secs", required_unless_present = "in_secs")]
        at: Option<DateTime<Utc>>,
        /// Seconds from now.
        #[arg(long = "in", id = "in_secs")]
        in_secs: Option<i64>,
    },
    /// Remove a message scheduled with `schedule`.
    DeleteScheduled {
        #[arg(long)]
        channel: String,
        #[arg(long)]
        id: String,
    },
    /// List pending scheduled messages.
    ListScheduled {
        #[arg(long)]
        channel: Option<String>,
    },
    /// Check the API token.
    AuthTest,
}

#[derive(Debug, Args)]
struct MessageArgs {
    /// Message text (Slack mrkdwn).
    #[arg(long, default_value = "")]
    text: String,
    #[arg(long)]
    attachment_title: Option<String>,
    #[arg(long)]
    attachment_text: Option<String>,
    /// good, warning, danger or #RRGGBB.
    #[arg(long)]
    color: Option<String>,
    /// Attachment field as `title=value`; repeatable.
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<AttachmentField>,
    #[arg(long)]
    footer: Option<String>,
    /// JSON file holding an array of Block Kit blocks.
    #[arg(long)]
    blocks_file: Option<PathBuf>,
}

fn parse_field(raw: &str) -> Result<AttachmentField, String> {
    let (title, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected title=value, got {raw:?}"))?;
    Ok(AttachmentField::new(title.trim(), value.trim(), true))
}

impl MessageArgs {
    fn attachment(&self) -> Option<Attachment> {
        let has_content = self.attachment_title.is_some()
            || self.attachment_text.is_some()
            || !self.fields.is_empty();
        if !has_content {
            return None;
        }
        let mut attachment = Attachment::new();
        attachment.title = self.attachment_title.clone();
        attachment.text = self.attachment_text.clone();
        attachment.color = self.color.clone();
        attachment.footer = self.footer.clone();
        attachment.fields = self.fields.clone();
        attachment.fallback = self
            .attachment_title
            .clone()
            .or_else(|| self.attachment_text.clone());
        Some(attachment)
    }

    async fn blocks(&self) -> NotifierResult<Vec<Value>> {
        let Some(path) = &self.blocks_file else {
            return Ok(Vec::new());
        };
        let raw = tokio::fs::read_to_string(path)
            .await
            .change_context(Error::InvalidMessage("Failed to read blocks file".to_string()))
            .attach_printable_lazy(|| path.display().to_string())?;
        serde_json::from_str(&raw)
            .change_context(Error::InvalidMessage(
                "Blocks file must hold a JSON array".to_string(),
            ))
            .attach_printable_lazy(|| path.display().to_string())
    }

    async fn api_message(&self, channel: Option<String>) -> NotifierResult<ApiMessage> {
        let mut message =
            ApiMessage::new(channel.unwrap_or_default(), self.text.clone()).blocks(self.blocks().await?);
        if let Some(attachment) = self.attachment() {
            message = message.attachment(attachment);
        }
        Ok(message)
    }

    async fn webhook_message(&self) -> NotifierResult<WebhookMessage> {
        let mut message = WebhookMessage::new(self.text.clone()).blocks(self.blocks().await?);
        if let Some(attachment) = self.attachment() {
            message = message.attachment(attachment);
        }
        Ok(message)
    }
}

fn print_json<T: Serialize>(value: &T) -> NotifierResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .change_context(Error::SerdeSerialize("Failed to render response".to_string()))?;
    println!("{rendered}");
    Ok(())
}

/// Command-line credentials win over the environment.
fn apply_overrides(
    mut config: NotifierConfig,
    webhook_url: Option<String>,
    token: Option<String>,
) -> NotifierConfig {
    if let Some(url) = webhook_url {
        config = config.with_webhook_url(url);
    }
    if let Some(token) = token {
        config = config.with_token(token);
    }
    config
}

/// Turns `--at` / `--in` into an absolute time, rejecting offsets chrono cannot hold.
fn resolve_post_at(
    at: Option<DateTime<Utc>>,
    in_secs: Option<i64>,
    now: DateTime<Utc>,
) -> NotifierResult<DateTime<Utc>> {
    match (at, in_secs) {
        (Some(at), _) => Ok(at),
        (None, Some(secs)) => chrono::Duration::try_seconds(secs)
            .and_then(|offset| now.checked_add_signed(offset))
            .ok_or_else(|| {
                report!(Error::ScheduleError(format!(
                    "--in {secs} is outside the representable time range"
                )))
            }),
        (None, None) => Err(report!(Error::ScheduleError(
            "Pass --at or --in".to_string()
        ))),
    }
}

async fn wait(delay: Option<u64>) {
    if let Some(secs) = delay.filter(|s| *s > 0) {
        tracing::info!(delay_secs = secs, "Delaying delivery");
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("slack-notify error: {}", err.format());
        tracing::debug!("{err:?}");
        process::exit(1);
    }
}

async fn run() -> NotifierResult<()> {
    let cli = Cli::parse();

    let config = NotifierConfig::from_env()?;
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        config.log_format
    };
    init_tracing(format);

    let config = apply_overrides(config, cli.webhook_url.clone(), cli.token.clone());
    let notifier = SlackNotifier::new(config)?;

    match cli.command {
        Command::Webhook {
            message,
            channel,
            username,
            icon_emoji,
            delay,
        } => {
            let mut payload = message.webhook_message().await?;
            payload.channel = channel;
            payload.username = username;
            payload.icon_emoji = icon_emoji;
            payload.validate()?;
            wait(delay).await;
            notifier.send_webhook_message(&payload).await?;
            println!("ok");
        }
        Command::Post {
            message,
            channel,
            thread_ts,
            delay,
        } => {
            let mut payload = message.api_message(channel).await?;
            if let Some(ts) = thread_ts {
                payload = payload.in_thread(ts, false);
            }
            wait(delay).await;
            let response = notifier.send_api_message(&payload).await?;
            print_json(&response)?;
        }
        Command::Schedule {
            message,
            channel,
            at,
            in_secs,
        } => {
            let post_at = resolve_post_at(at, in_secs, Utc::now())?;
            let payload = message.api_message(channel).await?;
            let response = notifier.schedule_api_message(&payload, post_at).await?;
            print_json(&response)?;
        }
        Command::DeleteScheduled { channel, id } => {
            notifier.delete_scheduled_message(&channel, &id).await?;
            println!("ok");
        }
        Command::ListScheduled { channel } => {
            let messages = notifier.list_scheduled_messages(channel.as_deref()).await?;
            print_json(&messages)?;
        }
        Command::AuthTest => {
            let auth = notifier.auth_test().await?;
            print_json(&auth)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_field() {
        let field = parse_field("Version = 1.4.2").unwrap();
        assert_eq!(field, AttachmentField::new("Version", "1.4.2", true));
        assert!(parse_field("no separator").is_err());
    }

    #[test]
    fn test_parse_webhook_command() {
        let cli = Cli::parse_from([
            "slack-notify",
            "webhook",
            "--text",
            "Hello",
            "--username",
            "NotificationBot",
            "--field",
            "env=prod",
            "--color",
            "good",
        ]);
        match cli.command {
            Command::Webhook {
                message, username, ..
            } => {
                assert_eq!(message.text, "Hello");
                assert_eq!(username.as_deref(), Some("NotificationBot"));
                let attachment = message.attachment().unwrap();
                assert_eq!(attachment.color.as_deref(), Some("good"));
                assert_eq!(attachment.fields.len(), 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_schedule_requires_time() {
        assert!(
            Cli::try_parse_from(["slack-notify", "schedule", "--text", "x"]).is_err()
        );
        assert!(
            Cli::try_parse_from(["slack-notify", "schedule", "--text", "x", "--in", "60"]).is_ok()
        );
        assert!(
            Cli::try_parse_from([
                "slack-notify",
                "schedule",
                "--text",
                "x",
                "--at",
                "2030-01-01T00:00:00Z"
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_apply_overrides() {
        let env = NotifierConfig::default().with_token("xoxb-env");
        let config = apply_overrides(env.clone(), None, Some("xoxb-cli".to_string()));
        assert_eq!(config.token.as_deref(), Some("xoxb-cli"));
        assert_eq!(config.webhook_url, None);

        let config = apply_overrides(
            NotifierConfig::default(),
            Some("https://hooks.slack.com/services/T/B/X".to_string()),
            None,
        );
        assert!(config.has_credentials());
        assert_eq!(apply_overrides(env.clone(), None, None), env);
    }

    #[test]
    fn test_resolve_post_at() {
        let now = Utc::now();
        assert_eq!(
            resolve_post_at(None, Some(60), now).unwrap(),
            now + chrono::Duration::seconds(60)
        );
        let at = now + chrono::Duration::hours(2);
        assert_eq!(resolve_post_at(Some(at), None, now).unwrap(), at);

        for secs in [i64::MAX, i64::MIN] {
            let err = resolve_post_at(None, Some(secs), now).unwrap_err();
            assert!(matches!(err.current_context(), Error::ScheduleError(_)));
        }
        assert!(resolve_post_at(None, None, now).is_err());
    }

    #[test]
    fn test_no_attachment_without_content() {
        let cli = Cli::parse_from(["slack-notify", "post", "--text", "plain", "--color", "good"]);
        match cli.command {
            Command::Post { message, .. } => assert!(message.attachment().is_none()),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
