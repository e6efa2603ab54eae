//! Credentialed, retrying front door to Slack.
//!
//! `SlackNotifier` owns the HTTP client and the credentials from
//! [`NotifierConfig`]. Each send validates the payload, fills in configured
//! defaults, and retries transient failures with the configured
//! [`RetryPolicy`](crate::network::retry::RetryPolicy).

use chrono::{DateTime, Utc};
use error_stack::report;

use crate::{
    config::NotifierConfig,
    error::{Error, NotifierResult},
    network::client_rate_limit::{Client, RateLimitedClient},
};

use super::{
    api,
    message::{ApiMessage, WebhookMessage, validate_post_at},
    responses::{AuthTestResponse, PostMessageResponse, ScheduleMessageResponse, ScheduledMessage},
    webhook,
};

#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: Client,
    config: NotifierConfig,
}

impl SlackNotifier {
    /// Builds a notifier with a rate-limited client shaped by `config`.
    pub fn new(config: NotifierConfig) -> NotifierResult<Self> {
        let client = Client::RateLimited(RateLimitedClient::new(
            config.rate_limit,
            config.rate_burst,
            config.timeout,
        )?);
        Self::with_client(client, config)
    }

    /// Sends fail with `MissingCredentials` later when neither credential is
    /// set; construction only warns.
    pub fn with_client(client: Client, config: NotifierConfig) -> NotifierResult<Self> {
        if let Some(url) = &config.webhook_url {
            webhook::validate_webhook_url(url)?;
        }
        if !config.has_credentials() {
            tracing::warn!(
                "No Slack credentials provided. Please set SLACK_WEBHOOK_URL or SLACK_API_TOKEN"
            );
        }
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    pub fn has_webhook(&self) -> bool {
        self.config.webhook_url.is_some()
    }

    pub fn has_token(&self) -> bool {
        self.config.token.is_some()
    }

    fn webhook_url(&self) -> NotifierResult<&str> {
        self.config
            .webhook_url
            .as_deref()
            .ok_or_else(|| report!(Error::MissingCredentials("Webhook URL is required".to_string())))
    }

    fn token(&self) -> NotifierResult<&str> {
        self.config.token.as_deref().ok_or_else(|| {
            report!(Error::MissingCredentials(
                "Slack API token is required".to_string()
            ))
        })
    }

    /// Applies the configured default channel when the message has none.
    fn resolve_api_message(&self, message: &ApiMessage) -> NotifierResult<ApiMessage> {
        let mut message = message.clone();
        if message.channel.trim().is_empty() {
            if let Some(channel) = &self.config.default_channel {
                message.channel = channel.clone();
            }
        }
        message.validate()?;
        Ok(message)
    }

    /// Posts through the incoming webhook.
    pub async fn send_webhook_message(&self, message: &WebhookMessage) -> NotifierResult<()> {
        let url = self.webhook_url()?;
        let mut message = message.clone();
        if message.username.is_none() {
            message.username = self.config.username.clone();
        }
        message.validate()?;

        self.config
            .retry
            .run("webhook", || webhook::post_webhook(&self.client, url, &message))
            .await?;
        tracing::info!(
            webhook = %webhook::redact_webhook_url(url),
            "Slack webhook message sent successfully."
        );
        Ok(())
    }

    /// Posts through `chat.postMessage`.
    pub async fn send_api_message(&self, message: &ApiMessage) -> NotifierResult<PostMessageResponse> {
        let token = self.token()?;
        let message = self.resolve_api_message(message)?;

        let response = self
            .config
            .retry
            .run("chat.postMessage", || {
                api::post_msg(&self.client, &self.config.api_url, token, &message)
            })
            .await?;
        tracing::info!(
            channel = %response.channel,
            ts = %response.ts,
            "Slack message sent successfully."
        );
        Ok(response)
    }

    /// Hands `message` to Slack for delivery at `post_at`.
    pub async fn schedule_api_message(
        &self,
        message: &ApiMessage,
        post_at: DateTime<Utc>,
    ) -> NotifierResult<ScheduleMessageResponse> {
        let token = self.token()?;
        let message = self.resolve_api_message(message)?;
        validate_post_at(post_at, Utc::now())?;

        let response = self
            .config
            .retry
            .run("chat.scheduleMessage", || {
                api::schedule_msg(&self.client, &self.config.api_url, token, &message, post_at)
            })
            .await?;
        tracing::info!(
            channel = %response.channel,
            scheduled_message_id = %response.scheduled_message_id,
            post_at = response.post_at,
            "Slack message scheduled."
        );
        Ok(response)
    }

    pub async fn delete_scheduled_message(
        &self,
        channel: &str,
        scheduled_message_id: &str,
    ) -> NotifierResult<()> {
        let token = self.token()?;
        self.config
            .retry
            .run("chat.deleteScheduledMessage", || {
                api::delete_scheduled_msg(
                    &self.client,
                    &self.config.api_url,
                    token,
                    channel,
                    scheduled_message_id,
                )
            })
            .await?;
        tracing::info!(channel, scheduled_message_id, "Scheduled Slack message deleted.");
        Ok(())
    }

    pub async fn list_scheduled_messages(
        &self,
        channel: Option<&str>,
    ) -> NotifierResult<Vec<ScheduledMessage>> {
        let token = self.token()?;
        self.config
            .retry
            .run("chat.scheduledMessages.list", || {
                api::list_scheduled_msgs(&self.client, &self.config.api_url, token, channel)
            })
            .await
    }

    pub async fn auth_test(&self) -> NotifierResult<AuthTestResponse> {
        let token = self.token()?;
        self.config
            .retry
            .run("auth.test", || {
                api::auth_test(&self.client, &self.config.api_url, token)
            })
            .await
    }
}
