//! Environment driven configuration.
//!
//! Every setting is read from an environment variable; a `.env` file in the
//! working directory is loaded first when present.
//!
//! | Variable                | Default                  |
//! |-------------------------|--------------------------|
//! | `SLACK_WEBHOOK_URL`     | none                     |
//! | `SLACK_API_TOKEN`       | `SLACK_BOT_TOKEN`, none  |
//! | `SLACK_API_URL`         | `https://slack.com/api`  |
//! | `SLACK_DEFAULT_CHANNEL` | none                     |
//! | `SLACK_USERNAME`        | none                     |
//! | `SLACK_TIMEOUT_SECS`    | `10`                     |
//! | `SLACK_MAX_ATTEMPTS`    | `5`                      |
//! | `SLACK_RETRY_BASE_MS`   | `1000`                   |
//! | `SLACK_RETRY_MAX_MS`    | `30000`                  |
//! | `SLACK_RATE_LIMIT`      | `1s`                     |
//! | `SLACK_RATE_BURST`      | `3`                      |
//! | `LOG_FORMAT`            | `pretty`                 |

use std::{num::NonZeroU32, str::FromStr, time::Duration};

use error_stack::report;

use crate::{
    error::{Error, NotifierResult},
    log::LogFormat,
    network::{RateLimitWindow, retry::RetryPolicy},
    slack::constants::SLACK_API_URL,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NotifierConfig {
    pub webhook_url: Option<String>,
    pub token: Option<String>,
    pub api_url: String,
    pub default_channel: Option<String>,
    pub username: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub rate_limit: RateLimitWindow,
    pub rate_burst: Option<NonZeroU32>,
    pub log_format: LogFormat,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            token: None,
            api_url: SLACK_API_URL.to_string(),
            default_channel: None,
            username: None,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            rate_limit: RateLimitWindow::PerSecond(NonZeroU32::MIN),
            rate_burst: NonZeroU32::new(3),
            log_format: LogFormat::Pretty,
        }
    }
}

impl NotifierConfig {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> NotifierResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> NotifierResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let retry = RetryPolicy::new(
            parse_or(&get, "SLACK_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
            Duration::from_millis(parse_or(
                &get,
                "SLACK_RETRY_BASE_MS",
                defaults.retry.base_delay.as_millis() as u64,
            )?),
            Duration::from_millis(parse_or(
                &get,
                "SLACK_RETRY_MAX_MS",
                defaults.retry.max_delay.as_millis() as u64,
            )?),
        );

        let rate_limit = match get("SLACK_RATE_LIMIT") {
            Some(raw) => RateLimitWindow::from_string(&raw).ok_or_else(|| {
                report!(Error::ConfigError(format!(
                    "SLACK_RATE_LIMIT must look like <n>s, <n>m, <n>h or <n>d, got {raw:?}"
                )))
            })?,
            None => defaults.rate_limit,
        };

        let rate_burst = match get("SLACK_RATE_BURST") {
            Some(_) => Some(parse_or(&get, "SLACK_RATE_BURST", NonZeroU32::MIN)?),
            None => defaults.rate_burst,
        };

        let timeout_secs: u64 = parse_or(&get, "SLACK_TIMEOUT_SECS", defaults.timeout.as_secs())?;
        if timeout_secs == 0 {
            return Err(report!(Error::ConfigError(
                "SLACK_TIMEOUT_SECS must be greater than zero".to_string()
            )));
        }

        Ok(Self {
            webhook_url: get("SLACK_WEBHOOK_URL"),
            token: get("SLACK_API_TOKEN").or_else(|| get("SLACK_BOT_TOKEN")),
            api_url: get("SLACK_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            default_channel: get("SLACK_DEFAULT_CHANNEL"),
            username: get("SLACK_USERNAME"),
            timeout: Duration::from_secs(timeout_secs),
            retry,
            rate_limit,
            rate_burst,
            log_format: LogFormat::from_env_value(get("LOG_FORMAT").as_deref()),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.webhook_url.is_some() || self.token.is_some()
    }

    pub fn with_webhook_url(mut self, webhook_url: impl Into<String>) -> Self {
        self.webhook_url = Some(webhook_url.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limit(mut self, window: RateLimitWindow, burst: Option<NonZeroU32>) -> Self {
        self.rate_limit = window;
        self.rate_burst = burst;
        self
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> NotifierResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e| {
            report!(Error::ConfigError(format!(
                "{key} has invalid value {raw:?}: {e}"
            )))
        }),
        None => Ok(default),
    }
}
