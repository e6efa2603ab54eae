//! Incoming-webhook delivery.
//!
//! A webhook answers `200` with the plain-text body `ok`. Failures come back
//! as non-2xx statuses whose body is a short code such as `invalid_payload`,
//! `no_service` or `channel_not_found`.

use error_stack::{ResultExt, report};
use reqwest::header::CONTENT_TYPE;

use crate::{
    error::{Error, NotifierResult},
    network::{client_rate_limit::Client, http::{status_error, transport_error}},
};

use super::message::WebhookMessage;

/// Hides the secret path segments of a webhook URL for logging.
pub fn redact_webhook_url(url: &str) -> String {
    match url.find("/services/") {
        Some(idx) => format!("{}/services/***", &url[..idx]),
        None => match url.find("://") {
            Some(scheme_end) => {
                let host_end = url[scheme_end + 3..]
                    .find('/')
                    .map(|i| scheme_end + 3 + i)
                    .unwrap_or(url.len());
                format!("{}/***", &url[..host_end])
            }
            None => "***".to_string(),
        },
    }
}

/// Posts `message` to the webhook at `url`.
///
/// # Errors
///
/// - `TransportError` when the webhook cannot be reached
/// - `RatelimitExceeded` / `ServerError` for 429 and 5xx answers
/// - `WebhookError` for any other rejection, carrying Slack's error code
pub async fn post_webhook(client: &Client, url: &str, message: &WebhookMessage) -> NotifierResult<()> {
    let request = client
        .inner_client()
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .json(message)
        .build()
        .change_context(Error::WebhookError("Failed to build webhook request".to_string()))
        .attach_printable_lazy(|| redact_webhook_url(url))?;

    let response = client
        .execute(request)
        .await
        .attach_printable_lazy(|| format!("Webhook {}", redact_webhook_url(url)))?;

    // Webhooks answer plain text, often without a Content-Type, so the body is
    // read as text whatever the headers say.
    let status = response.status();
    let headers = response.headers().clone();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) if status.is_success() => {
            tracing::warn!(error = %e, "Webhook accepted message but its body was unreadable");
            return Ok(());
        }
        Err(e) => return Err(transport_error(e)),
    };

    if !status.is_success() {
        tracing::error!(status = %status, "Webhook rejected message: {}", &body);
        let e = status_error(status, &headers, body);
        // Retryable failures keep their context so the retry layer sees them.
        if e.current_context().is_retryable() {
            return Err(e);
        }
        let reason = match e.current_context() {
            Error::ReqwestError(reason) => reason.clone(),
            other => other.to_string(),
        };
        return Err(e.change_context(Error::WebhookError(reason)));
    }

    if body.trim() != "ok" {
        tracing::warn!(body = %body, "Webhook accepted message with unexpected body");
    }
    Ok(())
}

/// Checks a webhook URL looks usable before anything is sent to it.
pub fn validate_webhook_url(url: &str) -> NotifierResult<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        return Ok(());
    }
    Err(report!(Error::ConfigError(format!(
        "Webhook URL must be http(s), got {}",
        redact_webhook_url(url)
    ))))
}
