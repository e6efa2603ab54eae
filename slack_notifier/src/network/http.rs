use std::time::{Duration, SystemTime};

use crate::error::{Error, NotifierResult};
use error_stack::{ResultExt, report};
use reqwest::{
    Response, StatusCode,
    header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER},
};
use serde::de::DeserializeOwned;
use tracing::error;

type Report = error_stack::Report<Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    GET,
    POST,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
        }
    }
}

/// Reads a `Retry-After` header, either delta-seconds or an HTTP-date.
///
/// Dates in the past collapse to a zero duration.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = httpdate::parse_http_date(value).ok()?;
    Some(at.duration_since(SystemTime::now()).unwrap_or(Duration::ZERO))
}

/// Maps a non-success status to the error the retry layer understands.
pub fn status_error(status: StatusCode, headers: &HeaderMap, body: String) -> Report {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = parse_retry_after(headers);
        return report!(Error::RatelimitExceeded(retry_after))
            .attach_printable(format!("Response body: {body}"));
    }
    if status.is_server_error() {
        return report!(Error::ServerError(format!("{status}: {body}")));
    }
    report!(Error::ReqwestError(format!("{status}: {body}")))
}

/// Maps a failure from `reqwest::Client::execute` into the error taxonomy.
pub fn transport_error(err: reqwest::Error) -> Report {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else {
        "request"
    };
    report!(Error::TransportError(format!("{kind}: {err}")))
}

pub async fn handle_reqwest_response<T: DeserializeOwned>(response: Response) -> NotifierResult<T> {
    let status = response.status();
    if !(status.is_success() || status.is_redirection()) {
        let headers = response.headers().clone();
        let error_body = response.text().await.change_context(Error::ReqwestError(
            "Failed to get text from response".to_string(),
        ))?;

        error!(status = %status, "Error Body: {}", &error_body);

        return Err(status_error(status, &headers, error_body));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    // Use Json as default content type
    if content_type.contains("application/json") || content_type.is_empty() {
        response.json().await.change_context(Error::SerdeDeserialize(
            "Failed to deserialize JSON".to_string(),
        ))
    } else if content_type.contains("text/") {
        let text = response.text().await.change_context(Error::ReqwestError(
            "Failed to get text from response".to_string(),
        ))?;
        serde_json::from_value(serde_json::Value::String(text)).change_context(
            Error::SerdeDeserialize("Failed to deserialize text as JSON".to_string()),
        )
    } else {
        Err(report!(Error::ParseError)
            .attach_printable(format!("Unsupported Content-Type: {content_type}")))
    }
}
