use crate::{
    error::{Error, NotifierResult},
    network::{
        client_rate_limit::Client,
        http::{HttpMethod, handle_reqwest_response},
    },
};
use chrono::{DateTime, Utc};
use error_stack::{ResultExt, report};
use serde_json::{Value, json};

use super::{
    constants::{
        AUTH_TEST_PATH, DELETE_SCHEDULED_MESSAGE_PATH, LIST_SCHEDULED_MESSAGES_PATH,
        POST_MESSAGE_PATH, SCHEDULE_MESSAGE_PATH, TRANSIENT_API_ERRORS,
    },
    message::ApiMessage,
    responses::{
        AuthTestResponse, PostMessageResponse, ScheduleMessageResponse, ScheduledMessage,
        SlackResponse,
    },
};

/// Sends a request to the Slack Web API.
///
/// # Arguments
///
/// * `client` - HTTP client, possibly rate limited
/// * `api_url` - Base URL, normally `https://slack.com/api`
/// * `token` - Bot or user token sent as a bearer credential
/// * `uri_path` - The API method path (e.g., "/chat.postMessage")
/// * `body` - Optional JSON body, only used with POST
/// * `method` - HTTP method to use
///
/// # Errors
///
/// Will return an error if:
/// - The request cannot be built or sent
/// - Slack answers with a non-success HTTP status
/// - The body cannot be decoded
async fn send_slack_api_request(
    client: &Client,
    api_url: &str,
    token: &str,
    uri_path: &str,
    body: Option<Value>,
    method: HttpMethod,
) -> NotifierResult<SlackResponse> {
    let url = format!("{api_url}{uri_path}");
    let inner = client.inner_client();
    let request = match (method, body) {
        (HttpMethod::GET, _) => inner.get(&url),
        // Slack warns with `missing_charset` unless the charset is explicit;
        // `json` keeps a content type that is already set.
        (HttpMethod::POST, Some(body)) => inner
            .post(&url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/json; charset=utf-8",
            )
            .json(&body),
        (HttpMethod::POST, None) => inner.post(&url),
    }
    .bearer_auth(token)
    .build()
    .change_context(Error::ReqwestError("Failed to build request".to_string()))
    .attach_printable_lazy(|| format!("{} {url}", method.as_str()))?;

    tracing::debug!(method = method.as_str(), path = uri_path, "Calling Slack API");

    let response = client
        .execute(request)
        .await
        .attach_printable_lazy(|| format!("Failed to send request to {uri_path}"))?;

    handle_reqwest_response(response)
        .await
        .attach_printable_lazy(|| format!("Failed to handle response from {uri_path}"))
}

/// Processes a Slack API response and validates it for errors.
///
/// `ok: false` answers become `SlackApiError`, except the codes Slack
/// documents as transient, which become `ServerError` so they are retried.
/// Unrecognised shapes become `Unknown`.
fn handle_slack_response(response: SlackResponse) -> NotifierResult<SlackResponse> {
    match response {
        SlackResponse::Error(slack_error) => {
            tracing::error!("Error in slack api response: {}", slack_error.error);
            if TRANSIENT_API_ERRORS.contains(&slack_error.error.as_str()) {
                return Err(report!(Error::ServerError(slack_error.error)));
            }
            Err(report!(Error::SlackApiError(slack_error.error)))
        }
        SlackResponse::UnknownResponse(value) => {
            tracing::error!("Unknown response: {value:?}");
            Err(report!(Error::Unknown)
                .attach_printable(format!("Unknown response from Slack API: {value:?}")))
        }
        _ => Ok(response),
    }
}

fn unexpected(response: SlackResponse) -> error_stack::Report<Error> {
    report!(Error::Unknown)
        .attach_printable(format!("Unexpected response from Slack API: {response:?}"))
}

/// Sends a message to a Slack channel through `chat.postMessage`.
///
/// # Errors
///
/// Will return an error if:
/// - The Slack API request fails to send
/// - The authentication token is invalid or lacks necessary permissions
/// - The channel doesn't exist or the bot isn't a member
/// - The response from Slack contains an error or has an unexpected shape
pub async fn post_msg(
    client: &Client,
    api_url: &str,
    token: &str,
    message: &ApiMessage,
) -> NotifierResult<PostMessageResponse> {
    let body = serde_json::to_value(message)
        .change_context(Error::SerdeSerialize("Failed to serialize message".to_string()))?;
    let response =
        send_slack_api_request(client, api_url, token, POST_MESSAGE_PATH, Some(body), HttpMethod::POST)
            .await?;
    match handle_slack_response(response)? {
        SlackResponse::PostMessage(post_message_response) => Ok(post_message_response),
        response => Err(unexpected(response)),
    }
}

/// Asks Slack to post `message` at `post_at` (`chat.scheduleMessage`).
pub async fn schedule_msg(
    client: &Client,
    api_url: &str,
    token: &str,
    message: &ApiMessage,
    post_at: DateTime<Utc>,
) -> NotifierResult<ScheduleMessageResponse> {
    let mut body = serde_json::to_value(message)
        .change_context(Error::SerdeSerialize("Failed to serialize message".to_string()))?;
    body["post_at"] = json!(post_at.timestamp());
    let response = send_slack_api_request(
        client,
        api_url,
        token,
        SCHEDULE_MESSAGE_PATH,
        Some(body),
        HttpMethod::POST,
    )
    .await?;
    match handle_slack_response(response)? {
        SlackResponse::ScheduleMessage(schedule_response) => Ok(schedule_response),
        response => Err(unexpected(response)),
    }
}

/// Removes a pending scheduled message (`chat.deleteScheduledMessage`).
pub async fn delete_scheduled_msg(
    client: &Client,
    api_url: &str,
    token: &str,
    channel: &str,
    scheduled_message_id: &str,
) -> NotifierResult<()> {
    let body = json!({
        "channel": channel,
        "scheduled_message_id": scheduled_message_id,
    });
    let response = send_slack_api_request(
        client,
        api_url,
        token,
        DELETE_SCHEDULED_MESSAGE_PATH,
        Some(body),
        HttpMethod::POST,
    )
    .await?;
    match handle_slack_response(response)? {
        SlackResponse::Ok(_) => Ok(()),
        response => Err(unexpected(response)),
    }
}

/// Lists pending scheduled messages, optionally for one channel.
pub async fn list_scheduled_msgs(
    client: &Client,
    api_url: &str,
    token: &str,
    channel: Option<&str>,
) -> NotifierResult<Vec<ScheduledMessage>> {
    let body = match channel {
        Some(channel) => json!({ "channel": channel }),
        None => json!({}),
    };
    let response = send_slack_api_request(
        client,
        api_url,
        token,
        LIST_SCHEDULED_MESSAGES_PATH,
        Some(body),
        HttpMethod::POST,
    )
    .await?;
    match handle_slack_response(response)? {
        SlackResponse::ScheduledMessages(list) => Ok(list.scheduled_messages),
        response => Err(unexpected(response)),
    }
}

/// Checks the token and reports which workspace and user it belongs to.
pub async fn auth_test(
    client: &Client,
    api_url: &str,
    token: &str,
) -> NotifierResult<AuthTestResponse> {
    let response =
        send_slack_api_request(client, api_url, token, AUTH_TEST_PATH, None, HttpMethod::GET)
            .await?;
    match handle_slack_response(response)? {
        SlackResponse::AuthTest(auth) => Ok(auth),
        response => Err(unexpected(response)),
    }
}
