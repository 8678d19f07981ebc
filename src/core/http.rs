//! HTTP client utilities.
//!
//! Every request carries the target's `User-Agent` and the session cookie.
//! Ancillary calls use [`DEFAULT_TIMEOUT`]; the completion stream has none,
//! since a long answer can legitimately keep the connection open for minutes.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, UncleError};

/// Default timeout for non-streaming requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection establishment timeout, applied to every request.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if a header value is not valid or client construction fails.
pub fn build_client(user_agent: &str, cookie_header: &str) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if !cookie_header.is_empty() {
        let value = HeaderValue::from_str(cookie_header).map_err(|e| UncleError::InvalidSetting {
            key: "cookies".to_string(),
            message: e.to_string(),
        })?;
        headers.insert(COOKIE, value);
    }

    ClientBuilder::new()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(user_agent)
        .default_headers(headers)
        .build()
        .map_err(|e| UncleError::Network(e.to_string()))
}

fn map_send_error(e: &reqwest::Error) -> UncleError {
    if e.is_timeout() {
        UncleError::Timeout(DEFAULT_TIMEOUT.as_secs())
    } else {
        UncleError::Network(e.to_string())
    }
}

/// Send a request, mapping transport failures.
async fn send(request: RequestBuilder) -> Result<Response> {
    request.send().await.map_err(|e| map_send_error(&e))
}

/// Turn an unexpected status into `RemoteStatus`, keeping the body.
async fn remote_status(operation: &'static str, response: Response) -> UncleError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(operation, status, "Service returned an error status");
    UncleError::RemoteStatus {
        operation,
        status,
        body,
    }
}

/// Parse a JSON body; an empty body reads as `null`.
async fn read_json(operation: &'static str, response: Response) -> Result<Value> {
    let unexpected = |message: String| UncleError::UnexpectedResponse { operation, message };
    let text = response.text().await.map_err(|e| unexpected(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| unexpected(e.to_string()))
}

/// GET a JSON document; any non-2xx status is an error.
///
/// # Errors
///
/// Returns error on network failure, error status, or invalid JSON.
pub async fn get_json(client: &Client, url: &str, operation: &'static str) -> Result<Value> {
    tracing::debug!(operation, url, "GET");
    let response = send(client.get(url).timeout(DEFAULT_TIMEOUT)).await?;
    if !response.status().is_success() {
        return Err(remote_status(operation, response).await);
    }
    read_json(operation, response).await
}

/// POST a JSON body and require exactly `expected` back.
///
/// # Errors
///
/// Returns error on network failure, any other status, or invalid JSON.
pub async fn post_json<B: Serialize + Sync>(
    client: &Client,
    url: &str,
    body: &B,
    expected: StatusCode,
    operation: &'static str,
) -> Result<Value> {
    tracing::debug!(operation, url, "POST");
    let response = send(client.post(url).json(body).timeout(DEFAULT_TIMEOUT)).await?;
    if response.status() != expected {
        return Err(remote_status(operation, response).await);
    }
    read_json(operation, response).await
}

/// POST a JSON body and hand back the open response for streaming.
///
/// # Errors
///
/// Returns error on network failure or any status other than 200.
pub async fn post_stream<B: Serialize + Sync>(
    client: &Client,
    url: &str,
    body: &B,
    operation: &'static str,
) -> Result<Response> {
    tracing::debug!(operation, url, "POST (streaming)");
    let response = send(
        client
            .post(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(body),
    )
    .await?;
    if response.status() != StatusCode::OK {
        return Err(remote_status(operation, response).await);
    }
    Ok(response)
}
