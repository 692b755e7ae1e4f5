// src/http.rs
//! Shared outbound HTTP client and the transient/permanent error split.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::FetchError;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; sentiment-poller/0.1)";

/// Status codes worth another attempt.
const RETRY_ON_STATUS: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// One pooled client for the whole process. Per-request timeouts are applied by
/// the adapters from their own settings.
pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRY_ON_STATUS.contains(&status.as_u16()) || status.is_server_error()
}

/// Map a transport failure onto the fetch taxonomy.
pub fn classify_reqwest_error(err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::transient(format!("request timeout: {err}"));
    }
    if err.is_connect() {
        return FetchError::transient(format!("connection failed: {err}"));
    }
    if let Some(status) = err.status() {
        return status_error(status, &err.to_string());
    }
    if err.is_decode() || err.is_builder() {
        return FetchError::permanent(format!("bad request or response: {err}"));
    }
    // body read interrupted, connection reset mid-flight, ...
    FetchError::transient(format!("request failed: {err}"))
}

fn status_error(status: StatusCode, detail: &str) -> FetchError {
    if is_retryable_status(status) {
        FetchError::transient(format!("HTTP {status}: {detail}"))
    } else {
        FetchError::permanent(format!("HTTP {status}: {detail}"))
    }
}

/// Send and require a 2xx, returning the body as text.
pub async fn send_text(req: RequestBuilder, timeout: Duration) -> Result<String, FetchError> {
    let resp = req
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_reqwest_error(&e))?;
    let status = resp.status();
    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("unexpected status");
        return Err(status_error(status, reason));
    }
    resp.text().await.map_err(|e| classify_reqwest_error(&e))
}

/// Send, require a 2xx, and decode JSON. A body that does not match `T` is permanent.
pub async fn send_json<T: DeserializeOwned>(
    req: RequestBuilder,
    timeout: Duration,
) -> Result<T, FetchError> {
    let body = send_text(req, timeout).await?;
    serde_json::from_str(&body).map_err(|e| FetchError::permanent(format!("invalid JSON: {e}")))
}
