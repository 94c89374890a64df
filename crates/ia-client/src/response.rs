//! HTTP response handling with Intacct-specific extensions.

use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{sanitize_error_message, Result};

/// Wrapper around HTTP response with additional functionality.
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Get a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// Get the Retry-After header as a Duration.
    ///
    /// Only the delay-seconds form is understood.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }

    /// Get the response body as text.
    pub async fn text(self) -> Result<String> {
        self.inner.text().await.map_err(Into::into)
    }

    /// Deserialize the response body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.inner.bytes().await?;
        serde_json::from_slice(&body).map_err(Into::into)
    }

    /// Consume the response and describe why it failed.
    ///
    /// Prefers the structured error body, then the raw body text, then the
    /// bare status code.
    pub async fn error_detail(self) -> String {
        let status = self.status();
        let body = self.inner.text().await.unwrap_or_default();
        describe_error_body(status, &body)
    }
}

/// Build a diagnostic string from a failed response body.
pub(crate) fn describe_error_body(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("HTTP {status}");
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(error) = structured_error(&value) {
            return format!("HTTP {status}: {}", sanitize_error_message(&error.to_string()));
        }
    }

    format!("HTTP {status}: {}", sanitize_error_message(trimmed))
}

/// Find the error object in an Intacct or OAuth error body.
fn structured_error(value: &serde_json::Value) -> Option<&serde_json::Value> {
    value
        .pointer("/ia::result/ia::error")
        .or_else(|| value.get("ia::error"))
        .or_else(|| value.get("error").filter(|_| value.get("error_description").is_none()))
        .or_else(|| value.get("error").map(|_| value))
}
