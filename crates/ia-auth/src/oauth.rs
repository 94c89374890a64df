//! OAuth 2.0 refresh-token grant against the Sage Intacct token endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{Error, ErrorKind, Result};

/// Timeout for a single token exchange.
const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth client for the token endpoint.
#[derive(Clone)]
pub struct OAuthClient {
    token_url: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

impl OAuthClient {
    /// Create an OAuth client for the default token endpoint.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(TOKEN_TIMEOUT)
            .user_agent(ledgerpipe_ia_client::USER_AGENT)
            .build()?;

        Ok(Self {
            token_url: crate::DEFAULT_TOKEN_URL.to_string(),
            http_client,
        })
    }

    /// Point the client at a different token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Result<Self> {
        let token_url = token_url.into();
        url::Url::parse(&token_url)?;
        self.token_url = token_url;
        Ok(self)
    }

    /// The token endpoint in use.
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token and client secret are not logged.
    #[instrument(skip(self, refresh_token, client_secret))]
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];

        let body = serde_urlencoded::to_string(params)?;

        let response = self
            .http_client
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await?;

        self.handle_token_response(response).await
    }

    /// Handle a token response, checking for errors.
    async fn handle_token_response(&self, response: reqwest::Response) -> Result<TokenResponse> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::new(oauth_error(status.as_u16(), &text)));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token)
    }
}

/// Turn a failed token response into an error kind without echoing secrets.
fn oauth_error(status: u16, body: &str) -> ErrorKind {
    match serde_json::from_str::<OAuthErrorResponse>(body) {
        Ok(error) => ErrorKind::OAuth {
            error: error.error,
            description: error
                .error_description
                .unwrap_or_else(|| format!("HTTP {status}")),
        },
        Err(_) => {
            let body = body.trim();
            let description = if body.is_empty() {
                format!("HTTP {status}")
            } else {
                format!(
                    "HTTP {status}: {}",
                    ledgerpipe_ia_client::sanitize_error_message(body)
                )
            };
            ErrorKind::OAuth {
                error: "token_request_failed".to_string(),
                description,
            }
        }
    }
}

/// Token response from the token endpoint.
///
/// Tokens are redacted in Debug output.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Access token. Absent only on a malformed response.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Refresh token, present when the server rotates it.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token type (usually "Bearer").
    #[serde(default)]
    pub token_type: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// OAuth error response.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}
