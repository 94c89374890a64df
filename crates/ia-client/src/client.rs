//! Core HTTP client: the resilient request executor.

use std::future::Future;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestBuilder, RequestMethod};
use crate::response::Response;
use crate::retry::RetryPolicy;

/// Source of the bearer token applied to every request.
///
/// Implemented by the auth manager in `ia-auth`. The executor holds it by
/// `&mut` for the duration of a call, so token replacement never races.
pub trait Authenticator: Send {
    /// The current access token, if one is held.
    fn access_token(&self) -> Option<&str>;

    /// Obtain a fresh access token. Failures are terminal for the request.
    fn refresh(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// HTTP client for the Intacct REST API with built-in retry and re-authentication.
#[derive(Debug, Clone)]
pub struct IaHttpClient {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl IaHttpClient {
    /// Create a new HTTP client.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(config.accept_compressed)
            .deflate(config.accept_compressed)
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        Ok(Self { inner, config })
    }

    /// Create a new HTTP client with default configuration.
    pub fn default_client() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the full URL for a path.
    ///
    /// Paths starting with `http://` or `https://` are used as-is; anything
    /// else is appended to the configured base URL.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.config.base_url, path)
        } else {
            format!("{}/{}", self.config.base_url, path)
        }
    }

    /// Create a GET request builder for a path.
    pub fn get(&self, path: &str) -> RequestBuilder {
        RequestBuilder::new(RequestMethod::Get, self.url(path))
    }

    /// Create a POST request builder for a path.
    pub fn post(&self, path: &str) -> RequestBuilder {
        RequestBuilder::new(RequestMethod::Post, self.url(path))
    }

    /// Execute a request with authentication, retry and rate-limit handling.
    ///
    /// - No access token held: authenticate before the first attempt.
    /// - HTTP 401: refresh the access token and retry. Does not consume the
    ///   attempt budget, but is bounded by `max_auth_refreshes`.
    /// - HTTP 429: wait `Retry-After` seconds (default 60) and retry.
    /// - Any other non-2xx or transport error: exponential backoff and retry.
    ///
    /// When the attempt budget runs out the error carries the server's
    /// error body, the raw body text, or the transport error message.
    #[instrument(skip(self, auth, request), fields(method = ?request.method, url = %request.url))]
    pub async fn execute<A: Authenticator>(
        &self,
        auth: &mut A,
        request: &RequestBuilder,
    ) -> Result<Response> {
        if auth.access_token().is_none() {
            auth.refresh().await?;
        }

        let mut policy = RetryPolicy::new(self.config.retry.clone());

        loop {
            let token = auth
                .access_token()
                .ok_or_else(|| {
                    Error::new(ErrorKind::Authentication(
                        "no access token after authentication".to_string(),
                    ))
                })?
                .to_string();

            let response = match self.execute_once(request, &token).await {
                Ok(response) => response,
                Err(err) => {
                    let Some(delay) = policy.record_failure() else {
                        return Err(Error::with_source(
                            ErrorKind::RequestFailed {
                                attempts: policy.attempt(),
                                detail: err.to_string(),
                            },
                            err,
                        ));
                    };
                    warn!(
                        attempt = policy.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Request failed, retrying"
                    );
                    self.config.sleeper.sleep(delay).await;
                    continue;
                }
            };

            let status = response.status();

            if response.is_success() {
                return Ok(response);
            }

            if status == 401 {
                if !policy.record_auth_refresh() {
                    let detail = response.error_detail().await;
                    return Err(Error::new(ErrorKind::Authentication(format!(
                        "access token rejected after {} refresh(es): {detail}",
                        policy.auth_refreshes()
                    ))));
                }
                info!("Access token expired, refreshing");
                auth.refresh().await?;
                continue;
            }

            if status == 429 {
                let retry_after = response.retry_after();
                let Some(delay) = policy.record_rate_limit(retry_after) else {
                    return Err(Error::new(ErrorKind::RequestFailed {
                        attempts: policy.attempt(),
                        detail: response.error_detail().await,
                    }));
                };
                warn!(
                    attempt = policy.attempt(),
                    wait_secs = delay.as_secs(),
                    "Rate limited, waiting before retry"
                );
                self.config.sleeper.sleep(delay).await;
                continue;
            }

            let detail = response.error_detail().await;
            let Some(delay) = policy.record_failure() else {
                return Err(Error::new(ErrorKind::RequestFailed {
                    attempts: policy.attempt(),
                    detail,
                }));
            };
            warn!(
                attempt = policy.attempt(),
                status,
                delay_ms = delay.as_millis() as u64,
                detail = %detail,
                "Request failed, retrying"
            );
            self.config.sleeper.sleep(delay).await;
        }
    }

    /// Execute a request and deserialize the JSON response.
    pub async fn execute_json<A: Authenticator, T: serde::de::DeserializeOwned>(
        &self,
        auth: &mut A,
        request: &RequestBuilder,
    ) -> Result<T> {
        let response = self.execute(auth, request).await?;
        response.json().await
    }

    /// Execute a single request without retry logic.
    async fn execute_once(&self, request: &RequestBuilder, token: &str) -> Result<Response> {
        let url = request.full_url()?;
        let mut req = self
            .inner
            .request(request.method.to_reqwest(), url)
            .bearer_auth(token);

        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        if self.config.enable_tracing {
            debug!(method = ?request.method, url = %request.url, "Sending request");
        }

        let response = req.send().await?;

        if self.config.enable_tracing {
            let status = response.status().as_u16();
            let content_length = response.content_length();

            if response.status().is_success() {
                debug!(status, content_length, "Response received");
            } else {
                info!(status, content_length, "Non-success response");
            }
        }

        Ok(Response::new(response))
    }
}
