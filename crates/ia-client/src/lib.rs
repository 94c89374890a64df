//! # ia-client
//!
//! Core HTTP client infrastructure for the Sage Intacct REST API.
//!
//! This crate provides the foundational HTTP client with:
//! - Re-authentication when the server rejects the access token (HTTP 401)
//! - Rate limit handling that honours the server's `Retry-After` (HTTP 429)
//! - Exponential backoff on transport failures and other non-2xx responses
//! - Terminal errors that carry the server's structured error body
//! - Request/response tracing
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │  (ia-rest: metadata resolver, paginated extractor)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    IaHttpClient::execute                    │
//! │  - Authenticates first if no access token is held           │
//! │  - 401 → Authenticator::refresh, retry                      │
//! │  - 429 → sleep Retry-After, retry                           │
//! │  - other failures → exponential backoff, retry              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    reqwest::Client                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The token state itself lives behind the [`Authenticator`] trait, which
//! `ia-auth` implements. The executor is strictly sequential: it borrows the
//! authenticator mutably for the whole call.

mod client;
mod config;
mod error;
mod request;
mod response;
mod retry;

pub use client::{Authenticator, IaHttpClient};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{sanitize_error_message, Error, ErrorKind, Result};
pub use request::{RequestBuilder, RequestMethod};
pub use response::Response;
pub use retry::{BackoffStrategy, RecordingSleeper, RetryConfig, RetryPolicy, Sleeper, TokioSleeper};

/// Default base URL of the Sage Intacct REST API.
pub const DEFAULT_BASE_URL: &str = "https://api.intacct.com/ia/api/v1";

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("ledgerpipe-intacct/", env!("CARGO_PKG_VERSION"));
