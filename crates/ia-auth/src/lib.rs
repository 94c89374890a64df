//! # ia-auth
//!
//! Sage Intacct authentication: the OAuth 2.0 refresh-token grant and the
//! session it maintains.
//!
//! ## Security
//!
//! - Secrets and tokens are redacted in Debug output
//! - Tracing skips credential parameters
//! - Error messages never carry token values
//!
//! ## Token rotation
//!
//! The token endpoint may return a new refresh token on any refresh. The
//! [`AuthManager`] replaces the stored one in place and notifies a registered
//! [`RotationListener`] before returning, so the caller can persist it before
//! any later call has a chance to fail.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledgerpipe_ia_auth::{AuthManager, OAuthClient, Session};
//!
//! let session = Session::new("app-key", "app-secret", "refresh-token");
//! let mut auth = AuthManager::new(OAuthClient::new()?, session)
//!     .with_listener(|token: &str| persist(token));
//! auth.authenticate().await?;
//! ```

mod error;
pub mod jwt;
mod manager;
mod oauth;
mod session;

pub use error::{Error, ErrorKind, Result};
pub use manager::{AuthManager, RotationListener};
pub use oauth::{OAuthClient, TokenResponse};
pub use session::Session;

/// Default Sage Intacct OAuth 2.0 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://api.intacct.com/ia/api/v1/oauth2/token";
