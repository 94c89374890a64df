//! # ledgerpipe-intacct
//!
//! Sage Intacct data extraction client for Rust.
//!
//! Authenticates with the OAuth refresh-token grant (following rotations),
//! discovers objects and fields through the model endpoint, and streams
//! paginated query results in fixed-size batches while handling expired
//! tokens, rate limiting, transient failures and unknown-field errors.
//!
//! ## Security
//!
//! - Secrets (app secret, access and refresh tokens) are redacted in Debug output
//! - Tracing skips credential parameters
//! - Error messages sanitize token-like text
//!
//! ## Crates
//!
//! - **ledgerpipe-ia-client** - HTTP executor with retry, re-authentication and rate-limit waits
//! - **ledgerpipe-ia-auth** - Session, refresh-token grant, rotation listener, JWT tenant id
//! - **ledgerpipe-ia-rest** - Object model discovery and paginated extraction
//! - **ledgerpipe-ia-extract** - Extractor component: config, state, CSV output, sync actions
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ledgerpipe_intacct::{AuthManager, ExtractRequest, IntacctClient, OAuthClient, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new("app-key", "app-secret", "refresh-token");
//!     let auth = AuthManager::new(OAuthClient::new()?, session)
//!         .with_listener(|token: &str| persist(token));
//!
//!     let mut client = IntacctClient::new(auth)?;
//!     client.connect().await?;
//!
//!     let mut extraction = client.extract(
//!         ExtractRequest::new("accounts-payable/vendor")
//!             .with_incremental("audit.modifiedDateTime", "2024-01-01T00:00:00Z"),
//!     );
//!     while let Some(batch) = extraction.next_batch().await? {
//!         println!("{} records", batch.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

// Re-export all crates for convenient access
#[cfg(feature = "auth")]
pub use ledgerpipe_ia_auth as auth;
#[cfg(feature = "client")]
pub use ledgerpipe_ia_client as client;
#[cfg(feature = "extract")]
pub use ledgerpipe_ia_extract as extract;
#[cfg(feature = "rest")]
pub use ledgerpipe_ia_rest as rest;

// Re-export commonly used types at the top level
#[cfg(feature = "auth")]
pub use ledgerpipe_ia_auth::{AuthManager, OAuthClient, RotationListener, Session};
#[cfg(feature = "client")]
pub use ledgerpipe_ia_client::{ClientConfig, RetryConfig};
#[cfg(feature = "extract")]
pub use ledgerpipe_ia_extract::{Action, Component, ConnectionSettings};
#[cfg(feature = "rest")]
pub use ledgerpipe_ia_rest::{ExtractRequest, IntacctClient, RecordBatch};
