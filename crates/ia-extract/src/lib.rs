//! # ia-extract
//!
//! Sage Intacct extractor component built on `ledgerpipe-ia-rest`.
//!
//! Reads `config.json` and `in/state.json` from a data directory, connects
//! with the stored (possibly rotated) refresh token, and either extracts one
//! endpoint into `out/tables/<table>.csv` with a manifest or answers a sync
//! action (`list_endpoints`, `list_columns`, `list_primary_keys`,
//! `testConnection`). The current refresh token and the incremental
//! watermark are kept in `out/state.json`.
//!
//! ```rust,ignore
//! use ledgerpipe_ia_extract::{Component, ConnectionSettings};
//!
//! let mut component = Component::new("/data", None, ConnectionSettings::default()).await?;
//! if let Some(output) = component.execute_action().await? {
//!     println!("{output}");
//! }
//! ```

mod component;
mod config;
mod error;
mod state;
mod writer;

pub use component::{Action, Component, ConnectionSettings, RunSummary, SelectElement};
pub use config::{
    Config, Destination, LoadType, OAuthCredentials, OAuthData, Parameters, CONFIG_FILE,
};
pub use error::{Error, ErrorKind, Result};
pub use state::{State, StateListener, StateStore, STATE_FILE};
pub use writer::{table_columns, write_manifest, Manifest, TableWriter};
