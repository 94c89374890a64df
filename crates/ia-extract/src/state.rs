//! State file: the current refresh token and the incremental watermark.
//!
//! Read from `<data_dir>/in/state.json`, written to `<data_dir>/out/state.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use ledgerpipe_ia_auth::RotationListener;

use crate::error::{Error, ErrorKind, Result};

pub const STATE_FILE: &str = "state.json";

/// Persisted run state.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(rename = "#refresh_token", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Credentials id the refresh token belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_id: Option<String>,
    /// Completion time of the last successful run (UTC, RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<String>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("auth_id", &self.auth_id)
            .field("last_run", &self.last_run)
            .finish()
    }
}

impl State {
    /// The stored refresh token, if it was issued for `auth_id`.
    pub fn refresh_token_for(&self, auth_id: &str) -> Option<&str> {
        let token = self.refresh_token.as_deref().filter(|t| !t.is_empty())?;
        (self.auth_id.as_deref() == Some(auth_id)).then_some(token)
    }
}

/// Reads the input state and writes the output state.
#[derive(Debug, Clone)]
pub struct StateStore {
    in_path: PathBuf,
    out_path: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            in_path: data_dir.join("in").join(STATE_FILE),
            out_path: data_dir.join("out").join(STATE_FILE),
        }
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    /// Load the input state. A missing or empty file is an empty state.
    pub fn load(&self) -> Result<State> {
        if !self.in_path.exists() {
            return Ok(State::default());
        }

        let json = std::fs::read_to_string(&self.in_path)?;
        if json.trim().is_empty() {
            return Ok(State::default());
        }

        serde_json::from_str(&json).map_err(|e| {
            Error::with_source(
                ErrorKind::State(format!("{}: {e}", self.in_path.display())),
                e,
            )
        })
    }

    /// Write the output state, readable by the owner only.
    pub fn save(&self, state: &State) -> Result<()> {
        if let Some(dir) = self.out_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.out_path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.out_path, perms)?;
        }

        Ok(())
    }
}

/// Persists every rotated refresh token as soon as it is issued.
#[derive(Debug, Clone)]
pub struct StateListener {
    store: StateStore,
    auth_id: String,
    last_run: Option<String>,
}

impl StateListener {
    /// `last_run` is carried over so a rotation mid-run keeps the previous watermark.
    pub fn new(store: StateStore, auth_id: impl Into<String>, last_run: Option<String>) -> Self {
        Self {
            store,
            auth_id: auth_id.into(),
            last_run,
        }
    }
}

impl RotationListener for StateListener {
    fn on_rotated(&self, refresh_token: &str) {
        let state = State {
            refresh_token: Some(refresh_token.to_string()),
            auth_id: Some(self.auth_id.clone()),
            last_run: self.last_run.clone(),
        };

        match self.store.save(&state) {
            Ok(()) => debug!("Saved rotated refresh token to state file"),
            Err(e) => error!(error = %e, "Failed to save rotated refresh token to state file"),
        }
    }
}
