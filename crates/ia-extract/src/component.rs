//! Extractor component: client setup from configuration and state, the
//! `run` action, and the sync actions.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use ledgerpipe_ia_auth::{jwt, AuthManager, OAuthClient, Session};
use ledgerpipe_ia_client::ClientConfig;
use ledgerpipe_ia_rest::{ExtractRequest, IntacctClient};

use crate::config::{Config, Parameters};
use crate::error::{Error, ErrorKind, Result};
use crate::state::{State, StateListener, StateStore};
use crate::writer::{table_columns, write_manifest, Manifest, TableWriter};

const PROGRESS_EVERY: u64 = 1000;

/// Component action, from the command line or the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Run,
    ListEndpoints,
    ListColumns,
    ListPrimaryKeys,
    TestConnection,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Run => "run",
            Action::ListEndpoints => "list_endpoints",
            Action::ListColumns => "list_columns",
            Action::ListPrimaryKeys => "list_primary_keys",
            Action::TestConnection => "testConnection",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "run" => Ok(Action::Run),
            "list_endpoints" => Ok(Action::ListEndpoints),
            "list_columns" => Ok(Action::ListColumns),
            "list_primary_keys" => Ok(Action::ListPrimaryKeys),
            "testConnection" => Ok(Action::TestConnection),
            other => Err(Error::new(ErrorKind::Config(format!(
                "Unknown action: {other}"
            )))),
        }
    }
}

/// One option of a sync action's select list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectElement {
    pub value: String,
    pub label: String,
}

impl SelectElement {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Where and how the component talks to Sage Intacct.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    pub client: ClientConfig,
    /// Token endpoint override.
    pub token_url: Option<String>,
}

/// Outcome of the `run` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: u64,
    pub table: PathBuf,
    pub columns: Vec<String>,
    /// Timestamp stored as the next watermark.
    pub last_run: String,
}

/// A configured, connected extractor.
#[derive(Debug)]
pub struct Component {
    data_dir: PathBuf,
    config: Config,
    action: Action,
    store: StateStore,
    auth_id: String,
    last_run: Option<String>,
    client: IntacctClient,
}

impl Component {
    /// Load configuration and state from `data_dir` and connect.
    ///
    /// `action` overrides the configuration's `action`, which defaults to
    /// `run`. The state file is written once the client is connected.
    pub async fn new(
        data_dir: impl Into<PathBuf>,
        action: Option<Action>,
        settings: ConnectionSettings,
    ) -> Result<Self> {
        let data_dir = data_dir.into();
        let config = Config::load(&data_dir)?;

        let action = match action {
            Some(action) => action,
            None => match config.action.as_deref() {
                Some(name) => name.parse()?,
                None => Action::Run,
            },
        };
        config.parameters.validate(action)?;

        let credentials = config.require_credentials()?.clone();
        let store = StateStore::new(&data_dir);
        let state = store.load()?;

        let (refresh_token, access_token) = match state.refresh_token_for(&credentials.id) {
            Some(token) => {
                info!("Using refresh token from state file");
                (token.to_string(), None)
            }
            None => {
                info!("Using refresh token from OAuth credentials");
                (
                    credentials.data.refresh_token.clone().unwrap_or_default(),
                    credentials.data.access_token.clone(),
                )
            }
        };

        if refresh_token.is_empty() {
            return Err(Error::new(ErrorKind::Config(
                "Refresh token not found in credentials or state file".to_string(),
            )));
        }

        let mut session = Session::new(
            credentials.app_key.as_str(),
            credentials.app_secret(),
            refresh_token,
        );
        if let Some(access_token) = access_token.filter(|t| !t.is_empty()) {
            jwt::decode_payload(&access_token).map_err(|e| {
                Error::with_source(
                    ErrorKind::Config(format!("Failed to decode JWT token: {e}")),
                    e,
                )
            })?;
            if let Some(company_id) = jwt::tenant_id(&access_token) {
                session = session.with_company_id(company_id);
            }
            session = session.with_access_token(access_token);
        }

        let mut oauth = OAuthClient::new()?;
        if let Some(token_url) = &settings.token_url {
            oauth = oauth.with_token_url(token_url.as_str())?;
        }

        let listener = StateListener::new(store.clone(), credentials.id.as_str(), state.last_run.clone());
        let auth = AuthManager::new(oauth, session).with_listener(listener);

        let mut client = IntacctClient::with_config(auth, settings.client)?;
        client.connect().await?;

        let component = Self {
            data_dir,
            config,
            action,
            store,
            auth_id: credentials.id,
            last_run: state.last_run,
            client,
        };
        component.save_state(component.last_run.clone())?;
        Ok(component)
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &IntacctClient {
        &self.client
    }

    fn parameters(&self) -> &Parameters {
        &self.config.parameters
    }

    /// Run the configured action. Sync actions return their JSON output.
    pub async fn execute_action(&mut self) -> Result<Option<Value>> {
        info!(action = %self.action, "Executing action");
        match self.action {
            Action::Run => {
                self.run().await?;
                Ok(None)
            }
            Action::ListEndpoints => Ok(Some(serde_json::to_value(self.list_endpoints().await?)?)),
            Action::ListColumns => Ok(Some(serde_json::to_value(self.list_columns().await?)?)),
            Action::ListPrimaryKeys => {
                Ok(Some(serde_json::to_value(self.list_primary_keys().await?)?))
            }
            Action::TestConnection => {
                self.test_connection().await?;
                Ok(Some(serde_json::json!({"status": "success"})))
            }
        }
    }

    /// Extract the configured endpoint into `out/tables/<table>`.
    #[instrument(skip(self), fields(endpoint = %self.parameters().endpoint))]
    pub async fn run(&mut self) -> Result<RunSummary> {
        let params = self.parameters().clone();
        info!("Downloading data for endpoint \"{}\".", params.endpoint);

        let mut request = ExtractRequest::new(params.endpoint.as_str()).with_fields(params.columns.iter().cloned());

        if params.destination.incremental() {
            let seed = self
                .last_run
                .clone()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| params.initial_since.clone());
            request = request.with_incremental(params.destination.incremental_field.as_str(), seed);
            if let Some((field, value)) = request.incremental_filter() {
                info!("Using incremental filtering: {field} >= {value}");
            }
        }

        if params.destination.primary_key.is_empty() {
            info!("Primary key not specified in configuration");
        }

        let table = self.data_dir.join("out").join("tables").join(params.table_name());
        let mut writer = TableWriter::create(&table)?;

        let mut extraction = self.client.extract(request);
        while let Some(batch) = extraction.next_batch().await? {
            if writer.rows_written() == 0 {
                writer.set_columns(table_columns(extraction.fields()))?;
            }
            let before = writer.rows_written();
            writer.write_rows(&batch)?;
            let total = writer.rows_written();
            if total / PROGRESS_EVERY > before / PROGRESS_EVERY {
                info!("Downloaded {total} rows so far.");
            }
        }
        drop(extraction);

        let rows = writer.rows_written();
        info!("Extraction complete. Total rows downloaded: {rows}");
        let columns = writer.finish()?;

        if rows > 0 {
            write_manifest(
                &table,
                &Manifest {
                    columns: columns.clone(),
                    primary_key: params.destination.primary_key.clone(),
                    incremental: params.destination.incremental(),
                },
            )?;
        }

        let last_run = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.save_state(Some(last_run.clone()))?;
        self.last_run = Some(last_run.clone());

        Ok(RunSummary {
            rows,
            table,
            columns,
            last_run,
        })
    }

    pub async fn list_endpoints(&mut self) -> Result<Vec<SelectElement>> {
        let names = self.client.list_object_names().await?;
        Ok(names.into_iter().map(SelectElement::new).collect())
    }

    pub async fn list_columns(&mut self) -> Result<Vec<SelectElement>> {
        let endpoint = self.parameters().endpoint.clone();
        let fields = self.client.get_object_fields(&endpoint).await?;
        Ok(fields.into_iter().map(|f| SelectElement::new(f.name)).collect())
    }

    /// The platform reports no key, so every field is offered.
    pub async fn list_primary_keys(&mut self) -> Result<Vec<SelectElement>> {
        self.list_columns().await
    }

    pub async fn test_connection(&mut self) -> Result<()> {
        self.client.list_objects().await?;
        Ok(())
    }

    fn save_state(&self, last_run: Option<String>) -> Result<()> {
        self.store.save(&State {
            refresh_token: Some(self.client.refresh_token().to_string()),
            auth_id: Some(self.auth_id.clone()),
            last_run,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
