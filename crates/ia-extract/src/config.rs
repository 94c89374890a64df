//! Component configuration (`config.json`).
//!
//! ```json
//! {
//!   "action": "run",
//!   "parameters": {
//!     "endpoint": "accounts-payable/vendor",
//!     "columns": ["key", "id", "name"],
//!     "initial_since": "2024-01-01T00:00:00Z",
//!     "destination": {
//!       "table_name": "vendors.csv",
//!       "load_type": "incremental_load",
//!       "incremental_field": "audit.modifiedDateTime",
//!       "primary_key": ["key"]
//!     },
//!     "debug": false
//!   },
//!   "authorization": {"oauth_api": {"credentials": {
//!     "id": "auth-1", "appKey": "...", "#appSecret": "...",
//!     "data": {"refresh_token": "...", "access_token": "..."}
//!   }}}
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::component::Action;
use crate::error::{Error, ErrorKind, Result};

/// Config file name inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    FullLoad,
    #[default]
    IncrementalLoad,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Destination {
    pub table_name: String,
    pub load_type: LoadType,
    pub incremental_field: String,
    pub primary_key: Vec<String>,
}

impl Destination {
    pub fn incremental(&self) -> bool {
        self.load_type == LoadType::IncrementalLoad
    }
}

/// User parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub endpoint: String,
    pub columns: Vec<String>,
    pub initial_since: String,
    pub destination: Destination,
    pub debug: bool,
}

impl Parameters {
    /// Check the parameters an action needs, reporting every problem at once.
    pub fn validate(&self, action: Action) -> Result<()> {
        let mut problems = Vec::new();

        let needs_endpoint = matches!(
            action,
            Action::Run | Action::ListColumns | Action::ListPrimaryKeys
        );
        if needs_endpoint && self.endpoint.trim().is_empty() {
            problems.push("endpoint: field required");
        }

        if action == Action::Run
            && self.destination.incremental()
            && self.destination.incremental_field.trim().is_empty()
        {
            problems.push("destination.incremental_field: required for incremental_load");
        }

        if self.columns.iter().any(|c| c.trim().is_empty()) {
            problems.push("columns: column names must not be empty");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(validation_error(problems.join(", ")))
        }
    }

    /// Output table file name: the configured one, or `<endpoint>.csv` with
    /// path separators replaced.
    pub fn table_name(&self) -> String {
        if !self.destination.table_name.is_empty() {
            return self.destination.table_name.clone();
        }
        format!("{}.csv", self.endpoint.replace(['/', '\\'], "_"))
    }
}

/// OAuth token pair stored with the credentials.
#[derive(Clone, Default, Deserialize)]
pub struct OAuthData {
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for OAuthData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthData")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Authorized OAuth application credentials.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub id: String,
    pub app_key: String,
    app_secret: String,
    pub data: OAuthData,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("id", &self.id)
            .field("app_key", &self.app_key)
            .field("app_secret", &"[REDACTED]")
            .field("data", &self.data)
            .finish()
    }
}

impl OAuthCredentials {
    pub fn new(
        id: impl Into<String>,
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        data: OAuthData,
    ) -> Self {
        Self {
            id: id.into(),
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            data,
        }
    }

    pub fn app_secret(&self) -> &str {
        &self.app_secret
    }
}

#[derive(Deserialize)]
struct RawCredentials {
    #[serde(default)]
    id: String,
    #[serde(rename = "appKey", default)]
    app_key: String,
    #[serde(rename = "#appSecret", default)]
    app_secret: String,
    #[serde(default)]
    data: Value,
}

/// Parsed configuration file.
#[derive(Debug, Clone)]
pub struct Config {
    pub action: Option<String>,
    pub parameters: Parameters,
    pub credentials: Option<OAuthCredentials>,
}

impl Config {
    /// Read `<data_dir>/config.json`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            Error::with_source(
                ErrorKind::Config(format!(
                    "Unable to read configuration file {}: {e}",
                    path.display()
                )),
                e,
            )
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text).map_err(|e| {
            Error::with_source(
                ErrorKind::Config(format!("Configuration is not valid JSON: {e}")),
                e,
            )
        })?;

        let action = root
            .get("action")
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        let parameters = match root.get("parameters") {
            Some(Value::Object(map)) if !map.is_empty() => Parameters::deserialize(&root["parameters"])
                .map_err(|e| validation_error(format!("parameters: {e}")))?,
            _ => {
                return Err(Error::new(ErrorKind::Config(
                    "Configuration parameters are missing. Please add a configuration row."
                        .to_string(),
                )))
            }
        };

        let credentials = match root.pointer("/authorization/oauth_api/credentials") {
            Some(value @ Value::Object(_)) => Some(parse_credentials(value)?),
            _ => None,
        };

        Ok(Self {
            action,
            parameters,
            credentials,
        })
    }

    /// The credentials, or a "not authorized" error.
    pub fn require_credentials(&self) -> Result<&OAuthCredentials> {
        self.credentials.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::NotAuthorized(
                "The configuration is not authorized. Please authorize it first.".to_string(),
            ))
        })
    }
}

fn parse_credentials(value: &Value) -> Result<OAuthCredentials> {
    let raw = RawCredentials::deserialize(value)
        .map_err(|e| validation_error(format!("authorization: {e}")))?;

    let data = match raw.data {
        Value::Null => OAuthData::default(),
        Value::String(text) => serde_json::from_str(&text).map_err(|e| {
            Error::with_source(
                ErrorKind::Config(format!("Failed to parse OAuth credentials: {e}")),
                e,
            )
        })?,
        other => OAuthData::deserialize(&other).map_err(|e| {
            Error::with_source(
                ErrorKind::Config(format!("Failed to parse OAuth credentials: {e}")),
                e,
            )
        })?,
    };

    Ok(OAuthCredentials {
        id: raw.id,
        app_key: raw.app_key,
        app_secret: raw.app_secret,
        data,
    })
}

fn validation_error(detail: impl std::fmt::Display) -> Error {
    Error::new(ErrorKind::Config(format!("Validation Error: {detail}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: Value) -> Result<Config> {
        Config::from_json(&value.to_string())
    }

    #[test]
    fn test_full_config() {
        let cfg = config(json!({
            "action": "list_columns",
            "parameters": {
                "endpoint": "accounts-payable/vendor",
                "columns": ["key", "name"],
                "initial_since": "2024-01-01",
                "destination": {
                    "table_name": "vendors.csv",
                    "load_type": "full_load",
                    "primary_key": ["key"]
                },
                "debug": true
            },
            "authorization": {"oauth_api": {"credentials": {
                "id": "auth-1",
                "appKey": "key",
                "#appSecret": "secret",
                "data": {"refresh_token": "rt", "access_token": "at"}
            }}}
        }))
        .unwrap();

        assert_eq!(cfg.action.as_deref(), Some("list_columns"));
        assert_eq!(cfg.parameters.endpoint, "accounts-payable/vendor");
        assert!(!cfg.parameters.destination.incremental());
        assert!(cfg.parameters.debug);

        let creds = cfg.require_credentials().unwrap();
        assert_eq!(creds.id, "auth-1");
        assert_eq!(creds.app_secret(), "secret");
        assert_eq!(creds.data.refresh_token.as_deref(), Some("rt"));
    }

    #[test]
    fn test_defaults() {
        let cfg = config(json!({"parameters": {"endpoint": "gl/account"}})).unwrap();
        let params = &cfg.parameters;

        assert!(params.columns.is_empty());
        assert!(params.destination.incremental());
        assert_eq!(params.table_name(), "gl_account.csv");
        assert!(cfg.credentials.is_none());
        assert!(cfg.require_credentials().unwrap_err().is_user_error());
    }

    #[test]
    fn test_credentials_data_as_json_string() {
        let cfg = config(json!({
            "parameters": {"endpoint": "gl/account"},
            "authorization": {"oauth_api": {"credentials": {
                "id": "a", "appKey": "k", "#appSecret": "s",
                "data": "{\"refresh_token\": \"rt-from-string\"}"
            }}}
        }))
        .unwrap();

        let creds = cfg.credentials.unwrap();
        assert_eq!(creds.data.refresh_token.as_deref(), Some("rt-from-string"));
        assert_eq!(creds.data.access_token, None);
    }

    #[test]
    fn test_malformed_credentials_data() {
        let err = config(json!({
            "parameters": {"endpoint": "gl/account"},
            "authorization": {"oauth_api": {"credentials": {"data": "not json"}}}
        }))
        .unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse OAuth credentials"));
    }

    #[test]
    fn test_missing_parameters() {
        for value in [json!({}), json!({"parameters": {}})] {
            let err = config(value).unwrap_err();
            assert!(err.to_string().contains("Configuration parameters are missing"));
        }
    }

    #[test]
    fn test_type_errors_are_validation_errors() {
        let err = config(json!({"parameters": {"endpoint": "x", "debug": "yes"}})).unwrap_err();
        assert!(err.to_string().starts_with("Validation Error: parameters:"), "{err}");

        let err = config(json!({"parameters": {"destination": {"load_type": "sometimes"}}}))
            .unwrap_err();
        assert!(err.to_string().starts_with("Validation Error:"), "{err}");
    }

    #[test]
    fn test_validation_collects_problems() {
        let params = Parameters {
            columns: vec!["key".into(), " ".into()],
            ..Default::default()
        };

        let err = params.validate(Action::Run).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation Error: endpoint: field required, \
             destination.incremental_field: required for incremental_load, \
             columns: column names must not be empty"
        );
    }

    #[test]
    fn test_validation_depends_on_action() {
        let params = Parameters::default();
        assert!(params.validate(Action::ListEndpoints).is_ok());
        assert!(params.validate(Action::TestConnection).is_ok());
        assert!(params.validate(Action::ListColumns).is_err());

        let params = Parameters {
            endpoint: "gl/account".into(),
            destination: Destination {
                load_type: LoadType::FullLoad,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(params.validate(Action::Run).is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = OAuthCredentials::new(
            "id",
            "key",
            "app_secret_value",
            OAuthData {
                refresh_token: Some("refresh_value".into()),
                access_token: Some("access_value".into()),
            },
        );
        let debug_output = format!("{:?}", creds);
        assert!(!debug_output.contains("app_secret_value"));
        assert!(!debug_output.contains("refresh_value"));
        assert!(!debug_output.contains("access_value"));
    }
}
