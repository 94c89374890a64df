//! Sage Intacct REST API client.
//!
//! Owns the HTTP executor and the auth manager. Every call goes through the
//! executor with `&mut` access to the session, so token refreshes and
//! rotations happen in place, one request at a time.

use serde::{de::DeserializeOwned, Serialize};

use ledgerpipe_ia_auth::{AuthManager, Session};
use ledgerpipe_ia_client::{ClientConfig, IaHttpClient};

use crate::error::Result;

mod model;
mod query;

/// Sage Intacct REST API client.
///
/// # Example
///
/// ```rust,ignore
/// use ledgerpipe_ia_rest::{ExtractRequest, IntacctClient};
///
/// let mut client = IntacctClient::new(auth)?;
/// client.connect().await?;
///
/// let objects = client.list_object_names().await?;
/// let mut extraction = client.extract(ExtractRequest::new("accounts-payable/vendor"));
/// while let Some(batch) = extraction.next_batch().await? {
///     write(batch)?;
/// }
/// let token_to_persist = client.refresh_token();
/// ```
#[derive(Debug)]
pub struct IntacctClient {
    http: IaHttpClient,
    auth: AuthManager,
}

impl IntacctClient {
    /// Create a client with the default HTTP configuration.
    pub fn new(auth: AuthManager) -> Result<Self> {
        Self::with_config(auth, ClientConfig::default())
    }

    /// Create a client with custom HTTP configuration.
    pub fn with_config(auth: AuthManager, config: ClientConfig) -> Result<Self> {
        let http = IaHttpClient::new(config)?;
        Ok(Self { http, auth })
    }

    /// Authenticate now unless an access token is already held.
    pub async fn connect(&mut self) -> Result<()> {
        if self.auth.session().access_token().is_none() {
            self.auth.authenticate().await?;
        }
        Ok(())
    }

    pub fn http(&self) -> &IaHttpClient {
        &self.http
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    pub fn session(&self) -> &Session {
        self.auth.session()
    }

    /// The current refresh token, for persistence after a run.
    pub fn refresh_token(&self) -> &str {
        self.auth.refresh_token()
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &mut self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let mut request = self.http.get(path);
        for (name, value) in params {
            request = request.query(*name, *value);
        }
        self.http
            .execute_json(&mut self.auth, &request)
            .await
            .map_err(Into::into)
    }

    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize>(
        &mut self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.http.post(path).json(body)?;
        self.http
            .execute_json(&mut self.auth, &request)
            .await
            .map_err(Into::into)
    }
}
