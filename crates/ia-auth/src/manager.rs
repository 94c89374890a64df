//! Session ownership, token refresh and rotation notification.

use tracing::{debug, info, instrument};

use crate::error::{Error, ErrorKind, Result};
use crate::jwt;
use crate::oauth::OAuthClient;
use crate::session::Session;

/// Observer notified when the server rotates the refresh token.
///
/// Called synchronously from inside [`AuthManager::authenticate`], before it
/// returns, with the new refresh token. Implementations persist the token and
/// must not fail the authentication; report persistence errors on their own.
pub trait RotationListener: Send + Sync {
    fn on_rotated(&self, refresh_token: &str);
}

impl<F> RotationListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_rotated(&self, refresh_token: &str) {
        self(refresh_token)
    }
}

/// Owns the session and keeps its access token fresh.
pub struct AuthManager {
    oauth: OAuthClient,
    session: Session,
    listener: Option<Box<dyn RotationListener>>,
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("oauth", &self.oauth)
            .field("session", &self.session)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl AuthManager {
    pub fn new(oauth: OAuthClient, session: Session) -> Self {
        Self {
            oauth,
            session,
            listener: None,
        }
    }

    /// Register the rotation observer.
    pub fn with_listener(mut self, listener: impl RotationListener + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The current, possibly rotated, refresh token.
    pub fn refresh_token(&self) -> &str {
        self.session.refresh_token()
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// A rotated refresh token replaces the stored one and is handed to the
    /// listener before this returns. On success an access token is held.
    #[instrument(skip(self), fields(app_key = %self.session.app_key()))]
    pub async fn authenticate(&mut self) -> Result<()> {
        info!("Authenticating with Sage Intacct");

        let token = self
            .oauth
            .refresh_token(
                self.session.refresh_token(),
                self.session.app_key(),
                self.session.app_secret(),
            )
            .await?;

        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::new(ErrorKind::MissingAccessToken))?;

        if self.session.company_id().is_empty() {
            if let Some(company_id) = jwt::tenant_id(&access_token) {
                debug!(company_id = %company_id, "Tenant id taken from access token");
                self.session.set_company_id(company_id);
            }
        }
        self.session.set_access_token(access_token);

        if let Some(rotated) = token.refresh_token.filter(|t| !t.is_empty()) {
            self.session.set_refresh_token(rotated);
            info!("Refresh token was rotated, updating stored token");
            if let Some(listener) = &self.listener {
                listener.on_rotated(self.session.refresh_token());
            }
        }

        info!("Successfully authenticated with Sage Intacct");
        Ok(())
    }
}

impl ledgerpipe_ia_client::Authenticator for AuthManager {
    fn access_token(&self) -> Option<&str> {
        self.session.access_token()
    }

    async fn refresh(&mut self) -> ledgerpipe_ia_client::Result<()> {
        self.authenticate().await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encode_test_token;
    use ledgerpipe_ia_client::Authenticator;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn manager_for(server: &MockServer, session: Session) -> AuthManager {
        let oauth = OAuthClient::new()
            .unwrap()
            .with_token_url(format!("{}/oauth2/token", server.uri()))
            .unwrap();
        AuthManager::new(oauth, session)
    }

    async fn mount_token(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_rotation_replaces_token_and_notifies_once() {
        let server = MockServer::start().await;
        mount_token(
            &server,
            serde_json::json!({"access_token": "at-new", "refresh_token": "rt-new"}),
        )
        .await;

        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen_clone = seen.clone();
        let mut auth = manager_for(&server, Session::new("key", "secret", "rt-old"))
            .await
            .with_listener(move |token: &str| seen_clone.lock().unwrap().push(token.to_string()));

        auth.authenticate().await.unwrap();

        assert_eq!(auth.refresh_token(), "rt-new");
        assert_eq!(auth.session().access_token(), Some("at-new"));
        assert_eq!(*seen.lock().unwrap(), vec!["rt-new".to_string()]);
    }

    #[tokio::test]
    async fn test_no_rotation_keeps_token_and_skips_listener() {
        let server = MockServer::start().await;
        mount_token(&server, serde_json::json!({"access_token": "at-new"})).await;

        let calls = Arc::new(Mutex::new(0u32));
        let calls_clone = calls.clone();
        let mut auth = manager_for(&server, Session::new("key", "secret", "rt-old"))
            .await
            .with_listener(move |_: &str| *calls_clone.lock().unwrap() += 1);

        auth.authenticate().await.unwrap();

        assert_eq!(auth.refresh_token(), "rt-old");
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_uses_current_refresh_token_after_rotation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("refresh_token=rt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"access_token": "at-1", "refresh_token": "rt-2"}),
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("refresh_token=rt-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"access_token": "at-2"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut auth = manager_for(&server, Session::new("key", "secret", "rt-1")).await;
        auth.authenticate().await.unwrap();
        auth.authenticate().await.unwrap();

        assert_eq!(auth.session().access_token(), Some("at-2"));
        assert_eq!(auth.refresh_token(), "rt-2");
    }

    #[tokio::test]
    async fn test_missing_access_token_is_error() {
        let server = MockServer::start().await;
        mount_token(&server, serde_json::json!({"token_type": "Bearer"})).await;

        let mut auth = manager_for(&server, Session::new("key", "secret", "rt")).await;
        let err = auth.authenticate().await.unwrap_err();

        assert!(matches!(err.kind, ErrorKind::MissingAccessToken));
        assert_eq!(auth.session().access_token(), None);
    }

    #[tokio::test]
    async fn test_fills_company_id_from_token() {
        let server = MockServer::start().await;
        let access = encode_test_token(&serde_json::json!({"cnyId": "ACME"}));
        mount_token(&server, serde_json::json!({"access_token": access})).await;

        let mut auth = manager_for(&server, Session::new("key", "secret", "rt")).await;
        auth.authenticate().await.unwrap();
        assert_eq!(auth.session().company_id(), "ACME");
    }

    #[tokio::test]
    async fn test_authenticator_maps_to_client_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_client"
            })))
            .mount(&server)
            .await;

        let mut auth = manager_for(&server, Session::new("key", "secret", "rt")).await;
        let err = auth.refresh().await.unwrap_err();

        assert!(err.is_auth_error());
        assert!(err.to_string().contains("invalid_client"));
    }

    #[test]
    fn test_debug_does_not_leak_session() {
        let auth = AuthManager::new(
            OAuthClient::new().unwrap(),
            Session::new("key", "top_secret", "refresh_secret"),
        );
        let debug_output = format!("{:?}", auth);
        assert!(!debug_output.contains("top_secret"));
        assert!(!debug_output.contains("refresh_secret"));
    }
}
