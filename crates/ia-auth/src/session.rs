//! Session state: app credentials plus the current token pair.

/// An authenticated (or authenticatable) Sage Intacct session.
///
/// The access token is short-lived and may be absent; the refresh token may
/// be replaced by the server on any refresh. Only the auth manager mutates
/// the tokens.
///
/// Secrets are redacted in Debug output.
#[derive(Clone)]
pub struct Session {
    app_key: String,
    app_secret: String,
    company_id: String,
    refresh_token: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("app_key", &self.app_key)
            .field("app_secret", &"[REDACTED]")
            .field("company_id", &self.company_id)
            .field("refresh_token", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Session {
    /// Create a session from app credentials and a refresh token.
    pub fn new(
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            company_id: String::new(),
            refresh_token: refresh_token.into(),
            access_token: None,
        }
    }

    /// Set the tenant (company) id.
    pub fn with_company_id(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = company_id.into();
        self
    }

    /// Seed a previously issued access token. Empty tokens are ignored.
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        let token = access_token.into();
        self.access_token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    pub(crate) fn app_secret(&self) -> &str {
        &self.app_secret
    }

    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    /// The current refresh token. May differ from the one supplied at
    /// construction once the server has rotated it.
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub(crate) fn set_access_token(&mut self, token: String) {
        self.access_token = Some(token);
    }

    pub(crate) fn set_refresh_token(&mut self, token: String) {
        self.refresh_token = token;
    }

    pub(crate) fn set_company_id(&mut self, company_id: String) {
        self.company_id = company_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_builder() {
        let session = Session::new("key", "secret", "refresh")
            .with_company_id("ACME")
            .with_access_token("access");

        assert_eq!(session.app_key(), "key");
        assert_eq!(session.app_secret(), "secret");
        assert_eq!(session.company_id(), "ACME");
        assert_eq!(session.refresh_token(), "refresh");
        assert_eq!(session.access_token(), Some("access"));
    }

    #[test]
    fn test_empty_access_token_is_absent() {
        let session = Session::new("key", "secret", "refresh").with_access_token("");
        assert_eq!(session.access_token(), None);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let session = Session::new("key", "super_secret_app", "super_secret_refresh")
            .with_access_token("super_secret_access");

        let debug_output = format!("{:?}", session);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("key"));
        assert!(!debug_output.contains("super_secret_app"));
        assert!(!debug_output.contains("super_secret_refresh"));
        assert!(!debug_output.contains("super_secret_access"));
    }
}
