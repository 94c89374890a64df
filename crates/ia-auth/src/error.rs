//! Error types for ia-auth.
//!
//! Error messages are designed to avoid exposing sensitive credential data.

/// Result type alias for ia-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ia-auth operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }
}

/// The kind of error that occurred.
///
/// Error messages avoid including credential values.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// OAuth error response from the token endpoint.
    #[error("OAuth error: {error} - {description}")]
    OAuth { error: String, description: String },

    /// The token endpoint answered 2xx without an access token.
    #[error("Token response did not contain an access token")]
    MissingAccessToken,

    /// Token could not be decoded.
    #[error("Token invalid: {0}")]
    TokenInvalid(String),

    /// Invalid credentials configuration.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// HTTP error during authentication.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let message = ledgerpipe_ia_client::sanitize_error_message(&err.to_string());
        Error::with_source(ErrorKind::Http(message), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Error::with_source(ErrorKind::Serialization(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(
            ErrorKind::InvalidCredentials(format!("invalid token URL: {err}")),
            err,
        )
    }
}

impl From<Error> for ledgerpipe_ia_client::Error {
    fn from(err: Error) -> Self {
        ledgerpipe_ia_client::Error::with_source(
            ledgerpipe_ia_client::ErrorKind::Authentication(err.to_string()),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        let err = ErrorKind::OAuth {
            error: "invalid_grant".to_string(),
            description: "refresh token expired".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "OAuth error: invalid_grant - refresh token expired"
        );
        assert_eq!(
            ErrorKind::MissingAccessToken.to_string(),
            "Token response did not contain an access token"
        );
    }

    #[test]
    fn test_converts_into_client_auth_error() {
        let err = Error::new(ErrorKind::OAuth {
            error: "invalid_client".to_string(),
            description: "bad secret".to_string(),
        });
        let client_err: ledgerpipe_ia_client::Error = err.into();

        assert!(client_err.is_auth_error());
        assert!(client_err.to_string().contains("invalid_client"));
    }
}
