//! Error types for ia-rest.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Returns true if credentials or the refresh token were rejected.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Auth(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Client error: {0}")]
    Client(String),
    #[error("Auth error: {0}")]
    Auth(String),
    /// Error embedded in a query result envelope. The message is the server's, verbatim.
    #[error("Query failed ({code}): {message}")]
    Query { code: String, message: String },
    #[error("No fields could be resolved for object '{object}'. Check the object name and access permissions")]
    NoFields { object: String },
    #[error("{0}")]
    Other(String),
}

impl From<ledgerpipe_ia_client::Error> for Error {
    fn from(err: ledgerpipe_ia_client::Error) -> Self {
        let kind = if err.is_auth_error() {
            ErrorKind::Auth(err.to_string())
        } else {
            ErrorKind::Client(err.to_string())
        };
        Error { kind, source: Some(Box::new(err)) }
    }
}

impl From<ledgerpipe_ia_auth::Error> for Error {
    fn from(err: ledgerpipe_ia_auth::Error) -> Self {
        Error { kind: ErrorKind::Auth(err.to_string()), source: Some(Box::new(err)) }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        ledgerpipe_ia_client::Error::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_auth_errors_stay_auth_errors() {
        let err: Error = ledgerpipe_ia_client::Error::new(
            ledgerpipe_ia_client::ErrorKind::Authentication("invalid_grant".to_string()),
        )
        .into();
        assert!(err.is_auth_error());

        let err: Error = ledgerpipe_ia_client::Error::new(
            ledgerpipe_ia_client::ErrorKind::RequestFailed {
                attempts: 3,
                detail: "HTTP 500".to_string(),
            },
        )
        .into();
        assert!(!err.is_auth_error());
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn test_no_fields_message_points_at_object() {
        let err = Error::new(ErrorKind::NoFields {
            object: "accounts-payable/vendor".to_string(),
        });
        let msg = err.to_string();
        assert!(msg.contains("accounts-payable/vendor"));
        assert!(msg.contains("permissions"));
    }
}
