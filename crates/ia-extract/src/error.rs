//! Error types for ia-extract.

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

    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Errors the operator can fix (configuration, credentials, remote
    /// rejections) as opposed to internal failures.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Config(_) | ErrorKind::NotAuthorized(_) | ErrorKind::Client(_)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    NotAuthorized(String),
    #[error("{0}")]
    Client(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("JSON error: {0}")]
    Json(String),
    #[error("State file error: {0}")]
    State(String),
    #[error("{0}")]
    Other(String),
}

impl From<ledgerpipe_ia_rest::Error> for Error {
    fn from(err: ledgerpipe_ia_rest::Error) -> Self {
        Error::with_source(ErrorKind::Client(err.to_string()), err)
    }
}

impl From<ledgerpipe_ia_auth::Error> for Error {
    fn from(err: ledgerpipe_ia_auth::Error) -> Self {
        Error::with_source(ErrorKind::Client(format!("Authentication failed: {err}")), err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Io(err.to_string()), err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::with_source(ErrorKind::Csv(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}
