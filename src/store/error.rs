use thiserror::Error;

/// Failures surfaced by the remote content store and the client wrapped around it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A write was attempted without a bearer credential.
    #[error("missing credentials: a token is required to write to the store")]
    MissingCredentials,
    /// The requested path does not exist on the configured branch.
    #[error("not found: {path}")]
    NotFound { path: String },
    /// The store answered with a non-success status.
    #[error("remote rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },
    #[error("request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid store path: {0}")]
    InvalidPath(String),
}

impl StoreError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        StoreError::RemoteRejected { status, message: message.into() }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        StoreError::NotFound { path: path.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Status code carried by the failure, if the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::RemoteRejected { status, .. } => Some(*status),
            StoreError::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not report the configured duration
            return StoreError::Timeout { after_ms: 0 };
        }
        if err.is_decode() {
            return StoreError::Decode(err.to_string());
        }
        StoreError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for StoreError {
    fn from(err: base64::DecodeError) -> Self {
        StoreError::Decode(format!("invalid base64 content: {}", err))
    }
}
