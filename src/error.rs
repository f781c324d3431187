//! Unified application error model and mapping helpers.
//! Library modules return their own `thiserror` enums; the CLI and the HTTP
//! viewer convert them into `AppError` for user-facing reporting.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::store::StoreError;
use crate::upload::UploadError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Auth { code: String, message: String },
    Remote { code: String, message: String, status: u16 },
    Timeout { code: String, message: String },
    Io { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Remote { code, .. }
            | AppError::Timeout { code, .. }
            | AppError::Io { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Remote { message, .. }
            | AppError::Timeout { message, .. }
            | AppError::Io { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::Auth { .. } => 401,
            AppError::Remote { .. } => 502,
            AppError::Timeout { .. } => 504,
            AppError::Io { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::UserInput { .. } => 2,
            AppError::Auth { .. } => 3,
            AppError::NotFound { .. } => 4,
            AppError::Conflict { .. } | AppError::Remote { .. } => 5,
            AppError::Timeout { .. } => 6,
            AppError::Io { .. } | AppError::Internal { .. } => 1,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Remote { status, .. } => write!(f, "{} ({}): {}", self.code_str(), status, self.message()),
            _ => write!(f, "{}: {}", self.code_str(), self.message()),
        }
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::MissingCredentials => AppError::UserInput { code: "credential_missing".into(), message },
            StoreError::NotFound { .. } => AppError::NotFound { code: "not_found".into(), message },
            StoreError::RemoteRejected { status: 401, .. } | StoreError::RemoteRejected { status: 403, .. } => {
                AppError::Auth { code: "remote_auth".into(), message }
            }
            StoreError::RemoteRejected { status: 409, .. } => AppError::Conflict { code: "stale_revision".into(), message },
            StoreError::RemoteRejected { status, .. } => AppError::Remote { code: "remote_rejected".into(), message, status },
            StoreError::Timeout { .. } => AppError::Timeout { code: "timeout".into(), message },
            StoreError::Transport(_) => AppError::Io { code: "transport".into(), message },
            StoreError::Decode(_) => AppError::Internal { code: "decode".into(), message },
            StoreError::InvalidPath(_) => AppError::UserInput { code: "invalid_path".into(), message },
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        let message = err.to_string();
        match err {
            UploadError::NoFileSelected => AppError::UserInput { code: "no_file".into(), message },
            UploadError::MissingCredentials => AppError::UserInput { code: "credential_missing".into(), message },
            UploadError::NotConfirmed { .. } => AppError::UserInput { code: "not_confirmed".into(), message },
            UploadError::Busy => AppError::Conflict { code: "upload_in_flight".into(), message },
            UploadError::MediaWrite(store) => AppError::from(store),
        }
    }
}
