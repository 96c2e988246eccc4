//! Mapping from command results to client-facing responses

use serde::{Deserialize, Serialize};

use crate::commands::{Error, ErrorKind};

/// Body returned to clients when a request fails
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status code, as a string
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: status.to_string(),
            message: message.into(),
        }
    }

    /// Response for a request that could not be understood
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// Response for failures the client cannot act on
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal.status(), "an internal error occurred")
    }
}

impl ErrorKind {
    /// Status code reported to clients for this kind of failure
    pub fn status(&self) -> u16 {
        match self {
            ErrorKind::InvalidAmount => 400,
            ErrorKind::UserNotFound => 404,
            ErrorKind::InsufficientBalance => 409,
            ErrorKind::BalanceCapExceeded => 422,
            ErrorKind::Internal => 500,
        }
    }
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        let kind = err.kind();
        match kind {
            // Adapter details stay in the logs
            ErrorKind::Internal => Self::internal(),
            _ => Self::new(kind.status(), err.to_string()),
        }
    }
}
