use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Flat `{ success, message }` result handed to the editing front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub success: bool,
    pub message: String,
}

impl DiagnosticResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl<T: Display> From<Result<T, SyncError>> for DiagnosticResult {
    fn from(result: Result<T, SyncError>) -> Self {
        match result {
            Ok(report) => Self::ok(report.to_string()),
            Err(err) => Self::failed(err.to_string()),
        }
    }
}
