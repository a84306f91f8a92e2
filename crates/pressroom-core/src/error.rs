use thiserror::Error;

use crate::remote::TransportError;
use crate::store::StoreError;

/// Failure kinds a sync workflow can end in.
///
/// `ConfigMissing` and `SecurityRejected` are always raised before any
/// network I/O takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid credentials: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Branch \"{0}\" does not exist")]
    BranchMissing(String),

    #[error("Refusing to write \"{0}\": only .json files may be published")]
    SecurityRejected(String),

    #[error("Transport error: {0}")]
    Transport(TransportError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Working store error: {0}")]
    Store(String),
}

impl SyncError {
    /// Map a 401/403 answer to the matching credential error.
    pub(crate) fn denied(status: u16, context: &str, message: &str) -> Self {
        let detail = if message.is_empty() {
            context.to_string()
        } else {
            format!("{} ({})", context, message)
        };
        if status == 401 {
            SyncError::Unauthorized(detail)
        } else {
            SyncError::Forbidden(detail)
        }
    }
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        SyncError::Transport(err)
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        SyncError::Store(err.to_string())
    }
}
