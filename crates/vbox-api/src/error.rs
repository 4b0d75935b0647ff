// Error type for the typed marketplace operations.

use thiserror::Error;

use crate::dispatcher::DispatchError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No stored credential; raised before any network call.
    #[error("please log in to {action}")]
    NotAuthenticated { action: &'static str },

    /// The last host tried answered with a non-success status. `message` is
    /// the backend's `detail` when it sent one, otherwise a generic message
    /// for the operation.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        #[source]
        source: DispatchError,
    },

    /// No host produced a response at all.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        source: serde_json::Error,
    },

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ApiError {
    /// HTTP status of the final response, when a host answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Dispatch(e) => e.final_status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated { .. })
    }
}
