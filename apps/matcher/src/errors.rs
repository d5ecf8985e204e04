use thiserror::Error;

use crate::api_client::ApiError;
use crate::auth::AuthError;
use crate::upload::UploadError;

/// Top-level error for the CLI. Every variant is recoverable: the user fixes
/// the selection, retries, or signs in again.
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error(transparent)]
    Validation(#[from] UploadError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Please log in first")]
    NotSignedIn,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    Network,
    Server,
    Internal,
}

impl MatcherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatcherError::Validation(_) => ErrorKind::Validation,
            MatcherError::Auth(_) | MatcherError::NotSignedIn => ErrorKind::Auth,
            MatcherError::Api(ApiError::SessionExpired(_) | ApiError::RefreshUnavailable) => {
                ErrorKind::Auth
            }
            MatcherError::Api(ApiError::Network(_)) => ErrorKind::Network,
            MatcherError::Api(ApiError::Server { .. }) => ErrorKind::Server,
            MatcherError::Api(_) | MatcherError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the API client already told the user about this failure.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            MatcherError::Api(
                ApiError::Server { .. } | ApiError::Network(_) | ApiError::SessionExpired(_)
            )
        )
    }

    /// Process exit code: 2 for input problems, 3 for authentication, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Validation => 2,
            ErrorKind::Auth => 3,
            ErrorKind::Network | ErrorKind::Server | ErrorKind::Internal => 1,
        }
    }
}
