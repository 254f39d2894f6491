use std::time::Duration;

use thiserror::Error;

use crate::events::NoticeLevel;
use crate::models::plan::LimitKind;

/// A single failed attempt against the backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The attempt did not complete within the request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The connection failed before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The body was not the JSON we expected.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The caller cancelled the call.
    #[error("request cancelled")]
    Cancelled,
}

/// The terminal failure of a gateway call once its retry budget is spent.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("API request failed after {attempts} attempts: {last_error}")]
pub struct GatewayError {
    /// Number of attempts actually made.
    pub attempts: u32,
    /// The failure observed on the last attempt.
    pub last_error: TransportError,
}

impl GatewayError {
    /// The HTTP status of the last attempt, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self.last_error {
            TransportError::Status { status, .. } => Some(status),
            _ => None,
        }
    }

    /// Whether the backend explicitly refused the request (4xx).
    pub fn is_client_rejection(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    /// Whether the call ended because the caller cancelled it.
    pub fn is_cancelled(&self) -> bool {
        self.last_error == TransportError::Cancelled
    }
}

/// The client's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The backend could not be reached after all retries.
    #[error("{0}")]
    Transport(#[from] GatewayError),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The current plan does not allow another generation.
    #[error("{reason}")]
    QuotaExceeded { limit: LimitKind, reason: String },

    /// An authorization error.
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// The server reported the job as failed.
    #[error("Generation failed: {0}")]
    JobFailed(String),

    /// The poll budget ran out before the job reached a terminal state.
    #[error(
        "Generation timeout - the presentation is taking longer than expected. Please try again. ({attempts} status checks)"
    )]
    TimeoutExceeded { attempts: u32 },

    /// Job status could not be read repeatedly.
    #[error("Unable to check generation status: {0}")]
    StatusCheckUnavailable(String),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Whether the presentation surface should offer a retry rather than
    /// reporting a hard failure.
    pub fn suggests_retry(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_)
                | AppError::TimeoutExceeded { .. }
                | AppError::StatusCheckUnavailable(_)
        )
    }

    /// Logs the error at the appropriate level and returns what the
    /// presentation surface should show.
    pub fn report(&self) -> (NoticeLevel, String) {
        match self {
            AppError::Transport(e) => {
                tracing::error!("Backend unreachable: {}", e);
                (NoticeLevel::Error, self.to_string())
            }

            AppError::Validation(msg) => {
                tracing::debug!("Validation error: {}", msg);
                (NoticeLevel::Error, msg.clone())
            }

            AppError::QuotaExceeded { limit, reason } => {
                tracing::info!("Generation blocked by {} limit", limit);
                (NoticeLevel::Warning, reason.clone())
            }

            AppError::Authorization(msg) => {
                tracing::warn!("Authorization failed: {}", msg);
                (NoticeLevel::Error, msg.clone())
            }

            AppError::JobFailed(msg) => {
                tracing::error!("Job failed: {}", msg);
                (NoticeLevel::Error, self.to_string())
            }

            AppError::TimeoutExceeded { attempts } => {
                tracing::warn!("Job polling gave up after {} attempts", attempts);
                (NoticeLevel::Warning, self.to_string())
            }

            AppError::StatusCheckUnavailable(msg) => {
                tracing::warn!("Status check unavailable: {}", msg);
                (NoticeLevel::Warning, self.to_string())
            }

            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                (NoticeLevel::Error, "Local storage error".to_string())
            }

            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                (NoticeLevel::Error, "Local storage error".to_string())
            }

            AppError::Serialization(msg) => {
                tracing::error!("Serialization error: {}", msg);
                (NoticeLevel::Error, "Internal error".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_error(last_error: TransportError) -> GatewayError {
        GatewayError {
            attempts: 3,
            last_error,
        }
    }

    #[test]
    fn client_rejection_only_for_4xx() {
        let unauthorized = gateway_error(TransportError::Status {
            status: 401,
            message: "Unauthorized".into(),
        });
        let unavailable = gateway_error(TransportError::Status {
            status: 503,
            message: "Service Unavailable".into(),
        });
        let offline = gateway_error(TransportError::Network("connection refused".into()));

        assert!(unauthorized.is_client_rejection());
        assert!(!unavailable.is_client_rejection());
        assert!(!offline.is_client_rejection());
        assert_eq!(offline.status(), None);
    }

    #[test]
    fn gateway_error_message_names_attempts() {
        let err = gateway_error(TransportError::Network("connection refused".into()));
        assert_eq!(
            err.to_string(),
            "API request failed after 3 attempts: network error: connection refused"
        );
    }

    #[test]
    fn retry_hint_separates_timeouts_from_hard_failures() {
        assert!(AppError::TimeoutExceeded { attempts: 30 }.suggests_retry());
        assert!(AppError::StatusCheckUnavailable("down".into()).suggests_retry());
        assert!(!AppError::JobFailed("bad input".into()).suggests_retry());
        assert!(!AppError::Validation("too short".into()).suggests_retry());
    }
}
