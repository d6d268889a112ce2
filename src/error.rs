// Error taxonomy for the analysis engine
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification used by callers to pick a user-facing reaction:
/// "fix your input" (Validation, NotFound) versus "try again later" (Auth, Infrastructure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Auth,
    Infrastructure,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Caller,
    Deadline,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Caller => write!(f, "cancelled by caller"),
            CancelReason::Deadline => write!(f, "overall deadline exceeded"),
        }
    }
}

/// Transport-level failures. Everything here except a non-5xx status is transient.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InfraError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited by upstream (HTTP 429)")]
    RateLimited,

    #[error("upstream responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl InfraError {
    pub fn is_transient(&self) -> bool {
        match self {
            InfraError::Network(_) | InfraError::Timeout(_) | InfraError::RateLimited => true,
            InfraError::Status { status, .. } => *status >= 500,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Upstream payload did not have the expected shape. Reported as a validation failure.
    #[error("malformed upstream response ({context}): {reason}")]
    Parsing { context: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream rejected credentials: {0}")]
    Auth(String),

    #[error(transparent)]
    Infrastructure(#[from] InfraError),

    #[error("analysis aborted: {0}")]
    Cancelled(CancelReason),
}

impl AnalysisError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn parsing(context: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::Parsing {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Validation { .. } | AnalysisError::Parsing { .. } => ErrorKind::Validation,
            AnalysisError::NotFound(_) => ErrorKind::NotFound,
            AnalysisError::Auth(_) => ErrorKind::Auth,
            // a client-side status is terminal, so it is not "try again later"
            AnalysisError::Infrastructure(InfraError::Status { status, .. }) if *status < 500 => {
                ErrorKind::Validation
            }
            AnalysisError::Infrastructure(_) => ErrorKind::Infrastructure,
            AnalysisError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// Only transient infrastructure failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalysisError::Infrastructure(infra) => infra.is_transient(),
            _ => false,
        }
    }
}
