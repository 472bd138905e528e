// Error taxonomy shared by every store.
//
// `ErrorCode` is the stable, serializable identifier consumers branch on;
// `Error` groups codes into kinds (validation, authentication, business rule,
// …) so call sites can distinguish expected outcomes from internal faults.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::StorageError;

/// Stable error codes surfaced to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidEmail,
    PasswordTooShort,
    PasswordTooLong,
    WeakPassword,
    InvalidName,
    MissingField,
    InvalidAdminSecret,
    UserAlreadyExists,
    InvalidCredentials,
    NotAuthenticated,
    SessionExpired,
    InsufficientPermissions,
    AccessDenied,
    UserNotFound,
    LetterNotFound,
    NoSubscription,
    QuotaExceeded,
    InvalidPlan,
    CreationFailed,
    SubscriptionFailed,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidEmail => "Invalid email format",
            Self::PasswordTooShort => "Password must be at least 8 characters long",
            Self::PasswordTooLong => "Password must be at most 128 characters long",
            Self::WeakPassword => "Password must contain uppercase, lowercase, and number",
            Self::InvalidName => "Invalid name format",
            Self::MissingField => "Required field is missing",
            Self::InvalidAdminSecret => "Invalid admin secret key",
            Self::UserAlreadyExists => "User already exists with this email",
            Self::InvalidCredentials => "Invalid credentials or account deactivated",
            Self::NotAuthenticated => "User not authenticated",
            Self::SessionExpired => "Session expired",
            Self::InsufficientPermissions => "Only users can generate letters",
            Self::AccessDenied => "Access denied",
            Self::UserNotFound => "User not found",
            Self::LetterNotFound => "Letter not found",
            Self::NoSubscription => "Active subscription required",
            Self::QuotaExceeded => "Letter limit exceeded for current subscription",
            Self::InvalidPlan => "Invalid plan selected",
            Self::CreationFailed => "Failed to create letter",
            Self::SubscriptionFailed => "Failed to create subscription",
            Self::InternalError => "An unexpected error occurred",
        };
        write!(f, "{msg}")
    }
}

/// Service error, grouped by kind.
///
/// Expected outcomes (bad input, missing quota, wrong credentials) keep their
/// specific code and kind; unexpected faults travel as `Storage`/`Internal`
/// until a public operation wraps them via [`Error::wrap_unexpected`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad input shape or missing required field; `field` addresses the offender.
    #[error("{code} ({field})")]
    Validation { code: ErrorCode, field: &'static str },

    /// Uniqueness conflict (duplicate email).
    #[error("{0}")]
    Duplicate(ErrorCode),

    /// Bad credentials, inactive account, absent or expired session.
    #[error("{0}")]
    Authentication(ErrorCode),

    /// Insufficient role, bad admin secret, foreign resource access.
    #[error("{0}")]
    Authorization(ErrorCode),

    /// Business-rule violation (no subscription, quota, unknown plan).
    #[error("{0}")]
    Business(ErrorCode),

    /// Referenced record does not exist.
    #[error("{0}")]
    NotFound(ErrorCode),

    /// Storage backend fault.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Any other unexpected internal fault.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    /// An unexpected fault wrapped with an operation-specific code.
    #[error("{code}")]
    Failed { code: ErrorCode, cause: anyhow::Error },
}

impl Error {
    pub fn validation(code: ErrorCode, field: &'static str) -> Self {
        Self::Validation { code, field }
    }

    /// The stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } | Self::Failed { code, .. } => *code,
            Self::Duplicate(code)
            | Self::Authentication(code)
            | Self::Authorization(code)
            | Self::Business(code)
            | Self::NotFound(code) => *code,
            Self::Storage(_) | Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// True for faults no caller is expected to branch on.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Internal(_))
    }

    /// Re-wrap an unexpected fault under an operation-specific code, leaving
    /// expected error kinds untouched so callers can still branch on them.
    pub fn wrap_unexpected(self, code: ErrorCode) -> Self {
        match self {
            Self::Storage(e) => Self::Failed {
                code,
                cause: anyhow::Error::new(e),
            },
            Self::Internal(cause) => Self::Failed { code, cause },
            other => other,
        }
    }
}

/// Unified result type for lexletter operations.
pub type Result<T> = std::result::Result<T, Error>;
