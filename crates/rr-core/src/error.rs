//! # AppError
//!
//! Centralized error handling for the Rusty-Recipes ecosystem.
//! Maps domain-specific failures to actionable error types.

use std::fmt;

use thiserror::Error;

/// The primary error type for all rr-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A required field is missing or malformed (field name, message)
    #[error("validation error on `{0}`: {1}")]
    ValidationError(String, String),

    /// Unique constraint on a slug, name or email would be violated
    #[error("conflict: {0}")]
    Conflict(String),

    /// Resource not found (entity, key)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// No session accompanies the request
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// A session is present but its role is insufficient
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The media host failed; never retried here
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Infrastructure failure (e.g., DB down, corrupt row)
    #[error("internal service error: {0}")]
    Internal(String),
}

/// Stable, transport-agnostic classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Unauthenticated,
    Forbidden,
    Upstream,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation_error",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::Upstream => "upstream_error",
            Self::Internal => "internal_error",
        };
        f.write_str(name)
    }
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError(field.into(), message.into())
    }

    pub fn not_found(entity: impl Into<String>, key: impl fmt::Display) -> Self {
        Self::NotFound(entity.into(), key.to_string())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn recipe_slug_taken() -> Self {
        Self::Conflict(
            "a recipe with this URL slug already exists; choose a different title or slug".into(),
        )
    }

    pub fn category_name_taken() -> Self {
        Self::Conflict("a category with this name already exists; choose a different name".into())
    }

    pub fn email_taken() -> Self {
        Self::Conflict("a user with this email already exists".into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError(..) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(..) => ErrorKind::NotFound,
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Upstream(_) => ErrorKind::Upstream,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status an inbound handler should answer with.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Upstream => 502,
            ErrorKind::Internal => 500,
        }
    }

    /// Name of the offending input field, when the failure is field-level.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ValidationError(field, _) => Some(field),
            _ => None,
        }
    }

    /// Message safe to show to the caller. Internal and upstream details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::ValidationError(_, message) | Self::Conflict(message) => message.clone(),
            Self::NotFound(entity, _) => format!("{entity} not found"),
            Self::Unauthenticated(_) => "authentication required".into(),
            Self::Forbidden(_) => "access denied: administrator rights required".into(),
            Self::Upstream(_) => "the media host could not complete the request".into(),
            Self::Internal(_) => "internal server error".into(),
        }
    }
}

/// A specialized Result type for Rusty-Recipes logic.
pub type Result<T> = std::result::Result<T, AppError>;
