//! Error types for role and permission operations
//!
//! This module defines the errors returned by mutating operations on
//! permission sets, roles and users, and by the persistence collaborators
//! that store them. Read queries never produce errors.

use std::error::Error as StdError;
use thiserror::Error;

/// Boxed cause carried by [`RbacError::Persistence`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Authorization model error types.
#[derive(Debug, Error)]
pub enum RbacError {
    /// An argument was rejected before any state changed (empty permission
    /// name, empty username, duplicate role name).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Attempted to unset a permission that was never explicitly set.
    #[error("Permission not assigned: {0}")]
    NotAssigned(String),

    /// A role or user is absent from the store.
    #[error("{kind} not found: {key}")]
    NotFound {
        /// What was looked up ("role", "user").
        kind: &'static str,
        /// The name or id that was looked up.
        key: String,
    },

    /// The persistence collaborator failed. The cause is kept intact.
    #[error("Persistence error: {message}")]
    Persistence {
        /// Short description of the failed operation.
        message: String,
        /// Underlying cause, if the collaborator supplied one.
        #[source]
        source: Option<BoxError>,
    },
}

/// Result type for authorization model operations.
pub type RbacResult<T> = Result<T, RbacError>;

impl RbacError {
    /// Build an [`RbacError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        RbacError::InvalidArgument(message.into())
    }

    /// Build an [`RbacError::NotFound`].
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        RbacError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    /// Build an [`RbacError::Persistence`] without an underlying cause.
    pub fn persistence(message: impl Into<String>) -> Self {
        RbacError::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a collaborator error as [`RbacError::Persistence`].
    pub fn persistence_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        RbacError::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Check if this error originates on the storage side rather than
    /// from caller input.
    pub fn is_server_error(&self) -> bool {
        matches!(self, RbacError::Persistence { .. })
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            RbacError::InvalidArgument(_) => 400,
            RbacError::NotAssigned(_) => 409,
            RbacError::NotFound { .. } => 404,
            RbacError::Persistence { .. } => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            RbacError::InvalidArgument(_) => "INVALID_ARGUMENT",
            RbacError::NotAssigned(_) => "NOT_ASSIGNED",
            RbacError::NotFound { .. } => "NOT_FOUND",
            RbacError::Persistence { .. } => "PERSISTENCE_ERROR",
        }
    }
}
