//! Error types for docmap.
//!
//! Errors are grouped by who is expected to react to them:
//! - [`ValidationError`] / [`ValidationFailure`]: user-facing, a save was rejected
//! - [`ReferentialIntegrityError`]: user-facing, a delete was blocked
//! - [`ConstraintError`]: programmer error while composing a selection
//! - [`StorageError`]: raised by the document store backend
//! - [`ConfigError`]: invalid [`crate::config::IndexConfig`] or entity declaration

use std::fmt;

use thiserror::Error;

pub use crate::storage::StorageError;

/// A single rejected field of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A not-null property has no value.
    #[error("Field '{field}' of {entity_type} must be filled")]
    FieldMustBeFilled {
        /// Type of the rejected entity.
        entity_type: String,
        /// Property without a value.
        field: String,
    },

    /// Another entity already uses the value of a unique property.
    #[error("Field '{field}' of {entity_type} must be unique, but '{value}' is already used")]
    FieldMustBeUnique {
        /// Type of the rejected entity.
        entity_type: String,
        /// Property carrying the duplicate.
        field: String,
        /// The duplicate value, rendered for display.
        value: String,
    },
}

impl ValidationError {
    /// Name of the rejected field.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::FieldMustBeFilled { field, .. } | Self::FieldMustBeUnique { field, .. } => field,
        }
    }
}

/// Field-level annotation recorded while checking an entity.
///
/// `value` carries the offending value for uniqueness violations and is
/// absent for missing values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the failed property.
    pub field: String,
    /// Offending value, if any.
    pub value: Option<String>,
}

/// Rejection of a save.
///
/// Carries the first error encountered plus the annotations of every field
/// that failed, since all properties are checked even after the first
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// First violation in declaration order.
    pub first: ValidationError,
    /// One annotation per failed check.
    pub field_errors: Vec<FieldError>,
}

impl ValidationFailure {
    /// Returns true if the given field carries an annotation.
    #[must_use]
    pub fn has_field_error(&self, field: &str) -> bool {
        self.field_errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)
    }
}

impl std::error::Error for ValidationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.first)
    }
}

/// Misuse of the constraint algebra.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    /// A conjunction has both query-kind and filter-kind children.
    #[error("You must not mix filters and queries in an AND constraint! {constraint}")]
    MixedQueryAndFilter {
        /// Rendering of the offending conjunction.
        constraint: String,
    },

    /// A regex constraint was given a pattern that does not compile.
    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidRegex {
        /// The rejected pattern.
        pattern: String,
        /// Parser message.
        reason: String,
    },
}

/// A delete that would leave dangling references behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferentialIntegrityError {
    /// A rejecting relation still has owners pointing at the entity.
    #[error("Cannot delete {entity_type} '{id}': still referenced by {referenced_by} {relation}")]
    DeleteBlocked {
        /// Type of the entity to delete.
        entity_type: String,
        /// Id of the entity to delete.
        id: String,
        /// Blocking relation as `<owner type>.<field>`.
        relation: String,
        /// Number of referencing owners.
        referenced_by: usize,
    },
}

/// Invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A setting or declaration has an unusable value.
    #[error("Invalid configuration value for '{field}': {reason}")]
    Invalid {
        /// Path of the offending setting.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The configuration source is not well-formed.
    #[error("Failed to parse configuration: {message}")]
    Parse {
        /// Parser message.
        message: String,
    },
}

/// Top-level error type for docmap.
#[derive(Debug, Error)]
pub enum DocError {
    /// A save was rejected.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationFailure),

    /// A delete was blocked.
    #[error("Referential integrity error: {0}")]
    ReferentialIntegrity(#[from] ReferentialIntegrityError),

    /// The constraint algebra was misused.
    #[error("Constraint error: {0}")]
    Constraint(#[from] ConstraintError),

    /// The document store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid configuration or entity declaration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unexpected internal state.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the state.
        message: String,
    },
}

impl DocError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if a delete was blocked by a dependent relation.
    #[must_use]
    pub const fn is_referential_integrity(&self) -> bool {
        matches!(self, Self::ReferentialIntegrity(_))
    }

    /// Returns true if the constraint algebra was misused.
    #[must_use]
    pub const fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if the error is meant to be shown to an end user.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::ReferentialIntegrity(_))
    }

    /// Returns true if retrying the same operation may succeed.
    ///
    /// Only optimistic-locking conflicts qualify: the caller reloads the
    /// entity and applies its change again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(StorageError::VersionConflict { .. }))
    }

    /// Returns the validation failure, if this is one.
    #[must_use]
    pub const fn as_validation(&self) -> Option<&ValidationFailure> {
        match self {
            Self::Validation(v) => Some(v),
            _ => None,
        }
    }
}

/// Result type alias for docmap operations.
pub type DocResult<T> = Result<T, DocError>;
