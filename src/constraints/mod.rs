//! Constraint algebra.
//!
//! A [`Constraint`] is a predicate node which resolves, on demand, into at most
//! one of two artifact kinds handed to the document store:
//! - a [`QueryNode`], which contributes to relevance scoring
//! - a [`FilterNode`], which only narrows the selection
//!
//! Leaves decide their own kind. Compound nodes such as [`And`] must keep that
//! decision uniform across their children.

mod and;
mod artifact;
mod field;

use std::fmt;

pub use and::And;
pub use artifact::{FilterNode, QueryNode};
pub use field::{FieldEqual, FieldMatch, FieldNotEqual, FieldRegex};

use crate::error::ConstraintError;

/// A predicate node of a selection.
///
/// Implementations are immutable: every call produces a fresh artifact tree.
pub trait Constraint: fmt::Debug + Send + Sync {
    /// Returns the scored query artifact of this constraint, if it is query-kind.
    fn create_query(&self) -> Result<Option<QueryNode>, ConstraintError>;

    /// Returns the unscored filter artifact of this constraint, if it is filter-kind.
    fn create_filter(&self) -> Result<Option<FilterNode>, ConstraintError>;

    /// Renders the constraint. With `skip_values` literal operands are replaced
    /// by `?` so the output can be logged without leaking data.
    fn to_string_with(&self, skip_values: bool) -> String;
}

impl fmt::Display for dyn Constraint + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(false))
    }
}

/// Boxed constraint, the element type of compound constraints.
pub type BoxedConstraint = Box<dyn Constraint>;
