//! Conjunction of constraints.

use std::fmt;

use super::{BoxedConstraint, Constraint, FilterNode, QueryNode};
use crate::error::ConstraintError;

/// A set of constraints of which every one must be fulfilled.
///
/// All children producing an artifact must agree on its kind. A conjunction
/// mixing query-kind and filter-kind children is rejected by both
/// [`create_query`](Constraint::create_query) and
/// [`create_filter`](Constraint::create_filter). A child whose artifact is a
/// `Bool` without clauses contributes nothing and has no kind.
///
/// # Examples
///
/// ```
/// use docmap::constraints::{And, Constraint, FieldEqual};
///
/// let and = And::default()
///     .with(FieldEqual::on("city", "Berlin"))
///     .with(FieldEqual::on("active", true));
/// assert!(and.create_query().unwrap().is_none());
/// assert!(and.create_filter().unwrap().is_some());
/// assert_eq!(and.to_string_with(true), "(city = ?) AND (active = ?)");
/// ```
#[derive(Debug, Default)]
pub struct And {
    constraints: Vec<BoxedConstraint>,
}

impl And {
    /// Groups the given constraints into a conjunction.
    #[must_use]
    pub fn on(constraints: Vec<BoxedConstraint>) -> Self {
        Self { constraints }
    }

    /// Appends another constraint.
    #[must_use]
    pub fn with(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraints.push(Box::new(constraint));
        self
    }

    /// Number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Returns true if the conjunction has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    fn mixing_error(&self) -> ConstraintError {
        ConstraintError::MixedQueryAndFilter {
            constraint: self.to_string(),
        }
    }
}

impl Constraint for And {
    fn create_query(&self) -> Result<Option<QueryNode>, ConstraintError> {
        let mut must = Vec::new();
        let mut filters_found = false;
        for constraint in &self.constraints {
            if let Some(query) = constraint.create_query()?.filter(QueryNode::has_clauses) {
                must.push(query);
            }
            if constraint.create_filter()?.is_some_and(|f| FilterNode::has_clauses(&f)) {
                filters_found = true;
            }
        }
        if must.is_empty() {
            return Ok(None);
        }
        if filters_found {
            return Err(self.mixing_error());
        }
        Ok(Some(QueryNode::Bool { must }))
    }

    fn create_filter(&self) -> Result<Option<FilterNode>, ConstraintError> {
        let mut must = Vec::new();
        let mut queries_found = false;
        for constraint in &self.constraints {
            if let Some(filter) = constraint.create_filter()?.filter(FilterNode::has_clauses) {
                must.push(filter);
            }
            if constraint.create_query()?.is_some_and(|q| QueryNode::has_clauses(&q)) {
                queries_found = true;
            }
        }
        if must.is_empty() {
            return Ok(None);
        }
        if queries_found {
            return Err(self.mixing_error());
        }
        Ok(Some(FilterNode::Bool { must }))
    }

    fn to_string_with(&self, skip_values: bool) -> String {
        let mut out = String::from("(");
        for (idx, child) in self.constraints.iter().enumerate() {
            if idx > 0 {
                out.push_str(") AND (");
            }
            out.push_str(&child.to_string_with(skip_values));
        }
        out.push(')');
        out
    }
}

impl fmt::Display for And {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(false))
    }
}
