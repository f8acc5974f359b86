//! Artifacts produced by constraints and sent to the document store.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Scored query artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryNode {
    /// Every sub-query must match; scores add up.
    Bool {
        /// Sub-queries.
        must: Vec<QueryNode>,
    },

    /// Exact value of a field.
    Term {
        /// Field to compare.
        field: String,
        /// Required value.
        value: Value,
    },

    /// Full-text match: case-insensitive tokens of `text` found in the field.
    Match {
        /// Field to search.
        field: String,
        /// Whitespace separated search tokens.
        text: String,
    },
}

impl QueryNode {
    /// Returns false only for a `Bool` node without clauses, which matches
    /// everything and contributes nothing to a conjunction.
    #[must_use]
    pub fn has_clauses(&self) -> bool {
        match self {
            Self::Bool { must } => !must.is_empty(),
            Self::Term { .. } | Self::Match { .. } => true,
        }
    }
}

/// Unscored filter artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterNode {
    /// Every sub-filter must match.
    Bool {
        /// Sub-filters.
        must: Vec<FilterNode>,
    },

    /// Exact value of a field. A `Null` value matches missing fields.
    Term {
        /// Field to compare.
        field: String,
        /// Required value.
        value: Value,
    },

    /// Negation of the inner filter.
    Not {
        /// Negated filter.
        filter: Box<FilterNode>,
    },

    /// The string form of the field matches the regular expression.
    Regex {
        /// Field to match.
        field: String,
        /// Regular expression source.
        pattern: String,
    },
}

impl FilterNode {
    /// Returns false only for a `Bool` node without clauses, which matches
    /// everything and contributes nothing to a conjunction.
    #[must_use]
    pub fn has_clauses(&self) -> bool {
        match self {
            Self::Bool { must } => !must.is_empty(),
            Self::Term { .. } | Self::Not { .. } | Self::Regex { .. } => true,
        }
    }
}
