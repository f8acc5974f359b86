//! Elementary field predicates.
//!
//! Only the small vocabulary needed by the mapping layer itself lives here:
//! equality lookups for uniqueness checks and relations, plus one scoring and
//! one pattern predicate.

use super::{Constraint, FilterNode, QueryNode};
use crate::error::ConstraintError;
use crate::value::Value;

fn render_value(value: &Value, skip_values: bool) -> String {
    if skip_values {
        "?".to_string()
    } else {
        value.to_user_string()
    }
}

/// `field = value`.
///
/// Filter-kind by default; [`scored`](Self::scored) turns it into a query
/// which contributes to the relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEqual {
    field: String,
    value: Value,
    scored: bool,
}

impl FieldEqual {
    /// Requires `field` to equal `value`.
    #[must_use]
    pub fn on(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            scored: false,
        }
    }

    /// Makes this predicate a scored query instead of a filter.
    #[must_use]
    pub fn scored(mut self) -> Self {
        self.scored = true;
        self
    }
}

impl Constraint for FieldEqual {
    fn create_query(&self) -> Result<Option<QueryNode>, ConstraintError> {
        Ok(self.scored.then(|| QueryNode::Term {
            field: self.field.clone(),
            value: self.value.clone(),
        }))
    }

    fn create_filter(&self) -> Result<Option<FilterNode>, ConstraintError> {
        Ok((!self.scored).then(|| FilterNode::Term {
            field: self.field.clone(),
            value: self.value.clone(),
        }))
    }

    fn to_string_with(&self, skip_values: bool) -> String {
        format!("{} = {}", self.field, render_value(&self.value, skip_values))
    }
}

/// `field != value`. Always filter-kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNotEqual {
    field: String,
    value: Value,
}

impl FieldNotEqual {
    /// Requires `field` to differ from `value`.
    #[must_use]
    pub fn on(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl Constraint for FieldNotEqual {
    fn create_query(&self) -> Result<Option<QueryNode>, ConstraintError> {
        Ok(None)
    }

    fn create_filter(&self) -> Result<Option<FilterNode>, ConstraintError> {
        Ok(Some(FilterNode::Not {
            filter: Box::new(FilterNode::Term {
                field: self.field.clone(),
                value: self.value.clone(),
            }),
        }))
    }

    fn to_string_with(&self, skip_values: bool) -> String {
        format!("{} != {}", self.field, render_value(&self.value, skip_values))
    }
}

/// Full-text match on a field. Always query-kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    field: String,
    text: String,
}

impl FieldMatch {
    /// Scored match of the tokens of `text` against `field`.
    #[must_use]
    pub fn on(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
        }
    }
}

impl Constraint for FieldMatch {
    fn create_query(&self) -> Result<Option<QueryNode>, ConstraintError> {
        if self.text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(QueryNode::Match {
            field: self.field.clone(),
            text: self.text.clone(),
        }))
    }

    fn create_filter(&self) -> Result<Option<FilterNode>, ConstraintError> {
        Ok(None)
    }

    fn to_string_with(&self, skip_values: bool) -> String {
        if skip_values {
            format!("{} ~ ?", self.field)
        } else {
            format!("{} ~ {}", self.field, self.text)
        }
    }
}

/// The field matches a regular expression. Always filter-kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRegex {
    field: String,
    pattern: String,
}

impl FieldRegex {
    /// Creates the predicate, rejecting patterns which don't compile.
    pub fn on(field: impl Into<String>, pattern: impl Into<String>) -> Result<Self, ConstraintError> {
        let pattern = pattern.into();
        regex::Regex::new(&pattern).map_err(|e| ConstraintError::InvalidRegex {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            field: field.into(),
            pattern,
        })
    }
}

impl Constraint for FieldRegex {
    fn create_query(&self) -> Result<Option<QueryNode>, ConstraintError> {
        Ok(None)
    }

    fn create_filter(&self) -> Result<Option<FilterNode>, ConstraintError> {
        Ok(Some(FilterNode::Regex {
            field: self.field.clone(),
            pattern: self.pattern.clone(),
        }))
    }

    fn to_string_with(&self, skip_values: bool) -> String {
        if skip_values {
            format!("{} =~ ?", self.field)
        } else {
            format!("{} =~ /{}/", self.field, self.pattern)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_equal_is_filter_unless_scored() {
        let eq = FieldEqual::on("city", "Berlin");
        assert!(eq.create_query().unwrap().is_none());
        assert_eq!(
            eq.create_filter().unwrap(),
            Some(FilterNode::Term {
                field: "city".to_string(),
                value: Value::from("Berlin"),
            })
        );

        let scored = eq.scored();
        assert!(scored.create_filter().unwrap().is_none());
        assert!(matches!(scored.create_query().unwrap(), Some(QueryNode::Term { .. })));
    }

    #[test]
    fn field_not_equal_negates_term() {
        let ne = FieldNotEqual::on("id", "7");
        let Some(FilterNode::Not { filter }) = ne.create_filter().unwrap() else {
            panic!("expected negated filter");
        };
        assert!(matches!(*filter, FilterNode::Term { .. }));
        assert_eq!(ne.to_string_with(false), "id != 7");
    }

    #[test]
    fn blank_match_produces_nothing() {
        let m = FieldMatch::on("name", "   ");
        assert!(m.create_query().unwrap().is_none());
        assert!(m.create_filter().unwrap().is_none());
    }

    #[test]
    fn regex_is_validated_on_creation() {
        assert!(FieldRegex::on("name", "^ac.*").is_ok());
        let err = FieldRegex::on("name", "(unclosed").unwrap_err();
        assert!(matches!(err, ConstraintError::InvalidRegex { .. }));
    }

    #[test]
    fn skip_values_hides_operands() {
        assert_eq!(FieldEqual::on("email", "x@y.z").to_string_with(true), "email = ?");
        assert_eq!(FieldMatch::on("name", "acme").to_string_with(true), "name ~ ?");
        assert_eq!(
            FieldRegex::on("name", "a+").unwrap().to_string_with(true),
            "name =~ ?"
        );
    }
}
