//! Fluent selection of entities.

use std::marker::PhantomData;

use crate::constraints::{
    And, BoxedConstraint, Constraint, FieldEqual, FieldMatch, FieldNotEqual, FieldRegex,
};
use crate::entity::Entity;
use crate::error::{ConstraintError, DocResult};
use crate::index::Index;
use crate::storage::{SearchRequest, Selection};
use crate::value::Value;

/// Selection of entities of type `E`, created by [`Index::select`].
///
/// All constraints are combined into one [`And`]. Filters and scored queries
/// must not be mixed in one selection.
///
/// # Examples
///
/// ```ignore
/// let berlin = index.select::<Customer>().eq("city", "Berlin").limit(10).query_list()?;
/// ```
#[derive(Debug)]
pub struct Query<'a, E> {
    index: &'a Index,
    constraints: Vec<BoxedConstraint>,
    limit: Option<usize>,
    error: Option<ConstraintError>,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> Query<'a, E> {
    pub(crate) fn new(index: &'a Index) -> Self {
        Self {
            index,
            constraints: Vec::new(),
            limit: None,
            error: None,
            _entity: PhantomData,
        }
    }

    /// Requires `field` to equal `value`.
    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_constraint(FieldEqual::on(field, value))
    }

    /// Requires `field` to differ from `value`.
    #[must_use]
    pub fn not_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_constraint(FieldNotEqual::on(field, value))
    }

    /// Scored full-text match of `text` against `field`.
    #[must_use]
    pub fn matches(self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.where_constraint(FieldMatch::on(field, text))
    }

    /// Requires `field` to match the regular expression `pattern`. An invalid
    /// pattern is reported by the terminal operation.
    #[must_use]
    pub fn regex(mut self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        match FieldRegex::on(field, pattern) {
            Ok(constraint) => self.where_constraint(constraint),
            Err(e) => {
                self.error.get_or_insert(e);
                self
            }
        }
    }

    /// Adds an arbitrary constraint.
    #[must_use]
    pub fn where_constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraints.push(Box::new(constraint));
        self
    }

    /// Caps the number of returned entities. Counts ignore it.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the matching entities, applying the configured default limit
    /// unless a limit was given.
    pub fn query_list(self) -> DocResult<Vec<E>> {
        let limit = self.limit.or(self.index.config().default_limit);
        self.execute(limit)
    }

    /// Returns all matching entities. Only an explicit limit applies.
    pub fn query_all(self) -> DocResult<Vec<E>> {
        let limit = self.limit;
        self.execute(limit)
    }

    /// Returns the first matching entity.
    pub fn first(self) -> DocResult<Option<E>> {
        Ok(self.execute(Some(1))?.into_iter().next())
    }

    /// Returns true if at least one entity matches.
    pub fn exists(self) -> DocResult<bool> {
        let index = self.index;
        let request = self.into_request(Some(1))?;
        Ok(!index.store().search(E::type_name(), &request)?.is_empty())
    }

    /// Counts the matching entities. The limit is ignored.
    pub fn count(self) -> DocResult<usize> {
        let index = self.index;
        let request = self.into_request(None)?;
        Ok(index.store().count(E::type_name(), &request)?)
    }

    fn execute(self, limit: Option<usize>) -> DocResult<Vec<E>> {
        let index = self.index;
        let request = self.into_request(limit)?;
        let docs = index.store().search(E::type_name(), &request)?;
        Ok(docs.iter().map(Index::materialize::<E>).collect())
    }

    fn into_request(self, limit: Option<usize>) -> Result<SearchRequest, ConstraintError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let and = And::on(self.constraints);
        let selection = if and.is_empty() {
            Selection::All
        } else if let Some(query) = and.create_query()? {
            Selection::Query { query }
        } else if let Some(filter) = and.create_filter()? {
            Selection::Filter { filter }
        } else {
            Selection::All
        };
        tracing::debug!(
            target: "docmap::query",
            entity_type = E::type_name(),
            constraint = %and.to_string_with(true),
            ?limit,
            "selecting entities"
        );
        Ok(SearchRequest { selection, limit })
    }
}
