use std::fmt;
use std::sync::Arc;

use super::{Entity, EntityId};
use crate::error::DocResult;
use crate::index::Index;
use crate::storage::EntityCache;
use crate::value::Value;

/// Ordered list of lazy references.
///
/// Ids keep their persisted order and may repeat. Resolved values only
/// contain targets which still exist, in id order.
pub struct EntityRefList<E> {
    ids: Vec<EntityId>,
    values: Option<Vec<Arc<E>>>,
    value_from_cache: bool,
}

impl<E: Entity> EntityRefList<E> {
    /// An empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ids: Vec::new(),
            values: None,
            value_from_cache: false,
        }
    }

    /// Returns true if values are materialized or nothing is referenced.
    #[must_use]
    pub fn is_value_loaded(&self) -> bool {
        self.values.is_some() || self.ids.is_empty()
    }

    /// Returns true if any held value came from a cache.
    #[must_use]
    pub const fn is_value_from_cache(&self) -> bool {
        self.value_from_cache
    }

    /// Returns the referenced entities, reloading them from the store unless
    /// they were loaded directly before. Dangling ids are skipped.
    pub fn get_values(&mut self, index: &Index) -> DocResult<&[Arc<E>]> {
        if !self.is_value_loaded() || self.value_from_cache {
            let mut result = Vec::with_capacity(self.ids.len());
            for id in &self.ids {
                if let Some(value) = index.find::<E>(id)? {
                    result.push(Arc::new(value));
                }
            }
            self.values = Some(result);
            self.value_from_cache = false;
        }
        Ok(self.loaded())
    }

    /// Returns the referenced entities, permitting lookups in `cache`.
    pub fn get_cached_values(&mut self, index: &Index, cache: &EntityCache) -> DocResult<&[Arc<E>]> {
        if self.is_value_loaded() {
            return Ok(self.loaded());
        }
        let mut result = Vec::with_capacity(self.ids.len());
        let mut from_cache = false;
        for id in &self.ids {
            let (value, hit) = index.fetch::<E>(id, cache)?;
            if let Some(value) = value {
                result.push(Arc::new(value));
                from_cache |= hit;
            }
        }
        self.values = Some(result);
        self.value_from_cache = from_cache;
        Ok(self.loaded())
    }

    /// Returns the referenced entities, permitting lookups in the index's
    /// default cache.
    pub fn get_default_cached_values(&mut self, index: &Index) -> DocResult<&[Arc<E>]> {
        let cache = index.default_cache();
        self.get_cached_values(index, cache)
    }

    fn loaded(&self) -> &[Arc<E>] {
        self.values.as_deref().unwrap_or(&[])
    }

    /// Appends a reference to `value`. Entities without an id are ignored.
    pub fn add_value(&mut self, value: E) {
        let Some(id) = value.id().cloned() else {
            return;
        };
        if self.ids.is_empty() {
            self.values = Some(Vec::new());
        }
        self.ids.push(id);
        if let Some(values) = &mut self.values {
            values.push(Arc::new(value));
        }
    }

    /// Returns true if the persisted `value` is referenced.
    #[must_use]
    pub fn contains(&self, value: &E) -> bool {
        value.id().is_some_and(|id| self.ids.contains(id))
    }

    /// Returns true if `id` is referenced. Blank ids never are.
    #[must_use]
    pub fn contains_id(&self, id: &EntityId) -> bool {
        !id.is_blank() && self.ids.contains(id)
    }

    /// Referenced ids in order, duplicates included.
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// Number of referenced ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if nothing is referenced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Replaces the referenced ids. Blank ids are dropped, order and
    /// duplicates are kept. Loaded values are discarded.
    pub fn set_ids(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.ids = ids.into_iter().filter(|id| !id.is_blank()).collect();
        self.values = None;
        self.value_from_cache = false;
    }

    /// Stored representation: a list of ids.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::List(
            self.ids
                .iter()
                .map(|id| Value::String(id.as_str().to_string()))
                .collect(),
        )
    }

    /// Applies a stored list of ids. Non-string entries are skipped.
    pub fn set_ids_from_value(&mut self, value: &Value) {
        let ids = value
            .as_list()
            .unwrap_or(&[])
            .iter()
            .filter_map(EntityId::from_value)
            .collect::<Vec<_>>();
        self.set_ids(ids);
    }
}

impl<E: Entity> Default for EntityRefList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EntityRefList<E> {
    fn clone(&self) -> Self {
        Self {
            ids: self.ids.clone(),
            values: self.values.clone(),
            value_from_cache: self.value_from_cache,
        }
    }
}

impl<E> fmt::Debug for EntityRefList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRefList")
            .field("ids", &self.ids)
            .field("loaded", &self.values.as_ref().map(Vec::len))
            .field("value_from_cache", &self.value_from_cache)
            .finish()
    }
}
