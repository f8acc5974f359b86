use std::fmt;
use std::sync::Arc;

use super::{Entity, EntityId};
use crate::error::DocResult;
use crate::index::Index;
use crate::storage::EntityCache;
use crate::value::Value;

/// Lazy reference to another entity.
///
/// Only the id is persisted. The target is loaded on first access and kept
/// as a shared snapshot. A snapshot taken from a cache is marked as possibly
/// stale, so a later [`get_value`](Self::get_value) reloads it.
pub struct EntityRef<E> {
    id: Option<EntityId>,
    value: Option<Arc<E>>,
    value_from_cache: bool,
}

impl<E: Entity> EntityRef<E> {
    /// An empty reference.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            id: None,
            value: None,
            value_from_cache: false,
        }
    }

    /// Creates a reference to the given id without loading anything.
    #[must_use]
    pub fn to_id(id: impl Into<EntityId>) -> Self {
        let mut reference = Self::new();
        reference.set_id(Some(id.into()));
        reference
    }

    /// Returns true if a value is held or nothing is referenced.
    #[must_use]
    pub const fn is_value_loaded(&self) -> bool {
        self.value.is_some() || self.id.is_none()
    }

    /// Returns true if the held value came from a cache.
    #[must_use]
    pub const fn is_value_from_cache(&self) -> bool {
        self.value_from_cache
    }

    /// Returns the referenced entity, loading it from the store if it is not
    /// loaded yet or the held value came from a cache.
    ///
    /// A dangling id resolves to `None`.
    pub fn get_value(&mut self, index: &Index) -> DocResult<Option<&E>> {
        if !self.is_value_loaded() || self.value_from_cache {
            self.value = match &self.id {
                Some(id) => index.find::<E>(id)?.map(Arc::new),
                None => None,
            };
            self.value_from_cache = false;
        }
        Ok(self.value.as_deref())
    }

    /// Returns the referenced entity, permitting a lookup in `cache`.
    pub fn get_cached_value(&mut self, index: &Index, cache: &EntityCache) -> DocResult<Option<&E>> {
        if self.is_value_loaded() {
            return Ok(self.value.as_deref());
        }
        if let Some(id) = &self.id {
            let (value, from_cache) = index.fetch::<E>(id, cache)?;
            self.value = value.map(Arc::new);
            self.value_from_cache = from_cache;
        }
        Ok(self.value.as_deref())
    }

    /// Returns the referenced entity, permitting a lookup in the index's
    /// default cache.
    pub fn get_default_cached_value(&mut self, index: &Index) -> DocResult<Option<&E>> {
        if self.is_value_loaded() {
            return Ok(self.value.as_deref());
        }
        let cache = index.default_cache();
        self.get_cached_value(index, cache)
    }

    /// Points the reference at `value` and keeps it as the loaded target.
    pub fn set_value(&mut self, value: Option<E>) {
        self.id = value.as_ref().and_then(|v| v.id().cloned());
        self.value = value.map(Arc::new);
        self.value_from_cache = false;
    }

    /// Points the reference at `id`, dropping any loaded value.
    pub fn set_id(&mut self, id: Option<EntityId>) {
        self.id = id;
        self.value = None;
        self.value_from_cache = false;
    }

    /// The referenced id.
    #[must_use]
    pub const fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    /// Returns true if an entity is referenced. Says nothing about whether
    /// it was loaded.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.id.as_ref().is_some_and(|id| !id.is_blank())
    }

    /// Returns true if the reference points at `id`.
    #[must_use]
    pub fn contains_id(&self, id: Option<&EntityId>) -> bool {
        self.id.as_ref() == id
    }

    /// Stored representation: the id, or `Null`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.id
            .as_ref()
            .map_or(Value::Null, |id| Value::String(id.as_str().to_string()))
    }
}

impl<E: Entity> Default for EntityRef<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EntityRef<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            value: self.value.clone(),
            value_from_cache: self.value_from_cache,
        }
    }
}

impl<E> fmt::Debug for EntityRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("id", &self.id)
            .field("loaded", &self.value.is_some())
            .field("value_from_cache", &self.value_from_cache)
            .finish()
    }
}
