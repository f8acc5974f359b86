//! Persistence state shared by every entity.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use super::EntityId;
use crate::value::Value;

/// Identity, version, tombstone and change-tracking state of an entity.
///
/// Application types embed one `EntityMeta` and expose it through
/// [`Entity::meta`](super::Entity::meta).
///
/// Equality and hashing are identity based: two persisted metas are equal iff
/// their ids are equal. A new meta (no id) is only equal to itself, compared
/// by address. Only compare metas of the same entity type.
#[derive(Debug, Clone, Default)]
pub struct EntityMeta {
    id: Option<EntityId>,
    version: u64,
    deleted: bool,
    source: Option<BTreeMap<String, Value>>,
}

impl EntityMeta {
    /// State of a new, never persisted entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Document id, `None` until the first save.
    #[must_use]
    pub fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    /// Sets the document id.
    pub fn set_id(&mut self, id: Option<EntityId>) {
        self.id = id;
    }

    /// Version of the stored document this entity was loaded from or last
    /// written as. 0 for entities which were never persisted.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Sets the stored version.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Returns true if the entity was never persisted.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Returns true if the entity is persisted and not deleted.
    #[must_use]
    pub const fn exists(&self) -> bool {
        !self.is_new() && !self.deleted
    }

    /// Returns true once the entity was deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn set_deleted(&mut self, deleted: bool) {
        self.deleted = deleted;
    }

    /// Starts recording persisted field values. Called when an entity is
    /// loaded from the store, never for newly constructed entities.
    pub fn init_source_tracing(&mut self) {
        self.source = Some(BTreeMap::new());
    }

    /// Records the persisted value of a field. Ignored unless source tracing
    /// was initialized.
    pub fn set_source(&mut self, name: impl Into<String>, value: Value) {
        if let Some(source) = &mut self.source {
            source.insert(name.into(), value);
        }
    }

    /// Returns the recorded persisted value of a field.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&Value> {
        self.source.as_ref().and_then(|s| s.get(name))
    }

    /// Returns true if the entity was loaded from the store.
    #[must_use]
    pub const fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Checks whether `value` differs from the value the field had when the
    /// entity was loaded.
    ///
    /// Entities which were never loaded are never reported as changed.
    #[must_use]
    pub fn is_changed(&self, field: &str, value: &Value) -> bool {
        match &self.source {
            None => false,
            Some(source) => source.get(field).map_or(!value.is_null(), |v| v != value),
        }
    }
}

impl PartialEq for EntityMeta {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for EntityMeta {}

impl Hash for EntityMeta {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.id {
            Some(id) => id.hash(state),
            None => std::ptr::hash(self, state),
        }
    }
}
