//! Entry point for loading, saving and deleting entities.

use std::fmt;
use std::sync::Arc;

use crate::config::IndexConfig;
use crate::entity::{Entity, EntityId, Lifecycle};
use crate::error::{ConfigError, DocResult};
use crate::query::Query;
use crate::storage::{Document, DocumentStore, DocumentWrite, EntityCache, InMemoryDocumentStore};

/// Maps entities onto a [`DocumentStore`].
///
/// The index owns the process-wide default cache. It is created with the
/// index and only invalidated explicitly: by writes and deletes going
/// through this index, or by [`invalidate`](Self::invalidate) /
/// [`invalidate_all`](Self::invalidate_all).
pub struct Index {
    store: Arc<dyn DocumentStore>,
    config: IndexConfig,
    default_cache: EntityCache,
}

impl Index {
    /// Creates an index on top of `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn new(store: Arc<dyn DocumentStore>, config: IndexConfig) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let default_cache = EntityCache::new(config.cache);
        Ok(Self {
            store,
            config,
            default_cache,
        })
    }

    /// Creates an index backed by a fresh [`InMemoryDocumentStore`] with the
    /// default configuration.
    #[must_use]
    pub fn in_memory() -> Self {
        let config = IndexConfig::default();
        Self {
            store: Arc::new(InMemoryDocumentStore::new()),
            default_cache: EntityCache::new(config.cache),
            config,
        }
    }

    /// The backing document store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Cache shared by all default-cached lookups.
    #[must_use]
    pub const fn default_cache(&self) -> &EntityCache {
        &self.default_cache
    }

    /// Creates an empty cache configured like the default cache, e.g. to
    /// scope cached lookups to a unit of work.
    #[must_use]
    pub fn new_cache(&self) -> EntityCache {
        EntityCache::new(self.config.cache)
    }

    /// Drops an entity from the default cache.
    pub fn invalidate<E: Entity>(&self, id: &EntityId) -> DocResult<()> {
        self.default_cache.invalidate(E::type_name(), id)?;
        Ok(())
    }

    /// Clears the default cache.
    pub fn invalidate_all(&self) -> DocResult<()> {
        self.default_cache.clear()?;
        Ok(())
    }

    /// Creates a new, unsaved entity with all properties initialized.
    #[must_use]
    pub fn create<E: Entity>(&self) -> E {
        E::descriptor().instantiate()
    }

    /// Loads an entity from the store. Never consults a cache.
    ///
    /// Blank ids and unknown ids yield `None`.
    pub fn find<E: Entity>(&self, id: &EntityId) -> DocResult<Option<E>> {
        if id.is_blank() {
            return Ok(None);
        }
        let document = self.store.get(E::type_name(), id)?;
        Ok(document.map(|doc| Self::materialize(&doc)))
    }

    /// Loads an entity, permitting a lookup in `cache`.
    ///
    /// Returns the entity (if any) and whether it was served from the cache.
    /// Documents loaded from the store are put into the cache.
    pub fn fetch<E: Entity>(&self, id: &EntityId, cache: &EntityCache) -> DocResult<(Option<E>, bool)> {
        if id.is_blank() {
            return Ok((None, false));
        }
        if let Some(doc) = cache.get(E::type_name(), id)? {
            tracing::debug!(target: "docmap::index", entity_type = E::type_name(), id = %id, "cache hit");
            return Ok((Some(Self::materialize(&doc)), true));
        }
        let Some(doc) = self.store.get(E::type_name(), id)? else {
            return Ok((None, false));
        };
        let entity = Self::materialize(&doc);
        cache.put(E::type_name(), doc)?;
        Ok((Some(entity), false))
    }

    /// Like [`fetch`](Self::fetch), using the default cache.
    pub fn fetch_default<E: Entity>(&self, id: &EntityId) -> DocResult<(Option<E>, bool)> {
        self.fetch(id, &self.default_cache)
    }

    /// Starts a selection of entities of type `E`.
    #[must_use]
    pub fn select<E: Entity>(&self) -> Query<'_, E> {
        Query::new(self)
    }

    /// Saves an entity without checking its version.
    pub fn update<E: Entity>(&self, entity: &mut E) -> DocResult<()> {
        self.save(entity, None)
    }

    /// Saves an entity if the stored document still has the entity's
    /// version.
    ///
    /// # Errors
    ///
    /// Fails with [`StorageError::VersionConflict`](crate::StorageError::VersionConflict)
    /// if the document was changed concurrently. The entity is left
    /// untouched; reload it and apply the change again.
    pub fn try_update<E: Entity>(&self, entity: &mut E) -> DocResult<()> {
        let expected = entity.version();
        self.save(entity, Some(expected))
    }

    fn save<E: Entity>(&self, entity: &mut E, expected_version: Option<u64>) -> DocResult<()> {
        // Hooks may rewrite fields, so the checks must see their output.
        entity.before_save(self)?;
        entity.before_save_checks(self)?;

        let fields = E::descriptor()
            .properties()
            .iter()
            .map(|p| (p.name().to_string(), p.read(entity)))
            .collect();
        let doc = self.store.put(
            E::type_name(),
            DocumentWrite {
                id: entity.id().cloned(),
                fields,
                expected_version,
            },
        )?;

        let meta = entity.meta_mut();
        meta.set_id(Some(doc.id.clone()));
        meta.set_version(doc.version);
        if meta.has_source() {
            for (name, value) in &doc.fields {
                meta.set_source(name.as_str(), value.clone());
            }
        }
        self.default_cache.invalidate(E::type_name(), &doc.id)?;
        tracing::debug!(
            target: "docmap::index",
            entity_type = E::type_name(),
            id = %doc.id,
            version = doc.version,
            "saved entity"
        );

        entity.after_save(self)
    }

    /// Deletes an entity. Deleting a new entity does nothing.
    ///
    /// # Errors
    ///
    /// Fails without deleting anything if a foreign key blocks the delete.
    pub fn delete<E: Entity>(&self, entity: &mut E) -> DocResult<()> {
        let Some(id) = entity.id().cloned() else {
            return Ok(());
        };
        entity.perform_delete_checks(self)?;

        entity.meta_mut().set_deleted(true);
        if let Err(e) = self.store.delete(E::type_name(), &id) {
            entity.meta_mut().set_deleted(false);
            return Err(e.into());
        }
        self.default_cache.invalidate(E::type_name(), &id)?;
        tracing::debug!(target: "docmap::index", entity_type = E::type_name(), id = %id, "deleted entity");

        entity.cascade_delete(self)
    }

    /// Builds an entity from a stored document and records the stored
    /// values for change tracking.
    pub(crate) fn materialize<E: Entity>(doc: &Document) -> E {
        let descriptor = E::descriptor();
        let mut entity = descriptor.instantiate();
        entity.meta_mut().init_source_tracing();
        for property in descriptor.properties() {
            let source = match doc.fields.get(property.name()) {
                Some(value) => {
                    property.write(&mut entity, value.clone());
                    value.clone()
                }
                None => property.read(&entity),
            };
            entity.meta_mut().set_source(property.name(), source);
        }
        let meta = entity.meta_mut();
        meta.set_id(Some(doc.id.clone()));
        meta.set_version(doc.version);
        entity
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("config", &self.config)
            .field("default_cache", &self.default_cache)
            .finish_non_exhaustive()
    }
}
