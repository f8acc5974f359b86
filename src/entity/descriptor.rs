//! Static description of an entity type.
//!
//! Every entity type builds one [`EntityDescriptor`] once (typically in a
//! `OnceLock` inside [`Entity::descriptor`](super::Entity::descriptor)). It
//! lists the persisted properties in declaration order, the hooks run before
//! saving, and the foreign keys of other types pointing at this one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::foreign_key::ForeignKey;
use super::{Entity, EntityId, EntityRef, EntityRefList, FormSource};
use crate::error::{ConfigError, DocError, DocResult};
use crate::index::Index;
use crate::value::Value;

type Reader<E> = Arc<dyn Fn(&E) -> Value + Send + Sync>;
type Writer<E> = Arc<dyn Fn(&mut E, Value) + Send + Sync>;
type Initializer<E> = Arc<dyn Fn(&mut E) + Send + Sync>;
type Resolver<E> = Arc<dyn Fn(&mut E, &Index) -> DocResult<Option<Value>> + Send + Sync>;

/// A hook run by [`Lifecycle::before_save`](super::Lifecycle::before_save).
pub type SaveHook<E> = Arc<dyn Fn(&mut E, &Index) -> DocResult<()> + Send + Sync>;

/// Uniqueness marker of a property.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Unique {
    within: Option<String>,
}

impl Unique {
    /// Unique across all entities of the type.
    #[must_use]
    pub fn global() -> Self {
        Self::default()
    }

    /// Unique among entities sharing the value of the `within` property.
    #[must_use]
    pub fn within(property: impl Into<String>) -> Self {
        Self {
            within: Some(property.into()),
        }
    }

    /// Property the uniqueness is scoped to, `None` for global uniqueness.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.within.as_deref()
    }
}

/// Marks a property as a copy of a field of a referenced entity.
///
/// Before saving, the local reference is resolved and the remote field's
/// current value is written into the property.
pub struct DerivedField<E> {
    local_ref: String,
    remote_field: String,
    resolve: Resolver<E>,
}

impl<E: Entity> DerivedField<E> {
    /// Mirrors `remote_field` of the entity referenced by the `local_ref`
    /// property, which is reached through `reference`.
    pub fn through<R: Entity>(
        local_ref: impl Into<String>,
        remote_field: impl Into<String>,
        reference: fn(&mut E) -> &mut EntityRef<R>,
    ) -> Self {
        let remote_field = remote_field.into();
        let remote = remote_field.clone();
        let resolve: Resolver<E> = Arc::new(move |entity: &mut E, index: &Index| {
            let Some(target) = reference(entity).get_value(index)? else {
                return Ok(None);
            };
            let property = R::descriptor().property(&remote).ok_or_else(|| {
                DocError::internal(format!(
                    "unknown property '{}' of {}",
                    remote,
                    R::type_name()
                ))
            })?;
            Ok(Some(property.read(target)))
        });
        Self {
            local_ref: local_ref.into(),
            remote_field,
            resolve,
        }
    }

    /// Name of the reference property the value is mirrored through.
    #[must_use]
    pub fn local_ref(&self) -> &str {
        &self.local_ref
    }

    /// Name of the mirrored property of the referenced entity.
    #[must_use]
    pub fn remote_field(&self) -> &str {
        &self.remote_field
    }

    /// Resolves the current remote value. `Ok(None)` if nothing is referenced
    /// or the target no longer exists.
    pub fn resolve(&self, entity: &mut E, index: &Index) -> DocResult<Option<Value>> {
        (self.resolve)(entity, index)
    }
}

impl<E> fmt::Debug for DerivedField<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedField")
            .field("local_ref", &self.local_ref)
            .field("remote_field", &self.remote_field)
            .finish_non_exhaustive()
    }
}

/// A persisted property of an entity type.
pub struct Property<E> {
    name: String,
    read: Reader<E>,
    write: Writer<E>,
    init: Option<Initializer<E>>,
    nullable: bool,
    unique: Option<Unique>,
    derived: Option<DerivedField<E>>,
}

impl<E: Entity> Property<E> {
    /// Declares a property from its codec: `read` produces the stored value,
    /// `write` applies a stored (or submitted) value.
    ///
    /// Properties accept empty values unless marked [`not_null`](Self::not_null).
    pub fn new(
        name: impl Into<String>,
        read: impl Fn(&E) -> Value + Send + Sync + 'static,
        write: impl Fn(&mut E, Value) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            read: Arc::new(read),
            write: Arc::new(write),
            init: None,
            nullable: true,
            unique: None,
            derived: None,
        }
    }

    /// Declares a reference property, stored as the referenced id.
    pub fn reference<R: Entity>(
        name: impl Into<String>,
        get: fn(&E) -> &EntityRef<R>,
        get_mut: fn(&mut E) -> &mut EntityRef<R>,
    ) -> Self {
        Self::new(
            name,
            move |entity: &E| get(entity).to_value(),
            move |entity: &mut E, value: Value| get_mut(entity).set_id(EntityId::from_value(&value)),
        )
    }

    /// Declares a reference list property, stored as a list of ids.
    pub fn reference_list<R: Entity>(
        name: impl Into<String>,
        get: fn(&E) -> &EntityRefList<R>,
        get_mut: fn(&mut E) -> &mut EntityRefList<R>,
    ) -> Self {
        Self::new(
            name,
            move |entity: &E| get(entity).to_value(),
            move |entity: &mut E, value: Value| get_mut(entity).set_ids_from_value(&value),
        )
    }

    /// Rejects empty values on save.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Requires the value to be unique, see [`Unique`].
    #[must_use]
    pub fn unique(mut self, unique: Unique) -> Self {
        self.unique = Some(unique);
        self
    }

    /// Mirrors the value from a referenced entity before every save.
    #[must_use]
    pub fn derived(mut self, derived: DerivedField<E>) -> Self {
        self.derived = Some(derived);
        self
    }

    /// Sets the default-value initializer run for every new instance.
    #[must_use]
    pub fn init_with(mut self, init: impl Fn(&mut E) + Send + Sync + 'static) -> Self {
        self.init = Some(Arc::new(init));
        self
    }

    /// Field name in the stored document.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// False if the property was marked [`not_null`](Self::not_null).
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The uniqueness marker, if any.
    #[must_use]
    pub const fn unique_marker(&self) -> Option<&Unique> {
        self.unique.as_ref()
    }

    /// The derivation, if the property is derived.
    #[must_use]
    pub const fn derived_field(&self) -> Option<&DerivedField<E>> {
        self.derived.as_ref()
    }

    /// Returns the value to store for this property.
    pub fn read(&self, entity: &E) -> Value {
        (self.read)(entity)
    }

    /// Applies a stored value to the entity.
    pub fn write(&self, entity: &mut E, value: Value) {
        (self.write)(entity, value);
    }

    /// Runs the initializer, if one was given.
    pub fn init(&self, entity: &mut E) {
        if let Some(init) = &self.init {
            init(entity);
        }
    }

    /// Applies a submitted form value, if the form carries one. Empty
    /// submissions are applied as `Null`.
    pub fn read_from_form(&self, entity: &mut E, form: &dyn FormSource) {
        let Some(raw) = form.value(&self.name) else {
            return;
        };
        let value = if raw.is_empty() {
            Value::Null
        } else {
            Value::String(raw.to_string())
        };
        self.write(entity, value);
    }
}

impl<E> fmt::Debug for Property<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("nullable", &self.nullable)
            .field("unique", &self.unique)
            .field("derived", &self.derived)
            .finish_non_exhaustive()
    }
}

/// Everything the mapping layer knows about an entity type.
pub struct EntityDescriptor<E> {
    type_name: &'static str,
    properties: Vec<Property<E>>,
    by_name: HashMap<String, usize>,
    remote_foreign_keys: Vec<Arc<dyn ForeignKey<E>>>,
    internal_hooks: Vec<SaveHook<E>>,
    save_hooks: Vec<SaveHook<E>>,
}

impl<E: Entity> EntityDescriptor<E> {
    /// Starts describing the entity type stored under `type_name`.
    #[must_use]
    pub fn builder(type_name: &'static str) -> EntityDescriptorBuilder<E> {
        EntityDescriptorBuilder {
            type_name,
            properties: Vec::new(),
            remote_foreign_keys: Vec::new(),
            internal_hooks: Vec::new(),
            save_hooks: Vec::new(),
        }
    }

    /// Name of the document type partition.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Properties in declaration order.
    #[must_use]
    pub fn properties(&self) -> &[Property<E>] {
        &self.properties
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property<E>> {
        self.by_name.get(name).map(|idx| &self.properties[*idx])
    }

    /// Foreign keys of other types which reference this type.
    #[must_use]
    pub fn remote_foreign_keys(&self) -> &[Arc<dyn ForeignKey<E>>] {
        &self.remote_foreign_keys
    }

    /// Framework hooks, in registration order.
    #[must_use]
    pub fn internal_hooks(&self) -> &[SaveHook<E>] {
        &self.internal_hooks
    }

    /// Application hooks, in registration order.
    #[must_use]
    pub fn save_hooks(&self) -> &[SaveHook<E>] {
        &self.save_hooks
    }

    /// Returns true if some property mirrors a field through `local_ref`.
    #[must_use]
    pub fn has_derived_fields_through(&self, local_ref: &str) -> bool {
        self.properties
            .iter()
            .filter_map(Property::derived_field)
            .any(|d| d.local_ref() == local_ref)
    }

    /// Creates a new instance with every property initialized.
    #[must_use]
    pub fn instantiate(&self) -> E {
        let mut entity = E::default();
        for property in &self.properties {
            property.init(&mut entity);
        }
        entity
    }

    /// Checks that every property name referenced by a marker is declared.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending property.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for property in &self.properties {
            if let Some(scope) = property.unique_marker().and_then(Unique::scope) {
                if self.property(scope).is_none() {
                    return Err(ConfigError::Invalid {
                        field: format!("{}.{}", self.type_name, property.name()),
                        reason: format!("unique scope '{scope}' is not a property"),
                    });
                }
            }
            if let Some(derived) = property.derived_field() {
                if self.property(derived.local_ref()).is_none() {
                    return Err(ConfigError::Invalid {
                        field: format!("{}.{}", self.type_name, property.name()),
                        reason: format!("local reference '{}' is not a property", derived.local_ref()),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<E> fmt::Debug for EntityDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("type_name", &self.type_name)
            .field("properties", &self.properties)
            .field("remote_foreign_keys", &self.remote_foreign_keys.len())
            .field("internal_hooks", &self.internal_hooks.len())
            .field("save_hooks", &self.save_hooks.len())
            .finish()
    }
}

/// Builder for [`EntityDescriptor`].
pub struct EntityDescriptorBuilder<E> {
    type_name: &'static str,
    properties: Vec<Property<E>>,
    remote_foreign_keys: Vec<Arc<dyn ForeignKey<E>>>,
    internal_hooks: Vec<SaveHook<E>>,
    save_hooks: Vec<SaveHook<E>>,
}

impl<E: Entity> EntityDescriptorBuilder<E> {
    /// Adds a property. A later property with the same name replaces the
    /// earlier one.
    #[must_use]
    pub fn property(mut self, property: Property<E>) -> Self {
        self.properties.retain(|p| p.name() != property.name());
        self.properties.push(property);
        self
    }

    /// Registers a foreign key of another type referencing this one.
    #[must_use]
    pub fn referenced_by(mut self, foreign_key: impl ForeignKey<E> + 'static) -> Self {
        self.remote_foreign_keys.push(Arc::new(foreign_key));
        self
    }

    /// Adds a framework-level hook. Internal hooks always run before
    /// application hooks.
    #[must_use]
    pub fn internal_hook(
        mut self,
        hook: impl Fn(&mut E, &Index) -> DocResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.internal_hooks.push(Arc::new(hook));
        self
    }

    /// Adds an application-level save hook.
    #[must_use]
    pub fn save_hook(
        mut self,
        hook: impl Fn(&mut E, &Index) -> DocResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.save_hooks.push(Arc::new(hook));
        self
    }

    /// Finishes the descriptor and [validates](EntityDescriptor::validate) it.
    ///
    /// # Errors
    ///
    /// Fails if a unique scope or a derived field's local reference names a
    /// property that was never declared.
    pub fn build(self) -> Result<EntityDescriptor<E>, ConfigError> {
        let by_name = self
            .properties
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.name().to_string(), idx))
            .collect();
        let descriptor = EntityDescriptor {
            type_name: self.type_name,
            properties: self.properties,
            by_name,
            remote_foreign_keys: self.remote_foreign_keys,
            internal_hooks: self.internal_hooks,
            save_hooks: self.save_hooks,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}
