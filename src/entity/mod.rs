//! Entities and their references.
//!
//! An entity is an application type stored as one document. It embeds an
//! [`EntityMeta`] and describes its persisted properties once through an
//! [`EntityDescriptor`].
//!
//! ```ignore
//! #[derive(Default, Clone)]
//! struct Customer {
//!     meta: EntityMeta,
//!     name: String,
//! }
//!
//! impl Entity for Customer {
//!     fn descriptor() -> &'static EntityDescriptor<Self> {
//!         static DESCRIPTOR: OnceLock<EntityDescriptor<Customer>> = OnceLock::new();
//!         DESCRIPTOR.get_or_init(|| {
//!             EntityDescriptor::builder("customer")
//!                 .property(
//!                     Property::new("name", |c: &Customer| c.name.clone().into(), |c, v| {
//!                         c.name = v.to_user_string();
//!                     })
//!                     .not_null(),
//!                 )
//!                 .build()
//!                 .expect("valid customer descriptor")
//!         })
//!     }
//!
//!     fn meta(&self) -> &EntityMeta { &self.meta }
//!     fn meta_mut(&mut self) -> &mut EntityMeta { &mut self.meta }
//! }
//! ```

mod descriptor;
mod foreign_key;
mod id;
mod lifecycle;
mod meta;
mod reference;
mod reference_list;

pub use descriptor::{
    DerivedField, EntityDescriptor, EntityDescriptorBuilder, Property, SaveHook, Unique,
};
pub use foreign_key::{ForeignKey, OnDelete, RefRelation};
pub use id::EntityId;
pub use lifecycle::{FormSource, Lifecycle};
pub use meta::EntityMeta;
pub use reference::EntityRef;
pub use reference_list::EntityRefList;

/// Pseudo field addressing the document id in selections.
pub const ID_FIELD: &str = "id";

/// An application type mapped to a stored document.
pub trait Entity: Default + Clone + Send + Sync + 'static {
    /// The type's descriptor, built once.
    fn descriptor() -> &'static EntityDescriptor<Self>;

    /// Identity and persistence state embedded in the entity.
    fn meta(&self) -> &EntityMeta;

    /// Mutable access to the embedded state.
    fn meta_mut(&mut self) -> &mut EntityMeta;

    /// Document type name in the store.
    fn type_name() -> &'static str {
        Self::descriptor().type_name()
    }

    /// Document id, `None` until the first save.
    fn id(&self) -> Option<&EntityId> {
        self.meta().id()
    }

    /// Stored version, 0 if never persisted.
    fn version(&self) -> u64 {
        self.meta().version()
    }

    /// Returns true if the entity was never persisted.
    fn is_new(&self) -> bool {
        self.meta().is_new()
    }

    /// Returns true if the entity is persisted and not deleted.
    fn exists(&self) -> bool {
        self.meta().exists()
    }

    /// Returns true once the entity was deleted.
    fn is_deleted(&self) -> bool {
        self.meta().is_deleted()
    }
}
