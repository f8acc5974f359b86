//! Relations from other entity types pointing at an entity.
//!
//! A [`ForeignKey`] is registered on the *referenced* type (see
//! [`EntityDescriptorBuilder::referenced_by`](super::EntityDescriptorBuilder::referenced_by))
//! and is told when an instance of that type is saved or deleted.

use std::fmt;
use std::marker::PhantomData;

use super::{Entity, EntityRef};
use crate::error::{DocResult, ReferentialIntegrityError};
use crate::index::Index;

/// A relation of some owner type referencing entities of type `E`.
pub trait ForeignKey<E: Entity>: Send + Sync {
    /// Human readable name of the relation, used in error messages.
    fn name(&self) -> String;

    /// Fails if `target` must not be deleted. Runs for every relation before
    /// anything is deleted.
    fn check_delete(&self, target: &E, index: &Index) -> DocResult<()>;

    /// Called after `target` was deleted.
    fn on_delete(&self, target: &E, index: &Index) -> DocResult<()>;

    /// Called after `target` was saved.
    fn on_save(&self, target: &E, index: &Index) -> DocResult<()>;
}

/// What happens to owners when the referenced entity is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete every referencing owner.
    Cascade,
    /// Clear the reference and save the owner.
    SetNull,
    /// Refuse to delete while owners exist.
    Reject,
}

/// Foreign key backed by an [`EntityRef`] property of the owner type `O`.
///
/// # Examples
///
/// ```ignore
/// EntityDescriptor::builder("customer")
///     .referenced_by(RefRelation::new("customer", |o: &mut Order| &mut o.customer, OnDelete::Reject))
///     .build()?
/// ```
pub struct RefRelation<O, T> {
    field: String,
    reference: fn(&mut O) -> &mut EntityRef<T>,
    policy: OnDelete,
    _target: PhantomData<fn() -> T>,
}

impl<O: Entity, T: Entity> RefRelation<O, T> {
    /// `field` is the name of the reference property on `O`, `reference`
    /// gives access to it.
    pub fn new(
        field: impl Into<String>,
        reference: fn(&mut O) -> &mut EntityRef<T>,
        policy: OnDelete,
    ) -> Self {
        Self {
            field: field.into(),
            reference,
            policy,
            _target: PhantomData,
        }
    }

    /// What happens to owners on delete.
    #[must_use]
    pub const fn policy(&self) -> OnDelete {
        self.policy
    }

    fn owners_of(&self, target: &T, index: &Index) -> DocResult<Vec<O>> {
        match target.id() {
            Some(id) => index.select::<O>().eq(&self.field, id.as_str()).query_all(),
            None => Ok(Vec::new()),
        }
    }

    /// Whether any field of `owner` derived through this relation would get a
    /// new value. Unresolvable derived fields count as unchanged.
    fn mirrors_changed(&self, owner: &mut O, index: &Index) -> bool {
        O::descriptor().properties().iter().any(|property| {
            let Some(derived) = property.derived_field() else {
                return false;
            };
            if derived.local_ref() != self.field {
                return false;
            }
            matches!(
                derived.resolve(&mut *owner, index),
                Ok(Some(value)) if value != property.read(&*owner)
            )
        })
    }
}

impl<O: Entity, T: Entity> ForeignKey<T> for RefRelation<O, T> {
    fn name(&self) -> String {
        format!("{}.{}", O::type_name(), self.field)
    }

    fn check_delete(&self, target: &T, index: &Index) -> DocResult<()> {
        if self.policy != OnDelete::Reject {
            return Ok(());
        }
        let Some(id) = target.id() else {
            return Ok(());
        };
        let referenced_by = index.select::<O>().eq(&self.field, id.as_str()).count()?;
        if referenced_by > 0 {
            return Err(ReferentialIntegrityError::DeleteBlocked {
                entity_type: T::type_name().to_string(),
                id: id.to_string(),
                relation: self.name(),
                referenced_by,
            }
            .into());
        }
        Ok(())
    }

    fn on_delete(&self, target: &T, index: &Index) -> DocResult<()> {
        match self.policy {
            OnDelete::Reject => Ok(()),
            OnDelete::Cascade => {
                for mut owner in self.owners_of(target, index)? {
                    tracing::debug!(
                        target: "docmap::foreign_key",
                        relation = %self.name(),
                        owner = ?owner.id(),
                        "cascading delete"
                    );
                    index.delete(&mut owner)?;
                }
                Ok(())
            }
            OnDelete::SetNull => {
                for mut owner in self.owners_of(target, index)? {
                    (self.reference)(&mut owner).set_id(None);
                    index.update(&mut owner)?;
                }
                Ok(())
            }
        }
    }

    fn on_save(&self, target: &T, index: &Index) -> DocResult<()> {
        if !O::descriptor().has_derived_fields_through(&self.field) {
            return Ok(());
        }
        for mut owner in self.owners_of(target, index)? {
            if self.mirrors_changed(&mut owner, index) {
                index.update(&mut owner)?;
            } else {
                tracing::debug!(
                    target: "docmap::foreign_key",
                    relation = %self.name(),
                    owner = ?owner.id(),
                    "derived fields unchanged, skipping save"
                );
            }
        }
        Ok(())
    }
}

impl<O, T> fmt::Debug for RefRelation<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefRelation")
            .field("field", &self.field)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
