//! Save, delete and form-load behavior shared by all entities.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use super::{Entity, ID_FIELD};
use crate::error::{ConfigError, DocResult, FieldError, ValidationError, ValidationFailure};
use crate::index::Index;
use crate::value::Value;

/// Source of submitted form values, keyed by property name.
pub trait FormSource {
    /// The submitted text for `name`, if the form carries the field.
    fn value(&self, name: &str) -> Option<&str>;
}

impl FormSource for HashMap<String, String> {
    fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl FormSource for BTreeMap<String, String> {
    fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Lifecycle operations available on every [`Entity`].
///
/// Implemented for all entity types at once, so the order of steps cannot be
/// changed per type. Types customize saving through the hooks registered on
/// their [`EntityDescriptor`](super::EntityDescriptor).
pub trait Lifecycle: Entity {
    /// Syncs derived fields and checks not-null and uniqueness markers of
    /// every property. All properties are checked; the first violation is
    /// reported together with the annotations of all failed fields.
    fn before_save_checks(&mut self, index: &Index) -> DocResult<()>;

    /// Runs the internal hooks, then the application save hooks.
    fn before_save(&mut self, index: &Index) -> DocResult<()>;

    /// Notifies every foreign key referencing this type of the save.
    fn after_save(&self, index: &Index) -> DocResult<()>;

    /// Fails if any foreign key referencing this type blocks the delete.
    fn perform_delete_checks(&self, index: &Index) -> DocResult<()>;

    /// Lets every foreign key referencing this type react to the delete.
    fn cascade_delete(&self, index: &Index) -> DocResult<()>;

    /// Applies the submitted values of the properties named in `fields`.
    /// Returns `(old, new)` for every property whose stored value changed.
    fn load_form(&mut self, form: &dyn FormSource, fields: &[&str]) -> BTreeMap<String, (Value, Value)>;

    /// Globally unique id (`<type>-<id>`), or `None` for new entities.
    fn unique_id(&self) -> Option<String>;

    /// Diagnostic rendering of id, version and all properties.
    fn describe(&self) -> String;
}

impl<E: Entity> Lifecycle for E {
    fn before_save_checks(&mut self, index: &Index) -> DocResult<()> {
        let descriptor = Self::descriptor();
        let mut first: Option<ValidationError> = None;
        let mut field_errors = Vec::new();

        for property in descriptor.properties() {
            if let Some(derived) = property.derived_field() {
                match derived.resolve(self, index) {
                    Ok(Some(value)) => property.write(self, value),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            target: "docmap::lifecycle",
                            entity_type = Self::type_name(),
                            property = property.name(),
                            local_ref = derived.local_ref(),
                            remote_field = derived.remote_field(),
                            error = %e,
                            "failed to update derived field"
                        );
                    }
                }
            }

            let value = property.read(self);
            if !property.is_nullable() && value.is_empty() {
                field_errors.push(FieldError {
                    field: property.name().to_string(),
                    value: None,
                });
                first.get_or_insert_with(|| ValidationError::FieldMustBeFilled {
                    entity_type: Self::type_name().to_string(),
                    field: property.name().to_string(),
                });
            }

            let Some(unique) = property.unique_marker() else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            let mut query = index.select::<Self>().eq(property.name(), value.clone());
            if let Some(id) = self.id() {
                query = query.not_eq(ID_FIELD, id.as_str());
            }
            if let Some(scope) = unique.scope() {
                let scope = descriptor.property(scope).ok_or_else(|| ConfigError::Invalid {
                    field: format!("{}.{}", Self::type_name(), property.name()),
                    reason: format!("unique scope '{scope}' is not a property"),
                })?;
                query = query.eq(scope.name(), scope.read(self));
            }
            if query.exists()? {
                let shown = value.to_user_string();
                field_errors.push(FieldError {
                    field: property.name().to_string(),
                    value: Some(shown.clone()),
                });
                first.get_or_insert_with(|| ValidationError::FieldMustBeUnique {
                    entity_type: Self::type_name().to_string(),
                    field: property.name().to_string(),
                    value: shown,
                });
            }
        }

        match first {
            Some(first) => Err(ValidationFailure { first, field_errors }.into()),
            None => Ok(()),
        }
    }

    fn before_save(&mut self, index: &Index) -> DocResult<()> {
        let descriptor = Self::descriptor();
        for hook in descriptor.internal_hooks().iter().chain(descriptor.save_hooks()) {
            hook(&mut *self, index)?;
        }
        Ok(())
    }

    fn after_save(&self, index: &Index) -> DocResult<()> {
        for fk in Self::descriptor().remote_foreign_keys() {
            fk.on_save(self, index)?;
        }
        Ok(())
    }

    fn perform_delete_checks(&self, index: &Index) -> DocResult<()> {
        for fk in Self::descriptor().remote_foreign_keys() {
            fk.check_delete(self, index)?;
        }
        Ok(())
    }

    fn cascade_delete(&self, index: &Index) -> DocResult<()> {
        for fk in Self::descriptor().remote_foreign_keys() {
            fk.on_delete(self, index)?;
        }
        Ok(())
    }

    fn load_form(&mut self, form: &dyn FormSource, fields: &[&str]) -> BTreeMap<String, (Value, Value)> {
        let mut changes = BTreeMap::new();
        for property in Self::descriptor().properties() {
            if !fields.contains(&property.name()) {
                continue;
            }
            let old = property.read(self);
            property.read_from_form(self, form);
            let new = property.read(self);
            if old != new {
                changes.insert(property.name().to_string(), (old, new));
            }
        }
        changes
    }

    fn unique_id(&self) -> Option<String> {
        self.id().map(|id| format!("{}-{}", Self::type_name(), id))
    }

    fn describe(&self) -> String {
        let mut out = match self.id() {
            Some(id) => id.to_string(),
            None => "new".to_string(),
        };
        let _ = write!(out, " (Version: {}) {{", self.version());
        for (idx, property) in Self::descriptor().properties().iter().enumerate() {
            if idx > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}: '{}'", property.name(), property.read(self).to_user_string());
        }
        out.push('}');
        out
    }
}
