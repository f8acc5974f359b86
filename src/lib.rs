//! # docmap - Entity mapping for document stores
//!
//! docmap maps application types onto documents of a [`DocumentStore`]. It
//! covers the lifecycle of an entity (validation, save hooks, referential
//! integrity on delete), lazy references between entities and the constraint
//! algebra used to select them.
//!
//! ## Core Concepts
//!
//! - **Entity**: an application type described once by an [`EntityDescriptor`]
//! - **EntityRef / EntityRefList**: references which load their targets on demand
//! - **Constraint**: a predicate resolving to either a scored query or a filter
//! - **Index**: the facade which loads, saves, deletes and selects entities
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docmap::{Index, Lifecycle};
//!
//! let index = Index::in_memory();
//! let mut customer: Customer = index.create();
//! customer.name = "ACME".to_string();
//! index.update(&mut customer)?;
//!
//! let found = index.select::<Customer>().eq("name", "ACME").first()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constraints;
pub mod entity;
pub mod error;
pub mod index;
pub mod query;
pub mod storage;
pub mod value;

pub use config::{CacheConfig, IndexConfig};
pub use constraints::{
    And, BoxedConstraint, Constraint, FieldEqual, FieldMatch, FieldNotEqual, FieldRegex,
    FilterNode, QueryNode,
};
pub use entity::{
    DerivedField, Entity, EntityDescriptor, EntityId, EntityMeta, EntityRef, EntityRefList,
    ForeignKey, FormSource, Lifecycle, OnDelete, Property, RefRelation, Unique,
};
pub use error::{
    ConfigError, ConstraintError, DocError, DocResult, FieldError, ReferentialIntegrityError,
    ValidationError, ValidationFailure,
};
pub use index::Index;
pub use query::Query;
pub use storage::{
    Document, DocumentStore, DocumentWrite, EntityCache, InMemoryDocumentStore, SearchRequest,
    Selection, StorageError,
};
pub use value::Value;
