//! Abstract document store contract.
//!
//! The mapping layer never talks to a concrete backend. Everything it needs
//! from the store goes through [`DocumentStore`]:
//! - authoritative lookups by id
//! - optimistic-concurrency-checked writes
//! - deletes
//! - selections driven by exactly one query or filter artifact

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constraints::{FilterNode, QueryNode};
use crate::entity::EntityId;
use crate::value::Value;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Document not found.
    #[error("Document not found: {doc_type}-{id}")]
    NotFound {
        /// Type partition that was searched.
        doc_type: String,
        /// Requested id.
        id: String,
    },

    /// The stored version differs from the one the write was based on.
    #[error("Version conflict on {id}: expected version {expected}, found {actual}")]
    VersionConflict {
        /// Id of the document.
        id: String,
        /// Version the write was based on.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// A stored document: identity, version and raw field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned identity.
    pub id: EntityId,
    /// Number of successful writes, starting at 1.
    pub version: u64,
    /// Raw field values keyed by property name.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Document {
    /// Returns the stored value of a field. The pseudo field `id` resolves to
    /// the document id.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        if name == crate::entity::ID_FIELD {
            return Some(Value::String(self.id.to_string()));
        }
        self.fields.get(name).cloned()
    }

}

/// A write handed to [`DocumentStore::put`].
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    /// Target id; `None` lets the store assign one.
    pub id: Option<EntityId>,
    /// Complete field set of the document.
    pub fields: BTreeMap<String, Value>,
    /// Version the write is based on. `None` overwrites unconditionally.
    pub expected_version: Option<u64>,
}

/// What a selection matches on.
///
/// A selection carries at most one artifact: scored and unscored predicates
/// are never sent together.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    /// Every document of the type.
    #[default]
    All,
    /// Scored query; hits are ordered by descending score.
    Query {
        /// Scored artifact.
        query: QueryNode,
    },
    /// Unscored filter; hits are ordered by id.
    Filter {
        /// Unscored artifact.
        filter: FilterNode,
    },
}

/// A selection plus paging.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Artifact the documents are matched against.
    pub selection: Selection,
    /// Maximum number of hits; `None` returns all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Storage trait for documents, partitioned by document type.
///
/// # Safety Considerations
/// - All mutations should be atomic per document
/// - Implementations should handle concurrent access safely
pub trait DocumentStore: Send + Sync {
    /// Authoritative lookup by id. Never served from a cache.
    fn get(&self, doc_type: &str, id: &EntityId) -> Result<Option<Document>, StorageError>;

    /// Inserts or replaces a document and returns it with its new id and version.
    ///
    /// # Errors
    /// - `VersionConflict`: `expected_version` is set and differs from the stored version
    fn put(&self, doc_type: &str, write: DocumentWrite) -> Result<Document, StorageError>;

    /// Deletes a document. Returns false if it did not exist.
    fn delete(&self, doc_type: &str, id: &EntityId) -> Result<bool, StorageError>;

    /// Returns the documents matching the request.
    fn search(&self, doc_type: &str, request: &SearchRequest) -> Result<Vec<Document>, StorageError>;

    /// Counts the documents matching the request, ignoring its limit.
    fn count(&self, doc_type: &str, request: &SearchRequest) -> Result<usize, StorageError> {
        let unbounded = SearchRequest {
            selection: request.selection.clone(),
            limit: None,
        };
        Ok(self.search(doc_type, &unbounded)?.len())
    }
}
