//! In-memory storage backend.
//!
//! This module provides a thread-safe in-memory implementation of
//! [`DocumentStore`]. It is intended for embedded usage, tests, and as a
//! reference implementation of how query and filter artifacts are evaluated.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::constraints::{FilterNode, QueryNode};
use crate::entity::EntityId;
use crate::storage::traits::{
    Document, DocumentStore, DocumentWrite, SearchRequest, Selection, StorageError,
};
use crate::value::Value;

const REGEX_CACHE_MAX: usize = 256;

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase()
}

fn tokens(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(normalize_key)
        .collect()
}

/// Compares a stored field against a term. Lists match if any element does.
fn term_matches(stored: Option<&Value>, expected: &Value) -> bool {
    match (stored, expected) {
        (None, Value::Null) => true,
        (None, _) => false,
        (Some(stored), Value::Null) => stored.is_empty(),
        (Some(Value::List(items)), expected) if !expected.is_list() => {
            items.iter().any(|item| item == expected)
        }
        (Some(stored), expected) => stored == expected,
    }
}

#[derive(Debug, Default)]
struct StoreState {
    by_type: HashMap<String, BTreeMap<EntityId, Document>>,
}

/// Thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    state: RwLock<StoreState>,
    regex_cache: RwLock<HashMap<String, regex::Regex>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents of a type.
    pub fn len(&self, doc_type: &str) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("store.len"))?;
        Ok(state.by_type.get(doc_type).map_or(0, BTreeMap::len))
    }

    fn cached_regex(&self, pattern: &str) -> Result<regex::Regex, StorageError> {
        {
            let guard = self.regex_cache.read().map_err(|_| lock_err("store.regex"))?;
            if let Some(re) = guard.get(pattern) {
                return Ok(re.clone());
            }
        }

        let compiled = regex::Regex::new(pattern)
            .map_err(|e| StorageError::BackendError(format!("invalid regex '{pattern}': {e}")))?;

        let mut guard = self.regex_cache.write().map_err(|_| lock_err("store.regex"))?;
        if guard.len() >= REGEX_CACHE_MAX {
            guard.clear();
        }
        // Another thread may have inserted it while we compiled.
        guard
            .entry(pattern.to_string())
            .or_insert_with(|| compiled.clone());
        Ok(compiled)
    }

    fn filter_matches(&self, filter: &FilterNode, doc: &Document) -> Result<bool, StorageError> {
        match filter {
            FilterNode::Bool { must } => {
                for inner in must {
                    if !self.filter_matches(inner, doc)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            FilterNode::Term { field, value } => Ok(term_matches(doc.field(field).as_ref(), value)),
            FilterNode::Not { filter } => Ok(!self.filter_matches(filter, doc)?),
            FilterNode::Regex { field, pattern } => {
                let re = self.cached_regex(pattern)?;
                Ok(match doc.field(field) {
                    None | Some(Value::Null) => false,
                    Some(Value::List(items)) => {
                        items.iter().any(|item| re.is_match(&item.to_user_string()))
                    }
                    Some(other) => re.is_match(&other.to_user_string()),
                })
            }
        }
    }

    /// Returns the score of a document, or `None` if it doesn't match.
    fn query_score(query: &QueryNode, doc: &Document) -> Option<f64> {
        match query {
            QueryNode::Bool { must } => {
                let mut total = 0.0;
                for inner in must {
                    total += Self::query_score(inner, doc)?;
                }
                Some(total)
            }
            QueryNode::Term { field, value } => {
                term_matches(doc.field(field).as_ref(), value).then_some(1.0)
            }
            QueryNode::Match { field, text } => {
                let wanted = tokens(text);
                if wanted.is_empty() {
                    return None;
                }
                let stored = tokens(&doc.field(field)?.to_user_string());
                let found = wanted.iter().filter(|t| stored.contains(t)).count();
                if found == 0 {
                    return None;
                }
                #[allow(clippy::cast_precision_loss)]
                Some(found as f64 / wanted.len() as f64)
            }
        }
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, doc_type: &str, id: &EntityId) -> Result<Option<Document>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("store.get"))?;
        Ok(state
            .by_type
            .get(doc_type)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn put(&self, doc_type: &str, write: DocumentWrite) -> Result<Document, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("store.put"))?;
        let docs = state.by_type.entry(doc_type.to_string()).or_default();

        let id = write.id.unwrap_or_else(EntityId::generate);
        let current_version = docs.get(&id).map_or(0, |d| d.version);
        if let Some(expected) = write.expected_version {
            if expected != current_version {
                return Err(StorageError::VersionConflict {
                    id: id.to_string(),
                    expected,
                    actual: current_version,
                });
            }
        }

        let doc = Document {
            id: id.clone(),
            version: current_version + 1,
            fields: write.fields,
        };
        docs.insert(id, doc.clone());
        Ok(doc)
    }

    fn delete(&self, doc_type: &str, id: &EntityId) -> Result<bool, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("store.delete"))?;
        Ok(state
            .by_type
            .get_mut(doc_type)
            .and_then(|docs| docs.remove(id))
            .is_some())
    }

    fn search(&self, doc_type: &str, request: &SearchRequest) -> Result<Vec<Document>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("store.search"))?;
        let Some(docs) = state.by_type.get(doc_type) else {
            return Ok(Vec::new());
        };
        let limit = request.limit.unwrap_or(usize::MAX);

        match &request.selection {
            Selection::All => Ok(docs.values().take(limit).cloned().collect()),
            Selection::Filter { filter } => {
                let mut hits = Vec::new();
                for doc in docs.values() {
                    if hits.len() >= limit {
                        break;
                    }
                    if self.filter_matches(filter, doc)? {
                        hits.push(doc.clone());
                    }
                }
                Ok(hits)
            }
            Selection::Query { query } => {
                let mut scored: Vec<(f64, &Document)> = docs
                    .values()
                    .filter_map(|doc| Self::query_score(query, doc).map(|s| (s, doc)))
                    .collect();
                // Stable sort keeps id order among equal scores.
                scored.sort_by(|(sa, _), (sb, _)| sb.total_cmp(sa));
                Ok(scored
                    .into_iter()
                    .take(limit)
                    .map(|(_, doc)| doc.clone())
                    .collect())
            }
        }
    }
}
