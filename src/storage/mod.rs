//! Storage contract, cache tier and the in-memory backend.

mod cache;
mod memory;
mod traits;

pub use cache::EntityCache;
pub use memory::InMemoryDocumentStore;
pub use traits::{
    Document, DocumentStore, DocumentWrite, SearchRequest, Selection, StorageError,
};
