// ============================================================================
// DocuDB Library
// ============================================================================

pub mod collections;
pub mod core;
pub mod etag;
pub mod storage;

// Re-export main types for convenience
pub use collections::{CollectionManager, DeleteOutcome, UpsertOutcome};
pub use crate::core::{DbError, JsonMap, Record, RecordId, Result};
pub use etag::Etag;
pub use storage::{DocumentStore, InMemoryStore};

// ============================================================================
// High-level Client API
// ============================================================================

/// Document store client over an in-memory backend.
///
/// The recommended entry point for applications and tests: one client is
/// created at process start and shared (it is cheap to clone) - there is
/// no global connection singleton.
///
/// # Examples
///
/// ```
/// use docudb::{Client, UpsertOutcome};
///
/// # tokio_test::block_on(async {
/// let client = Client::new();
///
/// let outcome = client
///     .upsert_collection("mydb", "orders", serde_json::Map::new(), false)
///     .await
///     .unwrap();
/// assert_eq!(outcome, UpsertOutcome::Created);
///
/// let metadata = client.collection_metadata("mydb", "orders").await.unwrap();
/// assert!(metadata.contains_key("@created_on"));
/// # });
/// ```
#[derive(Clone)]
pub struct Client {
    manager: CollectionManager<InMemoryStore>,
}

impl Client {
    /// Create a client over a fresh in-memory store.
    pub fn new() -> Self {
        Self {
            manager: CollectionManager::in_memory(),
        }
    }

    /// Create a client over an existing store handle.
    pub fn with_store(store: std::sync::Arc<InMemoryStore>) -> Self {
        Self {
            manager: CollectionManager::new(store),
        }
    }

    /// The collection metadata manager backing this client.
    pub fn collections(&self) -> &CollectionManager<InMemoryStore> {
        &self.manager
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for Client {
    type Target = CollectionManager<InMemoryStore>;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}
