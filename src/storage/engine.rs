use crate::core::{IndexSpec, JsonMap, Namespace, Projection, Record, Result, Selector, SortSpec};
use async_trait::async_trait;

/// Document store driver contract - allows pluggable storage backends.
///
/// Every method is an individually atomic single-document operation; the
/// metadata protocol composes them and never assumes two calls happen
/// without interleaving writers. Implementations over a network must treat
/// each call as a potentially slow, cancellable round trip.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Does the underlying container exist, independent of its contents?
    async fn collection_exists(&self, db: &str, coll: &str) -> Result<bool>;

    /// Fetch a single record matching the selector.
    async fn find_one(
        &self,
        ns: &Namespace,
        selector: Selector,
        projection: &Projection,
    ) -> Result<Option<Record>>;

    /// Fetch records matching the selector, sorted, with skip/limit paging.
    async fn find(
        &self,
        ns: &Namespace,
        selector: Selector,
        sort: &SortSpec,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Record>>;

    /// Merge the patch fields into the matching record. With `upsert`, a
    /// missing record is created instead. Returns true if a record was
    /// written.
    async fn update_one(
        &self,
        ns: &Namespace,
        selector: Selector,
        patch: JsonMap,
        upsert: bool,
    ) -> Result<bool>;

    /// Atomically replace (or, with `upsert`, insert) the matching record
    /// and return the previous version.
    async fn find_and_replace(
        &self,
        ns: &Namespace,
        selector: Selector,
        body: JsonMap,
        upsert: bool,
    ) -> Result<Option<Record>>;

    /// Atomically remove the matching record, returning it.
    async fn find_and_remove(&self, ns: &Namespace, selector: Selector)
    -> Result<Option<Record>>;

    /// Store a record verbatim, overwriting any record with the same id.
    /// This is the compensating-write primitive: it must reproduce a
    /// previously removed record exactly.
    async fn save(&self, ns: &Namespace, record: Record) -> Result<()>;

    async fn count(&self, ns: &Namespace, selector: Selector) -> Result<u64>;

    /// Drop the container and everything in it. Not an error if absent.
    async fn drop_collection(&self, ns: &Namespace) -> Result<()>;

    /// Provision a named index. Idempotent per index name.
    async fn create_index(&self, ns: &Namespace, spec: IndexSpec) -> Result<()>;
}
