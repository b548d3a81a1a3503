use super::{CREATED_ON, ETAG, LASTUPDATED_ON, sort::parse_sort_by};
use crate::core::{IndexSpec, JsonMap, Namespace, Projection, Record, Result, Selector, SortOrder};
use crate::etag::Etag;
use crate::storage::{DocumentStore, InMemoryStore};
use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of a metadata upsert, in transport-agnostic vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The sentinel did not exist and this writer created it.
    Created,
    /// The sentinel existed and was replaced or patched.
    Updated,
    /// Patch requested but no sentinel exists; patch cannot create.
    NotFound,
}

/// Outcome of a collection delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Sentinel removed after a successful etag check (or with no stored
    /// etag to check) and the container dropped.
    Deleted,
    /// No sentinel existed; the empty container was dropped outright.
    DeletedNoMetadata,
    /// The collection still holds data records; nothing was mutated.
    NotEmpty,
    /// Supplied etag did not match; the sentinel was restored untouched.
    EtagMismatch,
}

/// Manager for the per-collection metadata sentinel.
///
/// Holds an explicit store handle - acquired once at startup and threaded
/// through every call - and keeps no state of its own between calls; all
/// state lives in the store. Cloning shares the handle.
pub struct CollectionManager<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> Clone for CollectionManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl CollectionManager<InMemoryStore> {
    /// Manager over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }
}

impl<S: DocumentStore> CollectionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Does the underlying container exist? Empty names and names with
    /// spaces are never valid, so they short-circuit to `false`.
    pub async fn collection_exists(&self, db: &str, coll: &str) -> Result<bool> {
        if !valid_name(db) || !valid_name(coll) {
            return Ok(false);
        }
        self.store.collection_exists(db, coll).await
    }

    /// Is the sentinel record present? Side-effect free.
    pub async fn metadata_exists(&self, db: &str, coll: &str) -> Result<bool> {
        let ns = Namespace::new(db, coll);
        let found = self
            .store
            .find_one(&ns, Selector::Metadata, &Projection::Include(vec![]))
            .await?;
        Ok(found.is_some())
    }

    /// True when the collection holds no data records. The sentinel does
    /// not count.
    pub async fn is_collection_empty(&self, db: &str, coll: &str) -> Result<bool> {
        Ok(self.collection_size(db, coll).await? == 0)
    }

    /// Number of data records in the collection.
    pub async fn collection_size(&self, db: &str, coll: &str) -> Result<u64> {
        let ns = Namespace::new(db, coll);
        self.store.count(&ns, Selector::Data).await
    }

    /// Read the sentinel body. Adds a derived `@lastupdated_on` when the
    /// stored etag parses; returns an empty map when no sentinel exists -
    /// absent metadata is a valid state, never an error.
    pub async fn collection_metadata(&self, db: &str, coll: &str) -> Result<JsonMap> {
        let ns = Namespace::new(db, coll);
        let mut metadata = self
            .store
            .find_one(&ns, Selector::Metadata, &Projection::All)
            .await?
            .map(|rec| rec.body)
            .unwrap_or_default();

        decorate_last_updated(&mut metadata);
        Ok(metadata)
    }

    /// Page through the data records of a collection. The sentinel is
    /// excluded by the selector, never by post-filtering. `page` is
    /// 1-based. Each row carries its `_id` and, when its `@etag` parses, a
    /// derived `@lastupdated_on`.
    pub async fn collection_data(
        &self,
        db: &str,
        coll: &str,
        page: usize,
        pagesize: usize,
        sort_by: &[String],
    ) -> Result<Vec<JsonMap>> {
        let ns = Namespace::new(db, coll);
        let sort = parse_sort_by(sort_by)?;
        let skip = pagesize * page.saturating_sub(1);

        let records = self
            .store
            .find(&ns, Selector::Data, &sort, skip, pagesize)
            .await?;

        let mut rows = Vec::with_capacity(records.len());
        for rec in records {
            let mut row = rec.body;
            row.insert("_id".to_string(), Value::String(rec.id.to_string()));
            decorate_last_updated(&mut row);
            rows.push(row);
        }
        Ok(rows)
    }

    /// Create or update the collection metadata.
    ///
    /// With `patching`, the payload is merged into an existing sentinel
    /// (which must exist). Otherwise the sentinel content is replaced
    /// wholesale, except for `@created_on`, which is set exactly once and
    /// survives every later write.
    ///
    /// No single atomic store primitive inserts-or-updates, preserves a
    /// field across the update and reports whether it inserted. So the
    /// full-upsert path composes two calls: an atomic replace-or-insert
    /// returning the previous sentinel, then a corrective merge that pins
    /// `@created_on` to the recovered (or, on true creation, current)
    /// value. Between the two calls the sentinel may briefly lack
    /// `@created_on`; the corrective merge is idempotent and safe to race.
    pub async fn upsert_collection(
        &self,
        db: &str,
        coll: &str,
        content: JsonMap,
        patching: bool,
    ) -> Result<UpsertOutcome> {
        let ns = Namespace::new(db, coll);
        let updating = self.metadata_exists(db, coll).await?;

        if patching && !updating {
            return Ok(UpsertOutcome::NotFound);
        }

        let etag = Etag::new();
        let now = etag.timestamp();

        let mut content = content;
        // reserved fields are never caller-writable
        content.remove("_id");
        content.remove(CREATED_ON);
        content.remove(LASTUPDATED_ON);
        content.insert(ETAG.to_string(), Value::String(etag.to_string()));

        if patching {
            self.store
                .update_one(&ns, Selector::Metadata, content, false)
                .await?;
            return Ok(UpsertOutcome::Updated);
        }

        if !updating {
            // creation-timestamp guess; corrected below if we lose the race
            content.insert(CREATED_ON.to_string(), Value::String(format_instant(now)));
        }

        let previous = self
            .store
            .find_and_replace(&ns, Selector::Metadata, content, true)
            .await?;

        match previous {
            Some(old) => {
                // Another writer may have created the sentinel since the
                // existence check. Whoever inserted first owns
                // @created_on; put that value back.
                let created_on = match old.body.get(CREATED_ON) {
                    Some(value) => value.clone(),
                    None => {
                        warn!("metadata of {} had no {} field, set to now", ns, CREATED_ON);
                        Value::String(format_instant(now))
                    }
                };
                self.fix_created_on(&ns, created_on).await?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                self.fix_created_on(&ns, Value::String(format_instant(now)))
                    .await?;
                self.init_default_indexes(&ns).await?;
                Ok(UpsertOutcome::Created)
            }
        }
    }

    /// Delete the collection, gated on it being empty of data records and
    /// on the supplied etag matching the stored one.
    ///
    /// The sentinel is tentatively removed with an atomic fetch-and-remove
    /// so the etag comparison races with nobody; on mismatch the removed
    /// record is restored verbatim and the container is left untouched.
    pub async fn delete_collection(
        &self,
        db: &str,
        coll: &str,
        request_etag: Option<Etag>,
    ) -> Result<DeleteOutcome> {
        let ns = Namespace::new(db, coll);

        if !self.is_collection_empty(db, coll).await? {
            return Ok(DeleteOutcome::NotEmpty);
        }

        let Some(old) = self.store.find_and_remove(&ns, Selector::Metadata).await? else {
            // nothing to check an etag against
            self.store.drop_collection(&ns).await?;
            return Ok(DeleteOutcome::DeletedNoMetadata);
        };

        let stored = old.body.get(ETAG).and_then(Etag::from_json);
        match stored {
            // no (parseable) stored etag: unconditional success
            None => {
                self.store.drop_collection(&ns).await?;
                Ok(DeleteOutcome::Deleted)
            }
            Some(tag) if Some(tag) == request_etag => {
                self.store.drop_collection(&ns).await?;
                Ok(DeleteOutcome::Deleted)
            }
            Some(_) => {
                self.restore_sentinel(&ns, old).await;
                Ok(DeleteOutcome::EtagMismatch)
            }
        }
    }

    /// Compensating write: put the removed sentinel back. Best-effort; a
    /// failure here is a reportable inconsistency, not a different error
    /// for the caller.
    async fn restore_sentinel(&self, ns: &Namespace, old: Record) {
        if let Err(err) = self.store.save(ns, old).await {
            warn!(
                "failed to restore metadata of {} after etag mismatch: {}",
                ns, err
            );
        }
    }

    async fn fix_created_on(&self, ns: &Namespace, created_on: Value) -> Result<()> {
        let mut fix = JsonMap::new();
        fix.insert(CREATED_ON.to_string(), created_on);
        self.store
            .update_one(ns, Selector::Metadata, fix, true)
            .await?;
        Ok(())
    }

    async fn init_default_indexes(&self, ns: &Namespace) -> Result<()> {
        let asc = SortOrder::Ascending;
        for spec in [
            IndexSpec::new(
                "@_id_etag_idx",
                vec![("_id".to_string(), asc), (ETAG.to_string(), asc)],
            ),
            IndexSpec::new("@etag_idx", vec![(ETAG.to_string(), asc)]),
            IndexSpec::new("@created_on_idx", vec![(CREATED_ON.to_string(), asc)]),
        ] {
            self.store.create_index(ns, spec).await?;
        }
        Ok(())
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(' ')
}

/// ISO-8601 with second precision and a trailing `Z`, the same rendering
/// the etag timestamps use.
fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Add the derived `@lastupdated_on` field when the stored etag is a
/// well-formed token. Garbage or legacy etag values are tolerated by
/// simply omitting the field.
fn decorate_last_updated(body: &mut JsonMap) {
    if let Some(tag) = body.get(ETAG).and_then(Etag::from_json) {
        body.insert(
            LASTUPDATED_ON.to_string(),
            Value::String(format_instant(tag.timestamp())),
        );
    }
}
