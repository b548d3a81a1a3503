use super::DocumentStore;
use crate::core::{
    DbError, IndexSpec, JsonMap, Namespace, Projection, Record, RecordId, Result, Selector,
    SortKey, SortOrder, SortSpec,
};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory document store backend.
///
/// Collections live behind individual locks; the outer map only guards
/// namespace lookup, so operations on different collections never contend.
/// Collections are created implicitly by the first write, matching the
/// "container exists once something was written to it" model.
pub struct InMemoryStore {
    databases: RwLock<HashMap<String, HashMap<String, Arc<RwLock<Collection>>>>>,
}

#[derive(Debug, Default)]
struct Collection {
    records: BTreeMap<RecordId, JsonMap>,
    indexes: Vec<IndexSpec>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            databases: RwLock::new(HashMap::new()),
        }
    }

    async fn collection(&self, ns: &Namespace) -> Option<Arc<RwLock<Collection>>> {
        let dbs = self.databases.read().await;
        dbs.get(ns.db()).and_then(|db| db.get(ns.coll())).cloned()
    }

    async fn collection_or_create(&self, ns: &Namespace) -> Arc<RwLock<Collection>> {
        let mut dbs = self.databases.write().await;
        dbs.entry(ns.db().to_string())
            .or_default()
            .entry(ns.coll().to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Collection::default())))
            .clone()
    }

    /// Names of the indexes provisioned on a collection, in creation order.
    pub async fn index_names(&self, ns: &Namespace) -> Vec<String> {
        match self.collection(ns).await {
            Some(handle) => {
                let coll = handle.read().await;
                coll.indexes.iter().map(|ix| ix.name.clone()).collect()
            }
            None => Vec::new(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Collection {
    fn first_match(&self, selector: Selector) -> Option<RecordId> {
        self.records
            .keys()
            .find(|id| selector.matches(id))
            .cloned()
    }
}

/// Resolve the identity a point write should create under. Only the
/// sentinel selector names a single record; `Data`/`Any` carry no identity
/// an insert could use.
fn upsert_id(selector: Selector) -> Result<RecordId> {
    match selector {
        Selector::Metadata => Ok(RecordId::Meta),
        other => Err(DbError::UnsupportedOperation(format!(
            "upsert requires an identifying selector, got {:?}",
            other
        ))),
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn collection_exists(&self, db: &str, coll: &str) -> Result<bool> {
        let dbs = self.databases.read().await;
        Ok(dbs.get(db).is_some_and(|d| d.contains_key(coll)))
    }

    async fn find_one(
        &self,
        ns: &Namespace,
        selector: Selector,
        projection: &Projection,
    ) -> Result<Option<Record>> {
        let Some(handle) = self.collection(ns).await else {
            return Ok(None);
        };
        let coll = handle.read().await;
        Ok(coll.first_match(selector).map(|id| {
            let body = projection.apply(&coll.records[&id]);
            Record::new(id, body)
        }))
    }

    async fn find(
        &self,
        ns: &Namespace,
        selector: Selector,
        sort: &SortSpec,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let Some(handle) = self.collection(ns).await else {
            return Ok(Vec::new());
        };
        let coll = handle.read().await;

        let mut matched: Vec<Record> = coll
            .records
            .iter()
            .filter(|(id, _)| selector.matches(id))
            .map(|(id, body)| Record::new(id.clone(), body.clone()))
            .collect();

        matched.sort_by(|a, b| cmp_records(a, b, sort));
        Ok(matched.into_iter().skip(skip).take(limit).collect())
    }

    async fn update_one(
        &self,
        ns: &Namespace,
        selector: Selector,
        patch: JsonMap,
        upsert: bool,
    ) -> Result<bool> {
        let handle = if upsert {
            self.collection_or_create(ns).await
        } else {
            match self.collection(ns).await {
                Some(h) => h,
                None => return Ok(false),
            }
        };
        let mut coll = handle.write().await;

        let id = match coll.first_match(selector) {
            Some(id) => id,
            None if upsert => upsert_id(selector)?,
            None => return Ok(false),
        };

        let body = coll.records.entry(id).or_default();
        for (k, v) in patch {
            body.insert(k, v);
        }
        Ok(true)
    }

    async fn find_and_replace(
        &self,
        ns: &Namespace,
        selector: Selector,
        body: JsonMap,
        upsert: bool,
    ) -> Result<Option<Record>> {
        let handle = if upsert {
            self.collection_or_create(ns).await
        } else {
            match self.collection(ns).await {
                Some(h) => h,
                None => return Ok(None),
            }
        };
        let mut coll = handle.write().await;

        let id = match coll.first_match(selector) {
            Some(id) => id,
            None if upsert => upsert_id(selector)?,
            None => return Ok(None),
        };

        let previous = coll
            .records
            .insert(id.clone(), body)
            .map(|old| Record::new(id, old));
        Ok(previous)
    }

    async fn find_and_remove(
        &self,
        ns: &Namespace,
        selector: Selector,
    ) -> Result<Option<Record>> {
        let Some(handle) = self.collection(ns).await else {
            return Ok(None);
        };
        let mut coll = handle.write().await;

        let Some(id) = coll.first_match(selector) else {
            return Ok(None);
        };
        let removed = coll.records.remove(&id).map(|body| Record::new(id, body));
        Ok(removed)
    }

    async fn save(&self, ns: &Namespace, record: Record) -> Result<()> {
        let handle = self.collection_or_create(ns).await;
        let mut coll = handle.write().await;
        coll.records.insert(record.id, record.body);
        Ok(())
    }

    async fn count(&self, ns: &Namespace, selector: Selector) -> Result<u64> {
        let Some(handle) = self.collection(ns).await else {
            return Ok(0);
        };
        let coll = handle.read().await;
        Ok(coll.records.keys().filter(|id| selector.matches(id)).count() as u64)
    }

    async fn drop_collection(&self, ns: &Namespace) -> Result<()> {
        let mut dbs = self.databases.write().await;
        if let Some(db) = dbs.get_mut(ns.db()) {
            db.remove(ns.coll());
            if db.is_empty() {
                dbs.remove(ns.db());
            }
        }
        Ok(())
    }

    async fn create_index(&self, ns: &Namespace, spec: IndexSpec) -> Result<()> {
        let handle = self.collection_or_create(ns).await;
        let mut coll = handle.write().await;
        if !coll.indexes.iter().any(|ix| ix.name == spec.name) {
            coll.indexes.push(spec);
        }
        Ok(())
    }
}

fn cmp_records(a: &Record, b: &Record, sort: &SortSpec) -> Ordering {
    for (key, order) in &sort.0 {
        let ord = match key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Field(f) => cmp_json(a.body.get(f), b.body.get(f)),
        };
        let ord = match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Total order over JSON values: Null < Bool < Number < String < Array
/// < Object. A missing field sorts as Null.
fn cmp_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = |v: Option<&Value>| match v {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    };

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x @ Value::Array(_)), Some(y @ Value::Array(_)))
        | (Some(x @ Value::Object(_)), Some(y @ Value::Object(_))) => {
            x.to_string().cmp(&y.to_string())
        }
        (x, y) => rank(x).cmp(&rank(y)),
    }
}
