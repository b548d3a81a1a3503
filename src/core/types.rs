use super::JsonMap;
use std::fmt;

/// Fully qualified collection reference (database + collection name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    db: String,
    coll: String,
}

impl Namespace {
    pub fn new(db: impl Into<String>, coll: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            coll: coll.into(),
        }
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn coll(&self) -> &str {
        &self.coll
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.coll)
    }
}

/// The only filter language the metadata protocol needs: identifier equals
/// the sentinel key, identifier differs from it, or no filter at all.
/// `Metadata` and `Data` partition every record with no overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Any,
    Metadata,
    Data,
}

impl Selector {
    pub fn matches(&self, id: &crate::core::RecordId) -> bool {
        match self {
            Selector::Any => true,
            Selector::Metadata => id.is_meta(),
            Selector::Data => !id.is_meta(),
        }
    }
}

/// Field projection for point reads.
#[derive(Debug, Clone)]
pub enum Projection {
    All,
    Include(Vec<String>),
}

impl Projection {
    pub fn apply(&self, body: &JsonMap) -> JsonMap {
        match self {
            Projection::All => body.clone(),
            Projection::Include(fields) => body
                .iter()
                .filter(|(k, _)| fields.iter().any(|f| f == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A single sort criterion. `_id` sorts by record identifier, anything else
/// by the named body field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec(pub Vec<(SortKey, SortOrder)>);

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec(vec![(SortKey::Id, SortOrder::Ascending)])
    }
}

/// A named index over one or more fields, as provisioned on first
/// metadata creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<(String, SortOrder)>,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, keys: Vec<(String, SortOrder)>) -> Self {
        Self {
            name: name.into(),
            keys,
        }
    }
}
