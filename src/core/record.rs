use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Reserved identifier of the per-collection metadata record.
/// No data record may ever carry this id.
pub const METADATA_ID: &str = "@metadata";

pub type JsonMap = serde_json::Map<String, Value>;

/// Record identifier. The metadata sentinel is a distinct variant rather
/// than a magic string, so the metadata/data partition is type-level:
/// `RecordId::new` can never produce a data id colliding with the sentinel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordId {
    Meta,
    Key(String),
}

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id == METADATA_ID {
            RecordId::Meta
        } else {
            RecordId::Key(id)
        }
    }

    pub fn is_meta(&self) -> bool {
        matches!(self, RecordId::Meta)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RecordId::Meta => METADATA_ID,
            RecordId::Key(k) => k,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(RecordId::new(s))
    }
}

/// A stored document: identifier plus JSON body. The id lives outside the
/// body so projections and metadata reads never have to strip it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub body: JsonMap,
}

impl Record {
    pub fn new(id: RecordId, body: JsonMap) -> Self {
        Self { id, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_id_maps_to_meta() {
        assert_eq!(RecordId::new("@metadata"), RecordId::Meta);
        assert_eq!(RecordId::new("orders"), RecordId::Key("orders".into()));
    }

    #[test]
    fn record_id_serde_round_trip() {
        let json = serde_json::to_string(&RecordId::Meta).unwrap();
        assert_eq!(json, "\"@metadata\"");
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert!(back.is_meta());
    }
}
