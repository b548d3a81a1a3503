/// Collection metadata upsert tests
///
/// Covers sentinel creation, full replace vs patch semantics, reserved
/// field handling and the derived last-updated timestamp.
use chrono::SecondsFormat;
use docudb::{Client, Etag, JsonMap, UpsertOutcome};
use serde_json::json;

fn doc(value: serde_json::Value) -> JsonMap {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn full_upsert_creates_sentinel() {
    let client = Client::new();

    let outcome = client
        .upsert_collection("testdb", "orders", doc(json!({"owner": "alice"})), false)
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Created);

    assert!(client.metadata_exists("testdb", "orders").await.unwrap());
    let metadata = client
        .collection_metadata("testdb", "orders")
        .await
        .unwrap();
    assert_eq!(metadata.get("owner"), Some(&json!("alice")));
    assert!(metadata.contains_key("@created_on"));
    assert!(metadata.contains_key("@etag"));
}

#[tokio::test]
async fn patch_on_absent_sentinel_is_not_found() {
    let client = Client::new();

    let outcome = client
        .upsert_collection("testdb", "orders", doc(json!({"owner": "alice"})), true)
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::NotFound);

    // nothing was written
    assert!(!client.collection_exists("testdb", "orders").await.unwrap());
    assert!(!client.metadata_exists("testdb", "orders").await.unwrap());
    let metadata = client
        .collection_metadata("testdb", "orders")
        .await
        .unwrap();
    assert!(metadata.is_empty());
}

#[tokio::test]
async fn last_updated_derives_from_etag() {
    let client = Client::new();

    client
        .upsert_collection("testdb", "orders", JsonMap::new(), false)
        .await
        .unwrap();

    let metadata = client
        .collection_metadata("testdb", "orders")
        .await
        .unwrap();
    let tag: Etag = metadata["@etag"].as_str().unwrap().parse().unwrap();
    let expected = tag.timestamp().to_rfc3339_opts(SecondsFormat::Secs, true);
    assert_eq!(metadata["@lastupdated_on"], json!(expected));
}

#[tokio::test]
async fn full_upsert_replaces_but_preserves_created_on() {
    let client = Client::new();

    client
        .upsert_collection(
            "testdb",
            "orders",
            doc(json!({"owner": "alice", "color": "red"})),
            false,
        )
        .await
        .unwrap();
    let before = client
        .collection_metadata("testdb", "orders")
        .await
        .unwrap();

    let outcome = client
        .upsert_collection("testdb", "orders", doc(json!({"owner": "bob"})), false)
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Updated);

    let after = client
        .collection_metadata("testdb", "orders")
        .await
        .unwrap();
    // replace semantics: non-reserved content is the new payload only
    assert_eq!(after.get("owner"), Some(&json!("bob")));
    assert!(!after.contains_key("color"));
    // immutable field survived the replace
    assert_eq!(after["@created_on"], before["@created_on"]);
    // a fresh token was stamped
    assert_ne!(after["@etag"], before["@etag"]);
}

#[tokio::test]
async fn patch_merges_instead_of_replacing() {
    let client = Client::new();

    client
        .upsert_collection(
            "testdb",
            "orders",
            doc(json!({"owner": "alice", "color": "red"})),
            false,
        )
        .await
        .unwrap();
    let before = client
        .collection_metadata("testdb", "orders")
        .await
        .unwrap();

    let outcome = client
        .upsert_collection("testdb", "orders", doc(json!({"color": "blue"})), true)
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Updated);

    let after = client
        .collection_metadata("testdb", "orders")
        .await
        .unwrap();
    assert_eq!(after.get("owner"), Some(&json!("alice")));
    assert_eq!(after.get("color"), Some(&json!("blue")));
    assert_eq!(after["@created_on"], before["@created_on"]);
    assert_ne!(after["@etag"], before["@etag"]);
}

#[tokio::test]
async fn caller_cannot_smuggle_reserved_fields() {
    let client = Client::new();

    client
        .upsert_collection(
            "testdb",
            "orders",
            doc(json!({
                "_id": "not-the-sentinel",
                "@created_on": "1999-01-01T00:00:00Z",
                "@lastupdated_on": "1999-01-01T00:00:00Z",
                "owner": "alice"
            })),
            false,
        )
        .await
        .unwrap();

    let metadata = client
        .collection_metadata("testdb", "orders")
        .await
        .unwrap();
    assert_ne!(metadata["@created_on"], json!("1999-01-01T00:00:00Z"));
    assert!(!metadata.contains_key("_id"));
    assert_eq!(metadata.get("owner"), Some(&json!("alice")));
}

#[tokio::test]
async fn etags_are_strictly_increasing_across_writes() {
    let client = Client::new();

    client
        .upsert_collection("testdb", "orders", JsonMap::new(), false)
        .await
        .unwrap();
    let mut previous: Option<Etag> = None;

    for _ in 0..5 {
        client
            .upsert_collection("testdb", "orders", JsonMap::new(), true)
            .await
            .unwrap();
        let metadata = client
            .collection_metadata("testdb", "orders")
            .await
            .unwrap();
        let tag: Etag = metadata["@etag"].as_str().unwrap().parse().unwrap();
        if let Some(prev) = previous {
            assert!(tag > prev);
        }
        previous = Some(tag);
    }
}

#[tokio::test]
async fn default_indexes_provisioned_once_on_creation() {
    let client = Client::new();
    let ns = docudb::core::Namespace::new("testdb", "orders");

    client
        .upsert_collection("testdb", "orders", JsonMap::new(), false)
        .await
        .unwrap();
    let names = client.store().index_names(&ns).await;
    assert_eq!(names, vec!["@_id_etag_idx", "@etag_idx", "@created_on_idx"]);

    // later writes provision nothing further
    client
        .upsert_collection("testdb", "orders", JsonMap::new(), false)
        .await
        .unwrap();
    client
        .upsert_collection("testdb", "orders", JsonMap::new(), true)
        .await
        .unwrap();
    assert_eq!(client.store().index_names(&ns).await.len(), 3);
}
