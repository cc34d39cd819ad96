use super::value::{json_to_value, serializable_to_fields, value_to_json};
use super::*;
use httpmock::prelude::*;
use serde::{Deserialize, Serialize};

const BASE_PATH: &str = "/v1/projects/p/databases/(default)/documents";

fn firestore(server: &MockServer) -> Firestore {
    Firestore::new_with_client(crate::core::plain_client(), server.url(BASE_PATH))
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct TestDoc {
    display_name: String,
    visit_count: i64,
    premium: bool,
}

#[test]
fn integers_round_trip_through_the_wire_format() {
    let doc = TestDoc {
        display_name: "Dana".to_string(),
        visit_count: 1_700_000_000_000,
        premium: true,
    };

    let fields = serializable_to_fields(&doc).unwrap();
    // Firestore carries 64-bit integers as strings.
    match &fields["visitCount"].value_type {
        models::ValueType::IntegerValue(s) => assert_eq!(s, "1700000000000"),
        other => panic!("expected integerValue, got {:?}", other),
    }

    let back: TestDoc = value::fields_to_typed(fields).unwrap();
    assert_eq!(back, doc);
}

#[test]
fn nested_maps_and_arrays_convert_both_ways() {
    let json = serde_json::json!({
        "roles": ["freeUser", "editor"],
        "profile": { "country": "BR", "age": 30 }
    });

    let value = json_to_value(json.clone()).unwrap();
    assert_eq!(value_to_json(value).unwrap(), json);
}

#[tokio::test]
async fn get_deserializes_a_typed_document() {
    let server = MockServer::start();
    let db = firestore(&server);

    let mock = server.mock(|when, then| {
        when.method(GET).path(format!("{}/users/u1", BASE_PATH));
        then.status(200).json_body(serde_json::json!({
            "name": "projects/p/databases/(default)/documents/users/u1",
            "fields": {
                "displayName": { "stringValue": "Dana" },
                "visitCount": { "integerValue": "3" },
                "premium": { "booleanValue": false }
            }
        }));
    });

    let doc: Option<TestDoc> = db.doc("users/u1").get().await.unwrap();
    mock.assert();
    assert_eq!(
        doc,
        Some(TestDoc {
            display_name: "Dana".to_string(),
            visit_count: 3,
            premium: false,
        })
    );
}

#[tokio::test]
async fn get_returns_none_for_missing_documents() {
    let server = MockServer::start();
    let db = firestore(&server);

    server.mock(|when, then| {
        when.method(GET).path(format!("{}/users/missing", BASE_PATH));
        then.status(404);
    });

    let doc: Option<TestDoc> = db.doc("users/missing").get().await.unwrap();
    assert_eq!(doc, None);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RolesPatch {
    roles: Vec<String>,
}

#[tokio::test]
async fn set_merge_masks_the_write_to_serialized_fields() {
    let server = MockServer::start();
    let db = firestore(&server);

    let mock = server.mock(|when, then| {
        when.method(PATCH)
            .path(format!("{}/users/u1", BASE_PATH))
            .query_param("updateMask.fieldPaths", "roles")
            .body_includes("\"stringValue\":\"paidUser\"");
        then.status(200).json_body(serde_json::json!({
            "name": "projects/p/databases/(default)/documents/users/u1",
            "fields": {}
        }));
    });

    db.doc("users/u1")
        .set_merge(&RolesPatch {
            roles: vec!["paidUser".to_string()],
        })
        .await
        .unwrap();
    mock.assert();
}

#[tokio::test]
async fn query_fetch_skips_read_time_only_rows() {
    let server = MockServer::start();
    let db = firestore(&server);

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}:runQuery", BASE_PATH))
            .body_includes("\"fieldPath\":\"authUid\"")
            .body_includes("\"stringValue\":\"firebase-uid\"");
        then.status(200).json_body(serde_json::json!([
            {
                "document": {
                    "name": "projects/p/databases/(default)/documents/users/legacy-id",
                    "fields": {
                        "displayName": { "stringValue": "Dana" },
                        "visitCount": { "integerValue": "1" },
                        "premium": { "booleanValue": true }
                    }
                },
                "readTime": "2026-01-01T00:00:00Z"
            },
            { "readTime": "2026-01-01T00:00:00Z" }
        ]));
    });

    let rows: Vec<(String, TestDoc)> = db
        .query("users")
        .filter_eq("authUid", "firebase-uid")
        .unwrap()
        .limit(1)
        .fetch()
        .await
        .unwrap();

    mock.assert();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "legacy-id");
    assert_eq!(rows[0].1.display_name, "Dana");
}

#[tokio::test]
async fn run_transaction_commits_buffered_writes() {
    let server = MockServer::start();
    let db = firestore(&server);

    let begin = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}:beginTransaction", BASE_PATH));
        then.status(200)
            .json_body(serde_json::json!({ "transaction": "txn-1" }));
    });
    let read = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/users/u1", BASE_PATH))
            .query_param("transaction", "txn-1");
        then.status(200).json_body(serde_json::json!({
            "name": "projects/p/databases/(default)/documents/users/u1",
            "fields": {
                "displayName": { "stringValue": "Dana" },
                "visitCount": { "integerValue": "3" },
                "premium": { "booleanValue": false }
            }
        }));
    });
    let commit = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}:commit", BASE_PATH))
            .body_includes("\"transaction\":\"txn-1\"")
            .body_includes("projects/p/databases/(default)/documents/users/u1");
        then.status(200)
            .json_body(serde_json::json!({ "commitTime": "2026-01-01T00:00:00Z" }));
    });

    let count = db
        .run_transaction(|txn| async move {
            let doc: Option<TestDoc> = txn.get("users/u1").await?;
            let mut doc = doc.unwrap();
            doc.visit_count += 1;
            txn.set("users/u1", &doc)?;
            Ok(doc.visit_count)
        })
        .await
        .unwrap();

    begin.assert();
    read.assert();
    commit.assert();
    assert_eq!(count, 4);
}

#[tokio::test]
async fn run_transaction_rolls_back_when_the_closure_fails() {
    let server = MockServer::start();
    let db = firestore(&server);

    server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}:beginTransaction", BASE_PATH));
        then.status(200)
            .json_body(serde_json::json!({ "transaction": "txn-2" }));
    });
    let rollback = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}:rollback", BASE_PATH))
            .body_includes("\"transaction\":\"txn-2\"");
        then.status(200).json_body(serde_json::json!({}));
    });
    let commit = server.mock(|when, then| {
        when.method(POST).path(format!("{}:commit", BASE_PATH));
        then.status(200).json_body(serde_json::json!({}));
    });

    let result: Result<(), _> = db
        .run_transaction(|_txn| async move {
            Err(FirestoreError::ApiError("closure failure".to_string()))
        })
        .await;

    assert!(matches!(result, Err(FirestoreError::ApiError(_))));
    rollback.assert();
    commit.assert_hits(0);
}
