use super::models::*;
use super::*;
use crate::firestore::Firestore;
use httpmock::prelude::*;

const BASE_PATH: &str = "/v1/projects/p/databases/(default)/documents";

fn sync(server: &MockServer) -> MembershipSync {
    MembershipSync::new(Firestore::new_with_client(
        crate::core::plain_client(),
        server.url(BASE_PATH),
    ))
}

fn mock_begin(server: &MockServer, txn_id: &str) {
    let txn_id = txn_id.to_string();
    server.mock(move |when, then| {
        when.method(POST)
            .path(format!("{}:beginTransaction", BASE_PATH));
        then.status(200)
            .json_body(serde_json::json!({ "transaction": txn_id }));
    });
}

fn mock_missing_doc(server: &MockServer, doc_path: &str) {
    let path = format!("{}/{}", BASE_PATH, doc_path);
    server.mock(move |when, then| {
        when.method(GET).path(path.clone());
        then.status(404);
    });
}

#[tokio::test]
async fn first_sync_creates_a_viewer_membership_and_index_entry() {
    let server = MockServer::start();
    let sync = sync(&server);

    mock_begin(&server, "txn-1");
    mock_missing_doc(&server, "tenants/t1/members/u1");
    mock_missing_doc(&server, "userTenants/u1");
    let commit = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}:commit", BASE_PATH))
            .body_includes("documents/tenants/t1/members/u1")
            .body_includes("documents/userTenants/u1")
            .body_includes("\"stringValue\":\"viewer\"");
        then.status(200)
            .json_body(serde_json::json!({ "commitTime": "2026-01-01T00:00:00Z" }));
    });

    let record = sync
        .sync("t1", "u1", &MembershipPatch::default())
        .await
        .unwrap();

    commit.assert();
    assert_eq!(record.role, MemberRole::Viewer);
    assert_eq!(record.status, MemberStatus::Active);
    assert!(record.created_at.is_some());
    assert!(!record.premium());
}

#[tokio::test]
async fn patch_preserves_fields_it_does_not_name() {
    let server = MockServer::start();
    let sync = sync(&server);

    mock_begin(&server, "txn-2");
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/tenants/t1/members/u1", BASE_PATH))
            .query_param("transaction", "txn-2");
        then.status(200).json_body(serde_json::json!({
            "name": "projects/p/databases/(default)/documents/tenants/t1/members/u1",
            "fields": {
                "role": { "stringValue": "editor" },
                "status": { "stringValue": "active" },
                "createdAt": { "stringValue": "2025-06-01T00:00:00+00:00" }
            }
        }));
    });
    mock_missing_doc(&server, "userTenants/u1");
    let commit = server.mock(|when, then| {
        // Both documents leave the transaction carrying the editor role.
        when.method(POST)
            .path(format!("{}:commit", BASE_PATH))
            .body_includes("\"stringValue\":\"editor\"")
            .body_includes("\"booleanValue\":true");
        then.status(200).json_body(serde_json::json!({}));
    });

    let patch = MembershipPatch {
        billing: Some(crate::entitlements::EffectiveEntitlement {
            active: true,
            valid_until_millis: None,
            platform: Some("manual".to_string()),
            subscription_type: Some("complimentary".to_string()),
        }),
        ..Default::default()
    };
    let record = sync.sync("t1", "u1", &patch).await.unwrap();

    commit.assert();
    assert_eq!(record.role, MemberRole::Editor);
    assert_eq!(
        record.created_at.as_deref(),
        Some("2025-06-01T00:00:00+00:00")
    );
    assert!(record.premium());
}

#[test]
fn index_entry_mirrors_the_membership() {
    let membership = MembershipRecord {
        role: MemberRole::Admin,
        status: MemberStatus::Inactive,
        feature_roles: vec![FEATURE_ROLE_JW.to_string()],
        billing: Some(crate::entitlements::EffectiveEntitlement {
            active: true,
            ..Default::default()
        }),
        ..Default::default()
    };

    let entry = TenantIndexEntry::from_membership(&membership);
    assert_eq!(entry.role, MemberRole::Admin);
    assert_eq!(entry.status, MemberStatus::Inactive);
    assert_eq!(entry.feature_roles, vec![FEATURE_ROLE_JW.to_string()]);
    assert!(entry.premium);
}
