use super::*;
use httpmock::prelude::*;

const NOW: i64 = 1_700_000_000_000;

#[tokio::test]
async fn verify_reports_active_for_future_expiry() {
    let server = MockServer::start();
    let verifier = SubscriptionVerifier::new_with_client(
        crate::core::plain_client(),
        server.url(""),
        "com.example.app".to_string(),
    );

    let expiry = NOW + 86_400_000;
    let mock = server.mock(|when, then| {
        when.method(GET).path(
            "/applications/com.example.app/purchases/subscriptions/premium_monthly/tokens/tok-1",
        );
        then.status(200).json_body(serde_json::json!({
            "expiryTimeMillis": expiry.to_string(),
            "autoRenewing": true,
            "orderId": "GPA.1234"
        }));
    });

    let verified = verifier
        .verify("premium_monthly", "tok-1", SUBSCRIPTION_MONTHLY, NOW)
        .await
        .unwrap();

    mock.assert();
    assert!(verified.active);
    assert_eq!(verified.expiry_millis, Some(expiry));
    assert_eq!(verified.subscription_type, SUBSCRIPTION_MONTHLY);
    assert_eq!(verified.product_id, "premium_monthly");
}

#[tokio::test]
async fn verify_reports_inactive_for_past_expiry() {
    let server = MockServer::start();
    let verifier = SubscriptionVerifier::new_with_client(
        crate::core::plain_client(),
        server.url(""),
        "com.example.app".to_string(),
    );

    server.mock(|when, then| {
        when.method(GET).path(
            "/applications/com.example.app/purchases/subscriptions/premium_yearly/tokens/tok-2",
        );
        then.status(200).json_body(serde_json::json!({
            "expiryTimeMillis": (NOW - 1).to_string(),
            "autoRenewing": false
        }));
    });

    let verified = verifier
        .verify("premium_yearly", "tok-2", SUBSCRIPTION_YEARLY, NOW)
        .await
        .unwrap();

    assert!(!verified.active);
    assert_eq!(verified.expiry_millis, Some(NOW - 1));
}

#[tokio::test]
async fn verify_treats_malformed_expiry_as_expired() {
    let server = MockServer::start();
    let verifier = SubscriptionVerifier::new_with_client(
        crate::core::plain_client(),
        server.url(""),
        "com.example.app".to_string(),
    );

    server.mock(|when, then| {
        when.method(GET);
        then.status(200).json_body(serde_json::json!({
            "expiryTimeMillis": "not-a-number"
        }));
    });

    let verified = verifier
        .verify("premium_monthly", "tok-3", SUBSCRIPTION_MONTHLY, NOW)
        .await
        .unwrap();

    assert!(!verified.active);
    assert_eq!(verified.expiry_millis, None);
}

#[tokio::test]
async fn verify_surfaces_api_errors_with_status() {
    let server = MockServer::start();
    let verifier = SubscriptionVerifier::new_with_client(
        crate::core::plain_client(),
        server.url(""),
        "com.example.app".to_string(),
    );

    server.mock(|when, then| {
        when.method(GET);
        then.status(410).json_body(serde_json::json!({
            "error": {
                "code": 410,
                "message": "The subscription purchase is no longer available",
                "status": "GONE"
            }
        }));
    });

    let result = verifier
        .verify("premium_monthly", "tok-4", SUBSCRIPTION_MONTHLY, NOW)
        .await;

    match result {
        Err(PlayError::ApiError { status, message }) => {
            assert_eq!(status, 410);
            assert!(message.contains("no longer available"));
        }
        other => panic!("expected ApiError, got {:?}", other.map(|v| v.active)),
    }
}

#[test]
fn tenant_sku_map_takes_precedence() {
    let tenant = crate::tenants::TenantConfig {
        play_products: HashMap::from([("club_monthly".to_string(), SUBSCRIPTION_MONTHLY.to_string())]),
        ..Default::default()
    };

    let map = resolve_sku_map(&tenant, true).unwrap();
    assert_eq!(map.get("club_monthly").map(String::as_str), Some("monthly"));
    assert!(!map.contains_key("premium_monthly"));
}

#[test]
fn default_tenant_falls_back_to_legacy_skus() {
    let tenant = crate::tenants::TenantConfig::default();
    let map = resolve_sku_map(&tenant, true).unwrap();
    assert_eq!(
        map.get("premium_monthly").map(String::as_str),
        Some("monthly")
    );
    assert_eq!(
        map.get("premium_yearly").map(String::as_str),
        Some("yearly")
    );
}

#[test]
fn unconfigured_non_default_tenant_has_no_skus() {
    let tenant = crate::tenants::TenantConfig::default();
    assert!(resolve_sku_map(&tenant, false).is_none());
}
