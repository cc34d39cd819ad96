use super::keys::{KeyFetchError, PublicKeyCache};
use super::models::UserRecord;
use super::verifier::{IdTokenVerifier, TokenVerificationError};
use super::*;
use httpmock::prelude::*;

fn identity(server: &MockServer) -> IdentityClient {
    IdentityClient::new_with_client(crate::core::plain_client(), server.url("/v1/projects/p"))
}

#[tokio::test]
async fn get_user_returns_the_looked_up_record() {
    let server = MockServer::start();
    let client = identity(&server);

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/projects/p/accounts:lookup")
            .body_includes("\"localId\":[\"uid-1\"]");
        then.status(200).json_body(serde_json::json!({
            "users": [{
                "localId": "uid-1",
                "email": "dana@example.com",
                "displayName": "Dana",
                "providerUserInfo": [
                    { "providerId": "google.com", "email": "dana@example.com" }
                ],
                "customAttributes": "{\"roles\":[\"freeUser\"]}"
            }]
        }));
    });

    let user = client.get_user("uid-1").await.unwrap();
    mock.assert();
    assert_eq!(user.local_id, "uid-1");
    assert_eq!(user.email.as_deref(), Some("dana@example.com"));
    assert_eq!(user.primary_provider().as_deref(), Some("google.com"));
    assert_eq!(
        user.claims().get("roles"),
        Some(&serde_json::json!(["freeUser"]))
    );
}

#[tokio::test]
async fn get_user_maps_an_empty_result_to_user_not_found() {
    let server = MockServer::start();
    let client = identity(&server);

    server.mock(|when, then| {
        when.method(POST).path("/v1/projects/p/accounts:lookup");
        then.status(200).json_body(serde_json::json!({}));
    });

    let result = client.get_user("ghost").await;
    assert!(matches!(result, Err(AuthError::UserNotFound)));
}

#[tokio::test]
async fn set_custom_claims_serializes_claims_as_a_json_string() {
    let server = MockServer::start();
    let client = identity(&server);

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/projects/p/accounts:update")
            .body_includes("\"localId\":\"uid-1\"")
            // customAttributes is a JSON string, so the inner quotes arrive
            // escaped on the wire.
            .body_includes("\\\"roles\\\":[\\\"paidUser\\\"]");
        then.status(200)
            .json_body(serde_json::json!({ "localId": "uid-1" }));
    });

    let mut claims = serde_json::Map::new();
    claims.insert("roles".to_string(), serde_json::json!(["paidUser"]));
    client.set_custom_claims("uid-1", &claims).await.unwrap();
    mock.assert();
}

#[tokio::test]
async fn set_custom_claims_surfaces_api_errors() {
    let server = MockServer::start();
    let client = identity(&server);

    server.mock(|when, then| {
        when.method(POST).path("/v1/projects/p/accounts:update");
        then.status(400).json_body(serde_json::json!({
            "error": { "message": "INVALID_CLAIMS" }
        }));
    });

    let result = client
        .set_custom_claims("uid-1", &serde_json::Map::new())
        .await;
    match result {
        Err(AuthError::ApiError(msg)) => assert!(msg.contains("400")),
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn key_cache_fetches_certificates_once_per_max_age() {
    let server = MockServer::start();
    let cache = PublicKeyCache::with_url(server.url("/certs"));

    let certs = server.mock(|when, then| {
        when.method(GET).path("/certs");
        then.status(200)
            .header("Cache-Control", "public, max-age=3600")
            .json_body(serde_json::json!({ "kid-1": "-----BEGIN CERTIFICATE-----" }));
    });

    let pem = cache.get_key("kid-1").await.unwrap();
    assert_eq!(pem, "-----BEGIN CERTIFICATE-----");
    cache.get_key("kid-1").await.unwrap();
    certs.assert_hits(1);
}

#[tokio::test]
async fn key_cache_reports_unknown_key_ids() {
    let server = MockServer::start();
    let cache = PublicKeyCache::with_url(server.url("/certs"));

    server.mock(|when, then| {
        when.method(GET).path("/certs");
        then.status(200)
            .json_body(serde_json::json!({ "kid-1": "pem" }));
    });

    let result = cache.get_key("kid-2").await;
    assert!(matches!(result, Err(KeyFetchError::UnknownKeyId)));
}

#[tokio::test]
async fn verifier_requires_a_key_id_in_the_token_header() {
    let server = MockServer::start();
    let verifier = IdTokenVerifier::new_with_keys(
        "test-project".to_string(),
        PublicKeyCache::with_url(server.url("/certs")),
    );

    // RS256 header without a kid, empty payload, junk signature.
    let token = "eyJhbGciOiJSUzI1NiJ9.e30.c2ln";
    let err = verifier.verify(token).await.unwrap_err();
    assert!(matches!(err, TokenVerificationError::InvalidToken(_)));
}

#[tokio::test]
async fn verifier_rejects_tokens_without_a_usable_certificate() {
    let server = MockServer::start();
    let verifier = IdTokenVerifier::new_with_keys(
        "test-project".to_string(),
        PublicKeyCache::with_url(server.url("/certs")),
    );

    server.mock(|when, then| {
        when.method(GET).path("/certs");
        then.status(200)
            .json_body(serde_json::json!({ "kid-1": "not a certificate" }));
    });

    // RS256 header naming kid-1, empty payload, junk signature.
    let token = "eyJhbGciOiJSUzI1NiIsImtpZCI6ImtpZC0xIn0.e30.c2ln";
    let err = verifier.verify(token).await.unwrap_err();
    assert!(matches!(err, TokenVerificationError::JwtError(_)));
}

#[test]
fn malformed_custom_attributes_parse_as_empty_claims() {
    let user = UserRecord {
        local_id: "uid-1".to_string(),
        custom_attributes: Some("not json".to_string()),
        ..Default::default()
    };
    assert!(user.claims().is_empty());

    let user = UserRecord {
        local_id: "uid-1".to_string(),
        custom_attributes: Some("[1,2,3]".to_string()),
        ..Default::default()
    };
    assert!(user.claims().is_empty());
}
