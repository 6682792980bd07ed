//! Architectural Contract Test: Cloudflare API Usage
//!
//! This test verifies the exact HTTP calls the Cloudflare store makes
//! against a mock API server.
//!
//! Constraints verified:
//! - One request per store call, authenticated with the bearer token
//! - Lookups filter by name and type; an empty result is "not found", not an error
//! - Creates POST, updates PATCH, deletes DELETE
//! - Dry-run performs lookups but never mutates
//! - Status codes map to the right error kinds; no retries
//!
//! If this test fails, the store is speaking a different dialect of the
//! Cloudflare API than the one it documents.

use dnsync_core::traits::RemoteStore;
use dnsync_core::{DeclaredRecord, Error, IdentityKey, RecordType};
use dnsync_provider_cloudflare::CloudflareStore;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";
const ZONE: &str = "zone123";

fn store(server: &MockServer, dry_run: bool) -> CloudflareStore {
    CloudflareStore::with_base_url(TOKEN, ZONE, server.uri(), dry_run).unwrap()
}

fn record_json(id: &str, name: &str, record_type: &str, content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "type": record_type,
        "content": content,
        "ttl": 3600,
        "proxied": false
    })
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result
    }))
}

#[tokio::test]
async fn lookup_filters_by_name_and_type() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/zones/{ZONE}/dns_records")))
        .and(query_param("name", "api.example.com"))
        .and(query_param("type", "A"))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ok(serde_json::json!([record_json(
            "R1",
            "api.example.com",
            "A",
            "10.0.0.5"
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let found = store(&server, false)
        .find_by_name_and_type(&IdentityKey::new("api.example.com", RecordType::A))
        .await
        .unwrap()
        .expect("record found");

    assert_eq!(found.id, "R1");
    assert_eq!(found.content, "10.0.0.5");
    assert_eq!(found.ttl, 3600);
}

#[tokio::test]
async fn lookup_with_no_match_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/zones/{ZONE}/dns_records")))
        .respond_with(ok(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let found = store(&server, false)
        .find_by_name_and_type(&IdentityKey::new("gone.example.com", RecordType::TXT))
        .await
        .unwrap();

    assert!(found.is_none());
}

#[tokio::test]
async fn create_posts_full_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/zones/{ZONE}/dns_records")))
        .and(body_json(serde_json::json!({
            "type": "A",
            "name": "api.example.com",
            "content": "10.0.0.5",
            "ttl": 3600,
            "proxied": true
        })))
        .respond_with(ok(serde_json::json!({
            "id": "R9",
            "name": "api.example.com",
            "type": "A",
            "content": "10.0.0.5",
            "ttl": 3600,
            "proxied": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = DeclaredRecord::new("api.example.com", RecordType::A, "10.0.0.5").with_proxied(true);
    let created = store(&server, false).create(&record).await.unwrap();

    assert_eq!(created.id, "R9");
    assert!(created.proxied);
}

#[tokio::test]
async fn update_patches_record_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("/zones/{ZONE}/dns_records/R1")))
        .and(body_json(serde_json::json!({
            "type": "MX",
            "name": "example.com",
            "content": "mx2.example.com",
            "ttl": 300,
            "priority": 20
        })))
        .respond_with(ok(serde_json::json!({
            "id": "R1",
            "name": "example.com",
            "type": "MX",
            "content": "mx2.example.com",
            "ttl": 300,
            "priority": 20
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = DeclaredRecord::new("example.com", RecordType::MX, "mx2.example.com")
        .with_ttl(300)
        .with_priority(20);
    let updated = store(&server, false).update("R1", &record).await.unwrap();

    assert_eq!(updated.id, "R1");
    assert_eq!(updated.priority, Some(20));
}

#[tokio::test]
async fn delete_sends_delete() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/zones/{ZONE}/dns_records/R1")))
        .respond_with(ok(serde_json::json!({ "id": "R1" })))
        .expect(1)
        .mount(&server)
        .await;

    store(&server, false).delete("R1").await.unwrap();
}

#[tokio::test]
async fn dry_run_never_mutates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let store = store(&server, true);
    let record = DeclaredRecord::new("api.example.com", RecordType::A, "10.0.0.5");

    store.create(&record).await.unwrap();
    let updated = store.update("R1", &record).await.unwrap();
    assert_eq!(updated.id, "R1");
    store.delete("R1").await.unwrap();
}

#[tokio::test]
async fn auth_failure_is_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "success": false,
            "errors": [{ "code": 10000, "message": "Authentication error" }],
            "result": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = store(&server, false)
        .find_by_name_and_type(&IdentityKey::new("api.example.com", RecordType::A))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
    assert!(!err.is_retryable());
    assert!(!err.to_string().contains(TOKEN));
}

#[tokio::test]
async fn server_error_is_retryable_and_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let record = DeclaredRecord::new("api.example.com", RecordType::A, "10.0.0.5");
    let err = store(&server, false).create(&record).await.unwrap_err();

    assert!(err.is_retryable());
}

#[tokio::test]
async fn unsuccessful_envelope_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "errors": [{ "code": 9005, "message": "Content for A record is invalid." }],
            "result": null
        })))
        .mount(&server)
        .await;

    let record = DeclaredRecord::new("api.example.com", RecordType::A, "10.0.0.5");
    let err = store(&server, false).update("R1", &record).await.unwrap_err();

    assert!(matches!(err, Error::Provider { .. }));
    assert!(err.to_string().contains("9005"));
}

#[tokio::test]
async fn slow_response_times_out_as_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ok(serde_json::json!([])).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let store = store(&server, false)
        .with_http_timeout(Duration::from_millis(50))
        .unwrap();
    let err = store
        .find_by_name_and_type(&IdentityKey::new("api.example.com", RecordType::A))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout(_)));
    assert!(err.is_retryable());
}
