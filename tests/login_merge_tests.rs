// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login transition: server cart merge, fallbacks, and background sync.

use course_cart::config::Config;
use course_cart::services::{CartApiClient, LoginOutcome, OutboxHandle, Storefront, SyncOp};
use course_cart::storage::{keys, KeyValueStore, MemoryStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{cart_ids, simple_course, user_owning};

fn config_for(server: &MockServer) -> Config {
    Config {
        api_base_url: server.uri(),
        sync_base_delay_ms: 1,
        ..Config::default()
    }
}

/// Storefront whose outbox writes land on a channel the test can inspect.
fn storefront_with_channel(
    server: &MockServer,
    store: &MemoryStore,
) -> (
    Storefront,
    tokio::sync::mpsc::UnboundedReceiver<course_cart::services::SyncJob>,
) {
    let config = config_for(server);
    let api = CartApiClient::new(config.api_base_url.clone(), Duration::from_secs(5)).unwrap();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let storefront = Storefront::new(config, Arc::new(store.clone()))
        .with_remote(api, OutboxHandle::from_sender(tx));
    (storefront, rx)
}

async fn mount_server_cart(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/cart"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_merges_server_cart() {
    let server = MockServer::start().await;
    mount_server_cart(
        &server,
        json!([
            {"id": "server_only", "title": "Server", "price": 300},
            {"id": "shared", "title": "Server copy", "price": 1}
        ]),
    )
    .await;

    let store = MemoryStore::new();
    let (mut storefront, mut rx) = storefront_with_channel(&server, &store);
    storefront.cart_mut().add_item(&simple_course("local_only"));
    let mut shared = simple_course("shared");
    shared.title = "Local copy".to_string();
    storefront.cart_mut().add_item(&shared);

    let outcome = storefront
        .login(user_owning(&[]), "tok-1".to_string())
        .await;

    assert_eq!(outcome, LoginOutcome::Merged { server_items: 2 });
    assert_eq!(
        cart_ids(storefront.cart()),
        vec!["server_only", "shared", "local_only"]
    );
    let shared_title = storefront
        .cart()
        .items()
        .find(|i| i.id == "shared")
        .map(|i| i.title.clone());
    assert_eq!(shared_title.as_deref(), Some("Local copy"));

    // Merged result is persisted and queued for sync.
    let raw = store.get(keys::CART).unwrap().unwrap();
    assert!(raw.contains("server_only"));
    let job = rx.try_recv().expect("merged cart queued");
    assert_eq!(job.token, "tok-1");
    assert!(matches!(job.op, SyncOp::Replace(ref items) if items.len() == 3));
}

#[tokio::test]
async fn test_login_drops_owned_courses_from_merge() {
    let server = MockServer::start().await;
    mount_server_cart(&server, json!([{"id": "owned"}, {"id": "wanted"}])).await;

    let store = MemoryStore::new();
    let (mut storefront, _rx) = storefront_with_channel(&server, &store);

    storefront
        .login(user_owning(&["owned"]), "tok-1".to_string())
        .await;

    assert_eq!(cart_ids(storefront.cart()), vec!["wanted"]);
}

#[tokio::test]
async fn test_login_reads_server_cart_before_writing_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": "server_only", "price": 300}]))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    let (mut storefront, worker) =
        Storefront::connect(config_for(&server), Arc::new(store.clone())).unwrap();
    storefront.cart_mut().add_item(&simple_course("local"));
    storefront.cart_mut().add_item(&simple_course("owned"));

    let outcome = storefront
        .login(user_owning(&["owned"]), "tok-1".to_string())
        .await;
    assert_eq!(outcome, LoginOutcome::Merged { server_items: 1 });
    drop(storefront);
    let stats = worker.await.unwrap();
    assert_eq!(stats.delivered, 1);

    let requests = server.received_requests().await.unwrap();
    let methods: Vec<String> = requests.iter().map(|r| r.method.to_string()).collect();
    assert_eq!(methods, vec!["GET", "POST"]);

    let pushed: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let ids: Vec<&str> = pushed
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|item| item["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["server_only", "local"]);
}

#[tokio::test]
async fn test_failed_fetch_pushes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    let (mut storefront, mut rx) = storefront_with_channel(&server, &store);
    storefront.cart_mut().add_item(&simple_course("local"));
    storefront.cart_mut().add_item(&simple_course("owned"));

    storefront
        .login(user_owning(&["owned"]), "tok-1".to_string())
        .await;

    assert_eq!(cart_ids(storefront.cart()), vec!["local"]);
    assert!(rx.try_recv().is_err(), "server cart left untouched");

    storefront.cart_mut().add_item(&simple_course("later"));
    assert_eq!(rx.try_recv().unwrap().token, "tok-1");
}

#[tokio::test]
async fn test_login_keeps_local_cart_when_fetch_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    let (mut storefront, _rx) = storefront_with_channel(&server, &store);
    storefront.cart_mut().add_item(&simple_course("local_only"));

    let outcome = storefront
        .login(user_owning(&[]), "tok-1".to_string())
        .await;

    assert_eq!(outcome, LoginOutcome::LocalOnly);
    assert_eq!(cart_ids(storefront.cart()), vec!["local_only"]);
}

#[tokio::test]
async fn test_merge_happens_once_per_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    let (mut storefront, _rx) = storefront_with_channel(&server, &store);

    let first = storefront
        .login(user_owning(&[]), "tok-1".to_string())
        .await;
    let repeat = storefront
        .login(user_owning(&[]), "tok-1".to_string())
        .await;
    storefront.logout();
    let after_logout = storefront
        .login(user_owning(&[]), "tok-1".to_string())
        .await;

    assert_eq!(first, LoginOutcome::Merged { server_items: 0 });
    assert_eq!(repeat, LoginOutcome::AlreadyMerged);
    assert_eq!(after_logout, LoginOutcome::Merged { server_items: 0 });
}

#[tokio::test]
async fn test_offline_login_is_local_only() {
    let store = MemoryStore::new();
    let mut storefront = Storefront::new(Config::default(), Arc::new(store.clone()));
    storefront.cart_mut().add_item(&simple_course("a"));

    let outcome = storefront
        .login(user_owning(&["a"]), "tok-1".to_string())
        .await;

    assert_eq!(outcome, LoginOutcome::LocalOnly);
    assert_eq!(storefront.cart().count(), 0);
}

#[tokio::test]
async fn test_logout_stops_sync_and_keeps_cart() {
    let server = MockServer::start().await;
    mount_server_cart(&server, json!([])).await;

    let store = MemoryStore::new();
    let (mut storefront, mut rx) = storefront_with_channel(&server, &store);
    storefront
        .login(user_owning(&[]), "tok-1".to_string())
        .await;
    while rx.try_recv().is_ok() {}

    storefront.logout();
    storefront.cart_mut().add_item(&simple_course("after_logout"));

    assert!(rx.try_recv().is_err(), "no sync without a session");
    assert!(storefront.cart().contains("after_logout"));
    assert!(!store.contains_key(keys::TOKEN));
}

#[tokio::test]
async fn test_restored_session_filters_without_merging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    store
        .set(keys::CART, r#"[{"id":"owned"},{"id":"wanted"}]"#)
        .unwrap();
    store
        .set(keys::USER, r#"{"_id":"u1","purchasedCourses":["owned"]}"#)
        .unwrap();
    store.set(keys::TOKEN, "tok-1").unwrap();

    let (mut storefront, _rx) = storefront_with_channel(&server, &store);
    assert_eq!(cart_ids(storefront.cart()), vec!["wanted"]);

    let outcome = storefront
        .login(user_owning(&["owned"]), "tok-1".to_string())
        .await;
    assert_eq!(outcome, LoginOutcome::AlreadyMerged);
}

#[tokio::test]
async fn test_update_user_evicts_new_purchases() {
    let store = MemoryStore::new();
    let mut storefront = Storefront::new(Config::default(), Arc::new(store.clone()));
    storefront
        .login(user_owning(&[]), "tok-1".to_string())
        .await;
    storefront.cart_mut().add_item(&simple_course("a"));
    storefront.cart_mut().add_item(&simple_course("b"));

    assert!(storefront.update_user(user_owning(&["a"])));

    assert_eq!(cart_ids(storefront.cart()), vec!["b"]);
    let stored_user = store.get(keys::USER).unwrap().unwrap();
    assert!(stored_user.contains("\"a\""));
}

#[tokio::test]
async fn test_connected_storefront_syncs_changes() {
    let server = MockServer::start().await;
    mount_server_cart(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/cart"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1..)
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    let (mut storefront, worker) =
        Storefront::connect(config_for(&server), Arc::new(store.clone())).unwrap();
    storefront
        .login(user_owning(&[]), "tok-1".to_string())
        .await;
    storefront.cart_mut().add_item(&simple_course("a"));
    drop(storefront);

    let stats = worker.await.unwrap();
    assert!(stats.delivered >= 1);
    assert_eq!(stats.dropped, 0);
}
