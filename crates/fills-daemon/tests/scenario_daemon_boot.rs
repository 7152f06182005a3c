//! Boot behaviour: a store that cannot be opened leaves the daemon serving
//! 503s instead of aborting, and the daemon never creates a database.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use fills_config::DatabaseConfig;
use fills_daemon::{routes, state};
use fills_db::{FillStore, StoreError, StoreOptions};
use http_body_util::BodyExt;
use tower::ServiceExt;

#[tokio::test]
async fn unreachable_store_boots_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = DatabaseConfig {
        url: format!(
            "sqlite://{}",
            dir.path().join("no-such-dir").join("t.sqlite").display()
        ),
        connect_attempts: 2,
        connect_backoff_ms: 1,
        ..DatabaseConfig::default()
    };

    let st = state::AppState::connect(&cfg).await;
    assert!(matches!(st.store, Err(StoreError::Connection { .. })));

    let router = routes::build_router(Arc::new(st));
    let req = Request::builder()
        .method("GET")
        .uri("/get_filter_options")
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

async fn call(router: axum::Router, method: &str, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn mistyped_path_is_503_and_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trdaes.sqlite");
    let cfg = DatabaseConfig {
        url: format!("sqlite://{}", path.display()),
        connect_attempts: 1,
        ..DatabaseConfig::default()
    };

    let st = state::AppState::connect(&cfg).await;
    assert!(matches!(st.store, Err(StoreError::Connection { .. })));

    let router = routes::build_router(Arc::new(st));
    let (status, json) = call(router, "POST", "/get_data", r#"{"filters": "{}"}"#).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["kind"], "store_unavailable");
    assert!(!path.exists());
}

#[tokio::test]
async fn existing_file_without_schema_is_not_migrated() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("trades.sqlite").display());

    // an empty database file, as left behind by some other tool
    let bare = FillStore::open(
        &url,
        StoreOptions {
            create_if_missing: true,
            ..StoreOptions::default()
        },
    )
    .await
    .unwrap();
    bare.close().await;

    let cfg = DatabaseConfig {
        url,
        ..DatabaseConfig::default()
    };
    let st = Arc::new(state::AppState::connect(&cfg).await);
    let store = st.store.as_ref().expect("store opens");
    assert!(!fills_db::status(store).await.unwrap().has_fills_table);

    let (status, json) = call(
        routes::build_router(Arc::clone(&st)),
        "POST",
        "/get_data",
        r#"{"filters": "{}"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["kind"], "store_query");

    let (status, json) = call(routes::build_router(Arc::clone(&st)), "GET", "/v1/health", "").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["store"]["has_fills_table"], false);

    st.shutdown().await;
}
