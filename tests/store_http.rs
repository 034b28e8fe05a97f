//! Fetches over a real socket against a small axum server.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, http::StatusCode, http::header, routing::get};
use rtv::domain::{TVConfig, TVError};
use rtv::store::{HttpSource, RecordSource, RecordStore, StoreEvent};
use tokio::net::TcpListener;
use tokio::runtime::Handle;

async fn serve() -> String {
    let app = Router::new()
        .route(
            "/api/users",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/json")],
                    r#"[{"zeta":"z1","id":1,"alpha":null},{"zeta":"z2","id":2,"alpha":"a"}]"#,
                )
            }),
        )
        .route(
            "/api/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/api/text", get(|| async { "this is not json" }))
        .route(
            "/api/object",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], r#"{"a":1}"#) }),
        )
        .route(
            "/api/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                ([(header::CONTENT_TYPE, "application/json")], r#"[{"slow":true}]"#)
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn source(base: &str) -> HttpSource {
    HttpSource::new(&TVConfig::default().base_url(base.to_string())).unwrap()
}

#[tokio::test]
async fn fetches_records_in_payload_key_order() {
    let base = serve().await;
    let collection = source(&base).fetch("users").await.unwrap();
    assert_eq!(collection.len(), 2);
    assert_eq!(collection.schema().fields(), ["zeta", "id", "alpha"]);
    assert!(collection.records()[0].get("alpha").is_absent());
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let base = serve().await;
    let err = source(&base).fetch("broken").await.unwrap_err();
    assert!(matches!(err, TVError::Status { status: 500, .. }));

    let err = source(&base).fetch("nowhere").await.unwrap_err();
    assert!(matches!(err, TVError::Status { status: 404, .. }));
}

#[tokio::test]
async fn malformed_payloads_are_errors() {
    let base = serve().await;
    assert!(matches!(
        source(&base).fetch("text").await,
        Err(TVError::Decode(_))
    ));
    assert!(matches!(
        source(&base).fetch("object").await,
        Err(TVError::UnexpectedPayload(_))
    ));
}

#[tokio::test]
async fn unreachable_server_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = source(&format!("http://{addr}")).fetch("users").await.unwrap_err();
    assert!(matches!(err, TVError::Http(_)));
}

#[tokio::test]
async fn timeout_is_reported() {
    let base = serve().await;
    let config = TVConfig::default()
        .base_url(base)
        .request_timeout(Some(Duration::from_millis(50)));
    let err = HttpSource::new(&config).unwrap().fetch("slow").await.unwrap_err();
    assert!(matches!(err, TVError::Http(e) if e.is_timeout()));
}

#[tokio::test]
async fn switching_resources_ignores_the_slow_one() {
    let base = serve().await;
    let mut store = RecordStore::new(Arc::new(source(&base)), Handle::current());

    store.select("slow");
    store.select("users");
    let event = store.wait().await.unwrap();
    assert!(matches!(event, StoreEvent::Loaded { ref resource, records: 2 } if resource == "users"));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(store.poll().is_empty());
    assert_eq!(store.collection().unwrap().schema().fields()[0], "zeta");
}

#[tokio::test]
async fn failed_fetch_keeps_the_loaded_collection() {
    let base = serve().await;
    let mut store = RecordStore::new(Arc::new(source(&base)), Handle::current());

    store.select("users");
    store.wait().await.unwrap();
    store.select("broken");
    let event = store.wait().await.unwrap();
    assert!(matches!(event, StoreEvent::Failed { .. }));
    assert_eq!(store.collection().unwrap().len(), 2);
}
