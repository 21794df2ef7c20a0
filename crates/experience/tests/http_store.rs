//! `HttpEventStore` against a fake events endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;

use eventing_experience::remote::{HttpEventStore, RemoteStore};

#[derive(Default)]
struct FakeApp {
    events: AtomicUsize,
    clears: AtomicUsize,
}

async fn events(
    State(app): State<Arc<FakeApp>>,
    Query(params): Query<HashMap<String, String>>,
) -> String {
    if params.get("deleteAll").map(String::as_str) == Some("true") {
        app.events.store(0, Ordering::SeqCst);
        app.clears.fetch_add(1, Ordering::SeqCst);
        return "All cloud events deleted. Remove the deleteAll parameter and reload the page."
            .to_string();
    }

    match app.events.load(Ordering::SeqCst) {
        0 => "No events found in the database!".to_string(),
        n => format!("NUMBER OF EVENTS (MAX 100 DISPLAYED): {}", n),
    }
}

async fn serve(app: Arc<FakeApp>) -> String {
    let router = Router::new()
        .route("/v1/events", get(events))
        .with_state(app);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn clear_all_hits_delete_all_endpoint() {
    let app = Arc::new(FakeApp::default());
    app.events.store(4, Ordering::SeqCst);
    let base = serve(app.clone()).await;

    let store = HttpEventStore::new(format!("{}/v1/events?deleteAll=true", base)).unwrap();
    let body = store.clear_all().await.unwrap();

    assert!(body.starts_with("All cloud events deleted"));
    assert_eq!(app.clears.load(Ordering::SeqCst), 1);
    assert_eq!(app.events.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn clear_all_reports_unreachable_app() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = HttpEventStore::new(format!("http://{}/v1/events?deleteAll=true", addr)).unwrap();
    assert!(store.clear_all().await.is_err());
}
