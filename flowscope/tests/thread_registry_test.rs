//! Thread registry integration: listing prior runs and hydrating the
//! controller from persisted history.

use std::time::Duration;

use axum::extract::{Path, Query};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use flowscope::api::ConsoleApi;
use flowscope::controller::ExecutionController;
use flowscope::threads::ThreadRegistry;
use flowscope_types::TraceStep;

async fn spawn_service(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn session_store() -> Router {
    Router::new()
        .route(
            "/threads",
            get(
                |Query(params): Query<std::collections::HashMap<String, String>>| async move {
                    let all = json!([
                        {"id": "thread-alpha", "updatedAt": "2026-08-20T10:00:00Z"},
                        {"id": "thread-beta", "updatedAt": "2026-08-21T11:30:00Z"}
                    ]);
                    match params.get("thread_id") {
                        Some(filter) => {
                            let filtered: Vec<_> = all
                                .as_array()
                                .unwrap()
                                .iter()
                                .filter(|t| t["id"].as_str().unwrap().contains(filter.as_str()))
                                .cloned()
                                .collect();
                            Json(json!(filtered))
                        }
                        None => Json(all),
                    }
                },
            ),
        )
        .route(
            "/history/{id}",
            get(|Path(id): Path<String>| async move {
                assert_eq!(id, "thread-alpha");
                let steps = vec![
                    serde_json::to_value(TraceStep::user("earlier question")).unwrap(),
                    json!({
                        "node_id": "respond",
                        "role": "node",
                        "payloads": {
                            "output": {"kind": "text", "value": "earlier answer"}
                        }
                    }),
                ];
                Json(json!(steps))
            }),
        )
}

#[tokio::test]
async fn lists_and_filters_threads() {
    let base = spawn_service(session_store()).await;
    let api = ConsoleApi::new(&base, Duration::from_secs(2)).expect("client");
    let mut registry = ThreadRegistry::new(api);

    let threads = registry.refresh(None).await.expect("threads");
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].id, "thread-alpha");

    let filtered = registry.refresh(Some("beta")).await.expect("filtered");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, "thread-beta");
}

#[tokio::test]
async fn selecting_a_thread_replaces_steps_and_clears_highlight() {
    let base = spawn_service(session_store()).await;
    let api = ConsoleApi::new(&base, Duration::from_secs(2)).expect("client");
    let registry = ThreadRegistry::new(api);

    let mut controller = ExecutionController::new();
    let token = controller.submit("scratch work").expect("token");
    controller.finish_run(&token);

    let history = registry.history("thread-alpha").await.expect("history");
    assert_eq!(history.len(), 2);
    controller.select_thread("thread-alpha", history);

    assert_eq!(controller.thread_id(), "thread-alpha");
    assert_eq!(controller.steps().len(), 2);
    assert_eq!(controller.steps()[1].node_id.as_str(), "respond");
    assert!(controller.active_node().is_none());
}
