use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use surge_autoscale::PartitionRegistry;
use surge_plugin::build_router;
use tower::ServiceExt;

const YAML: &str = "metadata:\n  namespace: default\n  name: hello\nspec:\n  containerConcurrency: 10\n  maxScale: 5\n";

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn create(partition: &str) -> Value {
    json!({
        "partition": partition,
        "type": "CREATE",
        "time": 0,
        "object": { "kind": "autoscaler", "yaml": YAML },
    })
}

#[tokio::test]
async fn event_stat_scale_round_trip() {
    let router = build_router(Arc::new(PartitionRegistry::default()));

    let resp = router.clone().oneshot(post("/v1/event", create("p1"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    for pod in ["pod-a", "pod-b"] {
        let event = json!({
            "partition": "p1",
            "type": "CREATE",
            "object": { "kind": "pod", "name": pod, "phase": "Running" },
        });
        let resp = router.clone().oneshot(post("/v1/event", event)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let stats = json!({
        "partition": "p1",
        "stats": [
            { "time": 1_000_000_000i64, "pod_name": "pod-a", "metric": "concurrency", "value": 20.0 },
            { "time": 1_000_000_000i64, "pod_name": "pod-b", "metric": "concurrency", "value": 15.0 },
        ],
    });
    let resp = router.clone().oneshot(post("/v1/stat", stats)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
        .oneshot(post("/v1/scale", json!({ "partition": "p1", "time": 1_000_000_000i64 })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    // 35 in flight at 10 per pod.
    assert_eq!(body["data"]["replicas"], 4);
}

#[tokio::test]
async fn duplicate_create_conflicts() {
    let router = build_router(Arc::new(PartitionRegistry::default()));
    router.clone().oneshot(post("/v1/event", create("p1"))).await.unwrap();

    let resp = router.oneshot(post("/v1/event", create("p1"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("p1"));
}

#[tokio::test]
async fn update_autoscaler_is_unsupported() {
    let router = build_router(Arc::new(PartitionRegistry::default()));
    router.clone().oneshot(post("/v1/event", create("p1"))).await.unwrap();

    let mut update = create("p1");
    update["type"] = json!("UPDATE");
    let resp = router.oneshot(post("/v1/event", update)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn delete_unknown_partition_is_not_found() {
    let router = build_router(Arc::new(PartitionRegistry::default()));
    let mut delete = create("ghost");
    delete["type"] = json!("DELETE");
    let resp = router.oneshot(post("/v1/event", delete)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_config_and_bad_body_are_bad_requests() {
    let router = build_router(Arc::new(PartitionRegistry::default()));

    let bad_yaml = json!({
        "partition": "p1",
        "type": "CREATE",
        "object": { "kind": "autoscaler", "yaml": "spec: [unclosed" },
    });
    let resp = router.clone().oneshot(post("/v1/event", bad_yaml)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let bad_kind = json!({
        "partition": "p1",
        "type": "PATCH",
        "object": { "kind": "pod", "name": "x" },
    });
    let resp = router.clone().oneshot(post("/v1/event", bad_kind)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);

    let resp = router.oneshot(post("/v1/scale", json!({ "time": 0 }))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unrecognized_object_is_accepted() {
    let router = build_router(Arc::new(PartitionRegistry::default()));
    let event = json!({
        "partition": "p1",
        "type": "CREATE",
        "object": { "kind": "gateway", "name": "x" },
    });
    let resp = router.oneshot(post("/v1/event", event)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn handshake_route() {
    let router = build_router(Arc::new(PartitionRegistry::default()));
    let req = Request::builder()
        .uri("/v1/handshake")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(
        body["data"]["protocol_version"],
        surge_plugin::handshake::PROTOCOL_VERSION
    );
}
