//! HTTP surface driven through the full router and middleware stack.

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{Harness, ScriptedProbe};
use cronhook::api::routes::create_router;
use cronhook::jobs::ProbeFailure;
use serde_json::{Value, json};
use tower::ServiceExt;

const BASE: &str = "/api/v1/cronJob";

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(path: &str, body: Value) -> Request<Body> {
    Request::post(format!("{}{}", BASE, path))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn job_lifecycle_over_http() {
    let h = Harness::new(ScriptedProbe::always_ok()).await;
    let owner = h.owner.id;
    let app = create_router(h.state.clone());

    let (status, job) = call(
        &app,
        post(
            "/create",
            json!({
                "userId": owner,
                "title": "keep warm",
                "url": "https://a.example.com/hook",
                "schedule": "5"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let job_id = job["id"].as_str().unwrap().to_string();

    let (status, job) = call(
        &app,
        post("/disable", json!({ "userId": owner, "cronJobId": job_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["active"], false);

    let (status, job) = call(
        &app,
        post(
            "/update",
            json!({ "userId": owner, "cronJobId": job_id, "title": "renamed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["title"], "renamed");

    let (status, _) = call(
        &app,
        post("/enable", json!({ "userId": owner, "cronJobId": job_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let query = format!("?userId={}&cronJobId={}", owner, job_id);
    let (status, events) = call(
        &app,
        Request::get(format!("{}/events{}", BASE, query))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events.as_array().unwrap().len(), 2);

    let (status, body) = call(
        &app,
        Request::post(format!("{}/delete{}", BASE, query))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Cron job deleted");
    assert!(h.state.lifecycle.registry().is_empty());

    let (status, body) = call(
        &app,
        Request::get(format!("{}/events{}", BASE, query))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn foreign_job_is_unauthorized() {
    let h = Harness::new(ScriptedProbe::always_ok()).await;
    let intruder = h.store.add_user("eve", "eve@example.com").unwrap();
    let job = h
        .state
        .lifecycle
        .create(
            h.owner.id,
            Harness::request("https://a.example.com/hook", "5"),
        )
        .await
        .unwrap();
    let app = create_router(h.state.clone());

    let (status, body) = call(
        &app,
        post(
            "/disable",
            json!({ "userId": intruder.id, "cronJobId": job.id }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body["request_id"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn probe_failures_are_classified() {
    let cases = [
        (ProbeFailure::Forbidden, "CORS_REJECTED"),
        (
            ProbeFailure::NoResponse {
                reason: "connection refused".to_string(),
            },
            "NO_RESPONSE",
        ),
        (
            ProbeFailure::Failed {
                status: Some(502),
                reason: "Bad Gateway".to_string(),
            },
            "PROBE_FAILED",
        ),
    ];

    for (failure, code) in cases {
        let h = Harness::new(ScriptedProbe::failing_with(failure)).await;
        let app = create_router(h.state.clone());

        let (status, body) = call(
            &app,
            post("/test", json!({ "url": "https://a.example.com/hook" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], code);
        assert_eq!(h.probe.calls().len(), 1, "probe is never retried");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reachable_probe_target_is_ok() {
    let h = Harness::new(ScriptedProbe::always_ok()).await;
    let app = create_router(h.state.clone());

    let (status, body) = call(
        &app,
        post("/test", json!({ "url": "https://a.example.com/hook" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Target is reachable");
}
