use super::*;
use async_trait::async_trait;
use axum::{body, body::Body, http::Request};
use client_core::Predictor;
use shared::{domain::ValidationPolicy, protocol::Outcome};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};
use tower::ServiceExt;

struct RecordingPredictor {
    outcome: Outcome,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl RecordingPredictor {
    fn new(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Predictor for RecordingPredictor {
    async fn predict(&self, url: &str) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().expect("lock").push(url.to_string());
        self.outcome.clone()
    }
}

fn test_app(predictor: Arc<RecordingPredictor>, policy: ValidationPolicy) -> Router {
    build_router(Arc::new(AppState { predictor, policy }))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

fn form_request(url: &str) -> Request<Body> {
    let encoded: String = url
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect();
    Request::post("/predict")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(format!("url={encoded}")))
        .expect("request")
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = test_app(RecordingPredictor::new(Outcome::Benign), ValidationPolicy::Off);
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn default_view_is_project_info_without_network_call() {
    let predictor = RecordingPredictor::new(Outcome::Malicious);
    let app = test_app(predictor.clone(), ValidationPolicy::Off);

    for uri in ["/", "/?view=info", "/?view=project_info"] {
        let request = Request::get(uri).body(Body::empty()).expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Project Overview"));
    }
    assert_eq!(predictor.calls(), 0);
}

#[tokio::test]
async fn selecting_prediction_view_renders_form_only() {
    let predictor = RecordingPredictor::new(Outcome::Malicious);
    let app = test_app(predictor.clone(), ValidationPolicy::Off);

    for uri in ["/?view=prediction", "/predict"] {
        let request = Request::get(uri).body(Body::empty()).expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("URL Safety Checker"));
        assert!(!html.contains("MALICIOUS URL"));
    }
    assert_eq!(predictor.calls(), 0);
}

#[tokio::test]
async fn unknown_view_is_rejected() {
    let app = test_app(RecordingPredictor::new(Outcome::Benign), ValidationPolicy::Off);
    let request = Request::get("/?view=admin")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = serde_json::from_str(&body_text(response).await).expect("json");
    assert!(matches!(err.code, ErrorCode::Validation));
}

#[tokio::test]
async fn form_submission_renders_verdict_and_echo() {
    let predictor = RecordingPredictor::new(Outcome::Malicious);
    let app = test_app(predictor.clone(), ValidationPolicy::Off);

    let response = app
        .oneshot(form_request("https://evil.example/login?x=1"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("MALICIOUS URL"));
    assert!(html.contains("https://evil.example/login?x=1"));
    assert_eq!(predictor.calls(), 1);
    assert_eq!(
        predictor.urls.lock().expect("lock").as_slice(),
        ["https://evil.example/login?x=1".to_string()]
    );
}

#[tokio::test]
async fn form_submission_passes_url_through_untrimmed() {
    let predictor = RecordingPredictor::new(Outcome::Benign);
    let app = test_app(predictor.clone(), ValidationPolicy::Off);

    let response = app
        .oneshot(form_request("  http://x  "))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        predictor.urls.lock().expect("lock").as_slice(),
        ["  http://x  ".to_string()]
    );
}

#[tokio::test]
async fn api_error_outcome_is_reported_without_verdict() {
    let predictor = RecordingPredictor::new(Outcome::ApiError {
        status: 500,
        body: "server error".into(),
    });
    let app = test_app(predictor, ValidationPolicy::Off);

    let response = app.oneshot(form_request("http://x")).await.expect("response");
    let html = body_text(response).await;
    assert!(html.contains("API Error: 500 - server error"));
    assert!(!html.contains("Prediction unavailable."));
}

#[tokio::test]
async fn enforce_policy_blocks_invalid_form_input() {
    let predictor = RecordingPredictor::new(Outcome::Malicious);
    let app = test_app(predictor.clone(), ValidationPolicy::Enforce);

    let response = app
        .oneshot(form_request("not a url"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Invalid URL format"));
    assert!(html.contains("not a url"));
    assert_eq!(predictor.calls(), 0);
}

#[tokio::test]
async fn json_api_returns_report() {
    let predictor = RecordingPredictor::new(Outcome::Unavailable);
    let app = test_app(predictor.clone(), ValidationPolicy::Warn);

    let request = Request::post("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "url": "not a url" }).to_string(),
        ))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let report: PredictionReport =
        serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(report.submitted.url, "not a url");
    assert_eq!(report.outcome, Some(Outcome::Unavailable));
    assert_eq!(report.message, "Prediction unavailable.");
    assert!(report.warning.is_some());
    assert_eq!(predictor.calls(), 1);
}

#[tokio::test]
async fn long_urls_reach_the_predictor_and_are_echoed() {
    let predictor = RecordingPredictor::new(Outcome::Malicious);
    let app = test_app(predictor.clone(), ValidationPolicy::Off);
    let long_url = format!("https://login.example/?next={}", "a".repeat(20_000));

    let request = Request::post("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "url": long_url }).to_string(),
        ))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let report: PredictionReport =
        serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(report.submitted.url, long_url);
    assert_eq!(report.outcome, Some(Outcome::Malicious));

    let response = app
        .oneshot(form_request(&long_url))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(&"a".repeat(20_000)));

    assert_eq!(predictor.calls(), 2);
    assert_eq!(predictor.urls.lock().expect("lock")[0], long_url);
}

#[tokio::test]
async fn oversized_body_is_refused_before_prediction() {
    let predictor = RecordingPredictor::new(Outcome::Benign);
    let app = test_app(predictor.clone(), ValidationPolicy::Off);

    let request = Request::post("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "url": "a".repeat(MAX_BODY_BYTES) }).to_string(),
        ))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert!(response.status().is_client_error());
    assert_eq!(predictor.calls(), 0);
}

#[tokio::test]
async fn json_api_rejects_malformed_body() {
    let predictor = RecordingPredictor::new(Outcome::Benign);
    let app = test_app(predictor.clone(), ValidationPolicy::Off);

    let request = Request::post("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from("{\"link\": 3}"))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = serde_json::from_str(&body_text(response).await).expect("json");
    assert!(matches!(err.code, ErrorCode::Validation));
    assert_eq!(predictor.calls(), 0);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = test_app(RecordingPredictor::new(Outcome::Benign), ValidationPolicy::Off);
    let request = Request::get("/admin")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
