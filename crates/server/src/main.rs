use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{Local, NaiveDate};
use client_core::{PredictionClient, PredictionSession};
use serde::Deserialize;
use shared::{
    domain::View,
    error::{ApiError, ErrorCode},
    protocol::{PredictionReport, PredictionRequest},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

mod app_state;
mod config;
mod views;

use app_state::AppState;
use config::load_settings;
use views::{render_view, PredictionPane};

/// Bounds request bodies well above any real URL, including long phishing links.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Deserialize)]
struct NavQuery {
    view: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitForm {
    #[serde(default)]
    url: String,
}

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings().context("failed to load settings")?;
    let predictor = PredictionClient::new(settings.client_config())
        .context("failed to build prediction client")?;
    info!(
        endpoint = %predictor.endpoint_url(),
        timeout_secs = settings.request_timeout_secs,
        policy = ?settings.validation_policy,
        "prediction endpoint configured"
    );

    let state = AppState {
        predictor: Arc::new(predictor),
        policy: settings.validation_policy,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(show_view))
        .route("/healthz", get(healthz))
        .route("/predict", get(show_prediction_form).post(submit_form))
        .route("/api/predict", post(api_predict))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn healthz() -> &'static str {
    "ok"
}

/// Renders whichever view the navigation selected. Never contacts the endpoint.
async fn show_view(Query(q): Query<NavQuery>) -> Result<Html<String>, HttpError> {
    let view = match q.view.as_deref() {
        None | Some("") => View::default(),
        Some(raw) => raw
            .parse::<View>()
            .map_err(|e| (StatusCode::BAD_REQUEST, Json(e)))?,
    };
    Ok(Html(render_view(view, today(), &PredictionPane::default())))
}

async fn show_prediction_form() -> Html<String> {
    Html(render_view(
        View::UrlPrediction,
        today(),
        &PredictionPane::default(),
    ))
}

async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SubmitForm>,
) -> Result<Html<String>, HttpError> {
    let report = run_submission(&state, &form.url).await?;
    let pane = PredictionPane {
        input: Some(&form.url),
        report: Some(&report),
    };
    Ok(Html(render_view(View::UrlPrediction, today(), &pane)))
}

async fn api_predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionReport>, HttpError> {
    let Json(req) = payload.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(ErrorCode::Validation, rejection.body_text())),
        )
    })?;
    let report = run_submission(&state, &req.url).await?;
    Ok(Json(report))
}

/// One submission from a fresh session that has navigated to the prediction view.
async fn run_submission(state: &AppState, url: &str) -> Result<PredictionReport, HttpError> {
    let mut session = PredictionSession::new(state.policy);
    session.navigate(View::UrlPrediction);
    session
        .submit(state.predictor.as_ref(), url)
        .await
        .map_err(|e| {
            error!(error = %e, "submission rejected by session");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(ErrorCode::Internal, e.to_string())),
            )
        })
}

async fn not_found() -> HttpError {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(ErrorCode::NotFound, "no such page")),
    )
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
