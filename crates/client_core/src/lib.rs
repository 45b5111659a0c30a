use std::{error::Error as _, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::ValidationPolicy,
    protocol::{Outcome, PredictionReport, PredictionRequest, PredictionResponse},
    url_shape::is_valid_url,
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod session;
pub use session::{PredictionSession, SessionError, SubmissionState};

pub const DEFAULT_ENDPOINT_URL: &str = "https://nayds004-url-predictor-space.hf.space/predict";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const SAMPLE_URL: &str = "https://www.google.com/search?q=safeurl";

const SHAPE_WARNING: &str = "URL does not look like a complete http(s)/ftp URL";

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("{0}")]
    Transport(String),
    #[error("endpoint answered {status}")]
    Api { status: u16, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<PredictError> for Outcome {
    fn from(value: PredictError) -> Self {
        match value {
            PredictError::Api { status, body } => Outcome::ApiError { status, body },
            other => Outcome::RequestFailed {
                detail: other.to_string(),
            },
        }
    }
}

/// Anything that can turn a submitted URL into an [`Outcome`].
///
/// Implementations never fail: every error is folded into the outcome.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, url: &str) -> Outcome;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint_url: String,
    pub request_timeout: Duration,
    /// Cosmetic pause before the request is issued. Not a retry delay.
    pub submit_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            submit_delay: Duration::ZERO,
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            ..Self::default()
        }
    }
}

/// HTTP client for the remote prediction endpoint.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: Client,
    endpoint_url: String,
    request_timeout: Duration,
    submit_delay: Duration,
}

impl PredictionClient {
    pub fn new(config: ClientConfig) -> Result<Self, PredictError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PredictError::Transport(describe(&e)))?;
        Ok(Self {
            http,
            endpoint_url: config.endpoint_url,
            request_timeout: config.request_timeout,
            submit_delay: config.submit_delay,
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Sends one prediction request and classifies the answer.
    ///
    /// Verdicts (including [`Outcome::Unavailable`]) come back as `Ok`; transport,
    /// status and decoding problems come back as `Err`.
    pub async fn request_prediction(&self, url: &str) -> Result<Outcome, PredictError> {
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }

        debug!(endpoint = %self.endpoint_url, "sending url for prediction");
        let response = self
            .http
            .post(&self.endpoint_url)
            .json(&PredictionRequest::new(url))
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| self.transport_error(&e))?;
            return Err(PredictError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let parsed = parse_prediction_body(&bytes)?;
        Ok(parsed.verdict())
    }

    fn transport_error(&self, err: &reqwest::Error) -> PredictError {
        if err.is_timeout() {
            return PredictError::Transport(format!(
                "request timed out after {}s: {}",
                self.request_timeout.as_secs_f64(),
                describe(err)
            ));
        }
        PredictError::Transport(describe(err))
    }
}

#[async_trait]
impl Predictor for PredictionClient {
    async fn predict(&self, url: &str) -> Outcome {
        match self.request_prediction(url).await {
            Ok(outcome) => {
                info!(?outcome, "prediction received");
                outcome
            }
            Err(error) => {
                warn!(%error, endpoint = %self.endpoint_url, "prediction request failed");
                error.into()
            }
        }
    }
}

fn parse_prediction_body(bytes: &[u8]) -> Result<PredictionResponse, PredictError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| PredictError::MalformedResponse(format!("body is not valid JSON ({e})")))?;
    if !value.is_object() {
        return Err(PredictError::MalformedResponse(
            "expected a JSON object".into(),
        ));
    }
    serde_json::from_value(value).map_err(|e| PredictError::MalformedResponse(e.to_string()))
}

/// Flattens an error and its sources into one readable line.
fn describe(err: &reqwest::Error) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !detail.contains(&cause_text) {
            detail.push_str(": ");
            detail.push_str(&cause_text);
        }
        source = cause.source();
    }
    detail
}

/// Result of applying a [`ValidationPolicy`] to one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeCheck {
    Proceed { warning: Option<String> },
    Block,
}

pub fn shape_check(policy: ValidationPolicy, url: &str) -> ShapeCheck {
    match policy {
        ValidationPolicy::Off => ShapeCheck::Proceed { warning: None },
        ValidationPolicy::Warn if is_valid_url(url) => ShapeCheck::Proceed { warning: None },
        ValidationPolicy::Warn => ShapeCheck::Proceed {
            warning: Some(SHAPE_WARNING.to_string()),
        },
        ValidationPolicy::Enforce if is_valid_url(url) => ShapeCheck::Proceed { warning: None },
        ValidationPolicy::Enforce => ShapeCheck::Block,
    }
}

/// One full submission without session bookkeeping.
pub async fn submit(
    predictor: &dyn Predictor,
    policy: ValidationPolicy,
    url: &str,
) -> PredictionReport {
    match shape_check(policy, url) {
        ShapeCheck::Block => {
            info!("submission blocked by url shape check");
            PredictionReport::rejected(url)
        }
        ShapeCheck::Proceed { warning } => {
            let outcome = predictor.predict(url).await;
            PredictionReport::completed(url, outcome, warning)
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
