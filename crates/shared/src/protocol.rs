use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const INVALID_URL_MESSAGE: &str =
    "Invalid URL format. Please enter a complete URL starting with http:// or https://.";

/// Body sent to the prediction endpoint. The URL is passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub url: String,
}

impl PredictionRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Success body of the prediction endpoint.
///
/// `prediction` is kept as raw JSON so that out-of-domain values (strings,
/// floats, `null`) can be told apart from the two verdicts without coercion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Value>,
}

impl PredictionResponse {
    /// Only the JSON integers `1` and `0` are verdicts. Loosely equal values
    /// such as `1.0`, `true` or `"1"` are deliberately `Unavailable`.
    pub fn verdict(&self) -> Outcome {
        match self.prediction.as_ref().and_then(strict_integer) {
            Some(1) => Outcome::Malicious,
            Some(0) => Outcome::Benign,
            _ => Outcome::Unavailable,
        }
    }
}

fn strict_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        _ => None,
    }
}

/// Result of one prediction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Malicious,
    Benign,
    Unavailable,
    RequestFailed { detail: String },
    ApiError { status: u16, body: String },
}

impl Outcome {
    /// True for the three verdict outcomes, false for the two error states.
    pub fn is_verdict(&self) -> bool {
        matches!(
            self,
            Outcome::Malicious | Outcome::Benign | Outcome::Unavailable
        )
    }

    pub fn message(&self) -> String {
        match self {
            Outcome::Malicious => "MALICIOUS URL".to_string(),
            Outcome::Benign => "BENIGN URL".to_string(),
            Outcome::Unavailable => "Prediction unavailable.".to_string(),
            Outcome::RequestFailed { detail } => format!("Request failed: {detail}"),
            Outcome::ApiError { status, body } => format!("API Error: {status} - {body}"),
        }
    }
}

/// Everything shown to the user after one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Echo of what the user submitted, unchanged.
    pub submitted: PredictionRequest,
    /// `None` when the shape check blocked the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl PredictionReport {
    pub fn completed(url: impl Into<String>, outcome: Outcome, warning: Option<String>) -> Self {
        Self {
            submitted: PredictionRequest::new(url),
            message: outcome.message(),
            outcome: Some(outcome),
            warning,
        }
    }

    pub fn rejected(url: impl Into<String>) -> Self {
        Self {
            submitted: PredictionRequest::new(url),
            outcome: None,
            message: INVALID_URL_MESSAGE.to_string(),
            warning: None,
        }
    }

    pub fn was_rejected(&self) -> bool {
        self.outcome.is_none()
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
