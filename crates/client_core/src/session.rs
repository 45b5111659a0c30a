use std::fmt;

use shared::{
    domain::{ValidationPolicy, View},
    protocol::{Outcome, PredictionReport},
};
use thiserror::Error;
use tracing::debug;

use crate::{shape_check, Predictor, ShapeCheck};

/// Lifecycle of a single submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Succeeded(Outcome),
    TransportFailed { detail: String },
    ApiErrored { status: u16, body: String },
    /// Blocked by the shape check; no request was issued.
    Rejected,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionState::Idle | SubmissionState::Submitting)
    }

    pub fn begin(&mut self) -> Result<(), SessionError> {
        match self {
            SubmissionState::Idle => {
                *self = SubmissionState::Submitting;
                Ok(())
            }
            SubmissionState::Submitting => Err(SessionError::Busy),
            other => Err(SessionError::InvalidTransition {
                action: "begin",
                from: other.name(),
            }),
        }
    }

    pub fn reject(&mut self) -> Result<(), SessionError> {
        match self {
            SubmissionState::Idle => {
                *self = SubmissionState::Rejected;
                Ok(())
            }
            other => Err(SessionError::InvalidTransition {
                action: "reject",
                from: other.name(),
            }),
        }
    }

    pub fn complete(&mut self, outcome: &Outcome) -> Result<(), SessionError> {
        if *self != SubmissionState::Submitting {
            return Err(SessionError::InvalidTransition {
                action: "complete",
                from: self.name(),
            });
        }
        *self = match outcome {
            Outcome::RequestFailed { detail } => SubmissionState::TransportFailed {
                detail: detail.clone(),
            },
            Outcome::ApiError { status, body } => SubmissionState::ApiErrored {
                status: *status,
                body: body.clone(),
            },
            verdict => SubmissionState::Succeeded(verdict.clone()),
        };
        Ok(())
    }

    /// Returns a finished submission to `Idle`. No-op when already idle.
    pub fn settle(&mut self) -> Result<(), SessionError> {
        match self {
            SubmissionState::Submitting => Err(SessionError::InvalidTransition {
                action: "settle",
                from: self.name(),
            }),
            _ => {
                *self = SubmissionState::Idle;
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Submitting => "submitting",
            SubmissionState::Succeeded(_) => "succeeded",
            SubmissionState::TransportFailed { .. } => "transport_failed",
            SubmissionState::ApiErrored { .. } => "api_errored",
            SubmissionState::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a submission is already in progress")]
    Busy,
    #[error("submissions are only accepted from the URL Prediction view (current: {0})")]
    WrongView(View),
    #[error("cannot {action} a submission that is {from}")]
    InvalidTransition {
        action: &'static str,
        from: &'static str,
    },
}

/// Per-user state: the selected view and the latest submission.
#[derive(Debug, Clone, Default)]
pub struct PredictionSession {
    view: View,
    policy: ValidationPolicy,
    state: SubmissionState,
    last_report: Option<PredictionReport>,
}

impl PredictionSession {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn with_view(mut self, view: View) -> Self {
        self.view = view;
        self
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn last_report(&self) -> Option<&PredictionReport> {
        self.last_report.as_ref()
    }

    /// Explicit navigation. Also clears a submission left in `Submitting` by
    /// an abandoned request.
    pub fn navigate(&mut self, view: View) {
        debug!(from = %self.view, to = %view, "navigate");
        self.view = view;
        self.state = SubmissionState::Idle;
    }

    /// Runs one submission from the prediction view.
    ///
    /// The previous terminal state is settled first, so the machine always
    /// goes `Idle -> Submitting -> terminal` (or `Idle -> Rejected`).
    pub async fn submit(
        &mut self,
        predictor: &dyn Predictor,
        url: &str,
    ) -> Result<PredictionReport, SessionError> {
        if self.view != View::UrlPrediction {
            return Err(SessionError::WrongView(self.view));
        }
        if self.state == SubmissionState::Submitting {
            return Err(SessionError::Busy);
        }
        self.state.settle()?;

        let report = match shape_check(self.policy, url) {
            ShapeCheck::Block => {
                self.state.reject()?;
                PredictionReport::rejected(url)
            }
            ShapeCheck::Proceed { warning } => {
                self.state.begin()?;
                let outcome = predictor.predict(url).await;
                self.state.complete(&outcome)?;
                PredictionReport::completed(url, outcome, warning)
            }
        };

        self.last_report = Some(report.clone());
        Ok(report)
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
