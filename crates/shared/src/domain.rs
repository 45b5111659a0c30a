use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorCode};

/// Navigation selection for one user session.
///
/// Starts at [`View::ProjectInfo`] and only changes through an explicit
/// navigation action; it is never shared between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    #[default]
    ProjectInfo,
    UrlPrediction,
}

impl View {
    pub const ALL: [View; 2] = [View::ProjectInfo, View::UrlPrediction];

    pub fn label(self) -> &'static str {
        match self {
            View::ProjectInfo => "Project Info",
            View::UrlPrediction => "URL Prediction",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            View::ProjectInfo => "info",
            View::UrlPrediction => "prediction",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for View {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" | "project_info" | "project info" => Ok(View::ProjectInfo),
            "prediction" | "url_prediction" | "url prediction" => Ok(View::UrlPrediction),
            other => Err(ApiError::new(
                ErrorCode::Validation,
                format!("unknown view '{other}'"),
            )),
        }
    }
}

/// What to do with the result of the URL shape check before submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Invalid input is reported and no request is issued.
    Enforce,
    /// The request proceeds; a warning travels with the result.
    Warn,
    /// The shape check is not consulted.
    #[default]
    Off,
}

impl ValidationPolicy {
    pub fn from_enforce_flag(enforce_shape_validation: bool) -> Self {
        if enforce_shape_validation {
            ValidationPolicy::Enforce
        } else {
            ValidationPolicy::Off
        }
    }
}

impl FromStr for ValidationPolicy {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforce" | "block" => Ok(ValidationPolicy::Enforce),
            "warn" => Ok(ValidationPolicy::Warn),
            "off" | "none" | "noop" => Ok(ValidationPolicy::Off),
            other => Err(ApiError::new(
                ErrorCode::Validation,
                format!("unknown validation policy '{other}'"),
            )),
        }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
