use std::sync::Arc;

use client_core::Predictor;
use shared::domain::ValidationPolicy;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) predictor: Arc<dyn Predictor>,
    pub(crate) policy: ValidationPolicy,
}
