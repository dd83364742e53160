use std::sync::Arc;

use crate::inference::Predictor;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Lazily-loaded model handle, shared read-only across requests
    pub predictor: Arc<Predictor>,
}

impl AppState {
    pub fn new(predictor: Arc<Predictor>) -> Self {
        Self { predictor }
    }
}
