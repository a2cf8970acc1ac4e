use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::model::Regressor;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded once before serving, read-only afterwards.
    pub model: Arc<dyn Regressor>,
    pub inference_timeout: Duration,
    /// One permit per model call still running, timed out or not
    pub inference_permits: Arc<Semaphore>,
    pub log_features: bool,
}

impl AppState {
    pub fn new(model: Arc<dyn Regressor>, config: &ServerConfig) -> Self {
        Self {
            log_features: config.log_features,
            ..Self::with_limits(model, config.inference_timeout, config.max_inferences)
        }
    }

    pub fn with_limits(
        model: Arc<dyn Regressor>,
        inference_timeout: Duration,
        max_inferences: usize,
    ) -> Self {
        Self {
            model,
            inference_timeout,
            inference_permits: Arc::new(Semaphore::new(max_inferences)),
            log_features: false,
        }
    }

    pub fn with_timeout(model: Arc<dyn Regressor>, inference_timeout: Duration) -> Self {
        Self::with_limits(model, inference_timeout, 8)
    }
}
