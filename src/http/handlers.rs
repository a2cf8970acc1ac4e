use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    response::Html,
    Form, Json,
};
use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Semaphore;

use super::error::{AppError, PageError};
use super::pages;
use super::state::AppState;
use crate::features::{self, FeatureVector, FEATURE_COLUMNS};
use crate::model::Regressor;

pub type HandlerResult<T> = Result<Json<T>, AppError>;

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: f64,
    /// `prediction` with two decimals, as shown on the result page
    pub output: String,
    pub features: FeatureVector,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub features: usize,
}

/// GET /
pub async fn index() -> Html<String> {
    Html(pages::index())
}

/// POST /
///
/// Failures come back as an HTML page carrying the JSON endpoint's status.
pub async fn submit(
    State(state): State<AppState>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<Html<String>, PageError> {
    let Form(fields) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (prediction, _) = predict_fields(&state, &fields).await?;
    Ok(Html(pages::result(&features::format_prediction(prediction))))
}

/// POST /predict
///
/// Same fields as the form, as a JSON object. Numeric fields may be sent as
/// JSON numbers or strings.
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<HashMap<String, Value>>, JsonRejection>,
) -> HandlerResult<PredictionResponse> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let fields = stringify_fields(payload)?;
    let (prediction, row) = predict_fields(&state, &fields).await?;
    Ok(Json(PredictionResponse {
        prediction,
        output: features::format_prediction(prediction),
        features: row,
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.model.kind().to_string(),
        features: state.model.feature_names().len(),
    })
}

fn stringify_fields(payload: HashMap<String, Value>) -> Result<HashMap<String, String>, AppError> {
    payload
        .into_iter()
        .map(|(k, v)| match v {
            Value::String(s) => Ok((k, s)),
            Value::Number(n) => Ok((k, n.to_string())),
            other => Err(AppError::BadRequest(format!(
                "field `{}` must be a string or number, got {}",
                k, other
            ))),
        })
        .collect()
}

async fn predict_fields(
    state: &AppState,
    fields: &HashMap<String, String>,
) -> Result<(f64, FeatureVector), AppError> {
    let row = features::encode(fields)?;

    // Debug signal so we can confirm we're not sending all-zeros
    if state.log_features {
        let values = row.to_row();
        let nz = values.iter().filter(|x| **x != 0.0).count();
        let sample: Vec<String> = FEATURE_COLUMNS
            .iter()
            .zip(values.iter())
            .map(|(name, v)| format!("{}={:.3}", name, v))
            .collect();
        tracing::info!("encoded row nonzero={} [{}]", nz, sample.join(", "));
    }

    let prediction = infer(state, row).await?;
    tracing::debug!("prediction {:.4}", prediction);
    Ok((prediction, row))
}

/// Runs the model on the blocking pool, bounded by the configured timeout.
///
/// A blocking call cannot be cancelled, so a timed-out call keeps running.
/// It holds its permit until the model returns, which caps how many hung
/// calls can pile up on the blocking pool.
async fn infer(state: &AppState, row: FeatureVector) -> Result<f64, AppError> {
    let run = run_with_permit(
        Arc::clone(&state.model),
        Arc::clone(&state.inference_permits),
        row,
    );
    match tokio::time::timeout(state.inference_timeout, run).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(state.inference_timeout)),
    }
}

async fn run_with_permit(
    model: Arc<dyn Regressor>,
    permits: Arc<Semaphore>,
    row: FeatureVector,
) -> Result<f64, AppError> {
    let permit = permits
        .acquire_owned()
        .await
        .map_err(|e| AppError::Internal(format!("inference permits closed: {}", e)))?;
    let task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        model.predict(&row)
    });
    match task.await {
        Ok(result) => Ok(result?),
        Err(join) => Err(AppError::Internal(format!("inference task failed: {}", join))),
    }
}
