use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;

use super::pages;
use crate::features::EncodeError;
use crate::model::ModelError;
use crate::types::FIELD_DATE;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
    /// Offending form field, for input errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

#[derive(Debug)]
pub enum AppError {
    /// Body could not be read as a form / JSON object
    BadRequest(String),
    /// Fields present but not parseable into a session
    Encode(EncodeError),
    Model(ModelError),
    Timeout(Duration),
    Internal(String),
}

impl AppError {
    /// Status and body shared by the JSON and HTML renderings.
    pub fn parts(self) -> (StatusCode, ApiError) {
        let plain = |code, message| ApiError {
            code,
            message,
            field: None,
        };
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, plain("BAD_REQUEST", msg)),
            AppError::Encode(e) => {
                let field = match &e {
                    EncodeError::MissingField(f) | EncodeError::InvalidNumber { field: f, .. } => *f,
                    EncodeError::InvalidTimestamp { .. } => FIELD_DATE,
                };
                let body = ApiError {
                    code: "INVALID_INPUT",
                    message: e.to_string(),
                    field: Some(field),
                };
                (StatusCode::BAD_REQUEST, body)
            }
            AppError::Model(e) => {
                tracing::error!("inference failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    plain("MODEL_ERROR", e.to_string()),
                )
            }
            AppError::Timeout(after) => {
                tracing::warn!("inference timed out after {:?}", after);
                let msg = format!("inference did not finish within {} ms", after.as_millis());
                (StatusCode::GATEWAY_TIMEOUT, plain("INFERENCE_TIMEOUT", msg))
            }
            AppError::Internal(msg) => {
                tracing::error!("{}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, plain("INTERNAL_ERROR", msg))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        (status, Json(body)).into_response()
    }
}

/// Same failures as `AppError`, rendered as a page for the browser form.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, body) = self.0.parts();
        (status, Html(pages::error(&body.message))).into_response()
    }
}

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        PageError(err)
    }
}

impl From<EncodeError> for PageError {
    fn from(err: EncodeError) -> Self {
        PageError(AppError::Encode(err))
    }
}

impl From<EncodeError> for AppError {
    fn from(err: EncodeError) -> Self {
        AppError::Encode(err)
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        AppError::Model(err)
    }
}
