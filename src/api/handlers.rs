use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::api::{
    state::AppState,
    types::{ErrorResponse, HealthResponse, PredictResponse},
};
use crate::error::DigitError;
use crate::preprocess::preprocess_bytes;

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// GET /health -- liveness probe, independent of model state
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// POST /predict -- classify one uploaded image
///
/// The declared content type is validated before any bytes are read or
/// the model is consulted; validation failures keep their 400 status
/// while everything else surfaces as a 500 with the underlying message.
pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> std::result::Result<Json<PredictResponse>, HandlerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(DigitError::InvalidInput(format!("malformed multipart body: {e}"))))?
    {
        if field.name() != Some("file") {
            continue;
        }

        match field.content_type() {
            Some(ct) if ct.starts_with("image/") => {}
            _ => {
                return Err(reject(DigitError::InvalidInput(
                    "Please upload an image file".to_string(),
                )))
            }
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| reject(DigitError::InvalidInput(format!("failed to read upload: {e}"))))?;

        let image = preprocess_bytes(&bytes).map_err(reject)?;
        let prediction = state.predictor.predict(&image).await.map_err(reject)?;

        debug!(digit = prediction.digit, "served prediction");
        return Ok(Json(PredictResponse {
            digit: prediction.digit,
            probs: prediction.probs,
        }));
    }

    Err(reject(DigitError::InvalidInput(
        "Please upload an image file".to_string(),
    )))
}

fn reject(err: DigitError) -> HandlerError {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(ErrorResponse {
            detail: err.to_string(),
        }),
    )
}
