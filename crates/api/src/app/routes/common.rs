use axum::{Json, extract::rejection::JsonRejection};

use crate::app::errors::{ApiError, ApiResult};

/// Unwrap a JSON body, turning a rejection into a 400 `{"error": ..}`.
///
/// Handlers take the body as `Result<Json<T>, _>` so the role gate runs
/// before the payload is inspected.
pub fn body_or_400<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(inner)| inner)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}
