//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failures detected at the HTTP boundary, before ingestion starts.
#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("request body too large")]
  PayloadTooLarge,
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      // 403 rather than 401 keeps browsers from showing their login dialog.
      Error::Unauthorized => (
        StatusCode::FORBIDDEN,
        Json(json!({ "message": "Unauthorized access" })),
      )
        .into_response(),
      Error::BadRequest(msg) => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "code": 400, "error": msg })),
      )
        .into_response(),
      Error::PayloadTooLarge => (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(json!({ "code": 413, "error": "request body too large" })),
      )
        .into_response(),
    }
  }
}
