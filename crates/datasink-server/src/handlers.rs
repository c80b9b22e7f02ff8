//! Sink handlers: a GET hint and the POST ingestion endpoint.

use axum::{
  Json,
  extract::{Path, State, rejection::BytesRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use datasink_core::{MAX_DEPTH, MeasurementStore, Outcome, RawInput, RawRecord};
use serde_json::{Value, json};
use tracing::Instrument as _;

use crate::{AppState, auth::Authenticated, error::Error};

pub async fn info<S>(_auth: Authenticated, State(_): State<AppState<S>>) -> Response
where
  S: MeasurementStore + Clone + 'static,
{
  Json(json!({ "message": "Just POST something..." })).into_response()
}

pub async fn ingest<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Path(database): Path<String>,
  body: Result<Bytes, BytesRejection>,
) -> Result<Response, Error>
where
  S: MeasurementStore + Clone + 'static,
{
  let request_id = uuid::Uuid::new_v4();
  let span = tracing::info_span!("ingest", %request_id, database = %database);

  async move {
    let body = body.map_err(body_error)?;
    let request = decode_body(&body)?;
    let shown = request.as_ref().unwrap_or(&Value::Null);
    tracing::debug!(body = %shown, "received");

    let records = match &request {
      None | Some(Value::Null) => Vec::new(),
      Some(value) => RawInput::from_value(value.clone())
        .map_err(|e| Error::BadRequest(e.to_string()))?
        .into_records(),
    };
    check_depth(&records)?;

    let outcome =
      datasink_core::ingest(state.store.as_ref(), &database, &records).await;
    Ok(outcome_response(outcome, request))
  }
  .instrument(span)
  .await
}

/// Only an exceeded body limit is a 413; any other read failure is the
/// client's.
fn body_error(rejection: BytesRejection) -> Error {
  if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
    Error::PayloadTooLarge
  } else {
    Error::BadRequest(rejection.body_text())
  }
}

fn check_depth(records: &[RawRecord]) -> Result<(), Error> {
  match records.iter().map(RawRecord::depth).max() {
    Some(depth) if depth > MAX_DEPTH => Err(Error::BadRequest(format!(
      "records nested {depth} levels deep, at most {MAX_DEPTH} allowed"
    ))),
    _ => Ok(()),
  }
}

/// Parse the body as JSON. A blank body is `None` rather than an error.
fn decode_body(body: &[u8]) -> Result<Option<Value>, Error> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return Ok(None);
  }
  serde_json::from_slice(body)
    .map(Some)
    .map_err(|e| Error::BadRequest(e.to_string()))
}

fn outcome_status(outcome: Outcome) -> StatusCode {
  match outcome {
    Outcome::Created => StatusCode::CREATED,
    Outcome::MissingInput | Outcome::RejectedInput => StatusCode::NOT_ACCEPTABLE,
    Outcome::StorageFailure => StatusCode::SERVICE_UNAVAILABLE,
  }
}

fn outcome_response(outcome: Outcome, request: Option<Value>) -> Response {
  let status = outcome_status(outcome);
  let body = if outcome.is_success() {
    json!({ "code": status.as_u16() })
  } else {
    json!({ "code": status.as_u16(), "request": request.unwrap_or(Value::Null) })
  };
  (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_bodies_decode_to_none() {
    assert_eq!(decode_body(b"").unwrap(), None);
    assert_eq!(decode_body(b"  \r\n").unwrap(), None);
    assert_eq!(decode_body(b"null").unwrap(), Some(Value::Null));
  }

  #[test]
  fn invalid_json_is_a_bad_request() {
    assert!(matches!(decode_body(b"{"), Err(Error::BadRequest(_))));
  }

  #[test]
  fn depth_is_checked_across_all_top_level_records() {
    let shallow = RawRecord::new("a", "t");
    let mut deep = RawRecord::new("b", "t");
    for _ in 1..=MAX_DEPTH {
      deep = RawRecord { values: Some(vec![deep]), ..RawRecord::default() };
    }

    assert!(check_depth(&[shallow.clone()]).is_ok());
    assert!(matches!(
      check_depth(&[shallow, deep]),
      Err(Error::BadRequest(msg)) if msg.contains("51 levels")
    ));
  }

  #[test]
  fn outcomes_map_to_statuses() {
    assert_eq!(outcome_status(Outcome::Created), StatusCode::CREATED);
    assert_eq!(outcome_status(Outcome::MissingInput), StatusCode::NOT_ACCEPTABLE);
    assert_eq!(outcome_status(Outcome::RejectedInput), StatusCode::NOT_ACCEPTABLE);
    assert_eq!(
      outcome_status(Outcome::StorageFailure),
      StatusCode::SERVICE_UNAVAILABLE
    );
  }
}
