//! Error types for `datasink-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Nothing was supplied to normalize.
  #[error("no measurement data supplied")]
  MissingInput,

  /// The root element has no `source`, neither explicit nor inherited.
  #[error("measurement has no source")]
  MissingSource,

  #[error("malformed measurement record: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
