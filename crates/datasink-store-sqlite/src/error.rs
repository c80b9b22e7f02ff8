//! Error type for `datasink-store-sqlite`.

use datasink_core::PersistError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Database names become file names, so only `[A-Za-z0-9_-]` is allowed.
  #[error("invalid database name: {0:?}")]
  InvalidDatabaseName(String),

  #[error("database does not exist: {0}")]
  DatabaseNotFound(String),

  #[error("measurement has no source")]
  MissingSource,

  #[error("timestamp out of range: {0}")]
  TimestampOutOfRange(f64),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl PersistError for Error {
  fn is_rejection(&self) -> bool {
    matches!(self, Self::MissingSource | Self::TimestampOutOfRange(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
