//! Ingestion outcomes and the normalize → persist pipeline.

use serde::Serialize;

use crate::{
  element::MeasurementTree,
  normalize::normalize,
  record::RawRecord,
  store::{MeasurementStore, PersistError as _},
};

/// The result of ingesting one request, as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  /// The whole tree was committed.
  Created,
  /// A tree was built but cannot be stored, e.g. it has no source.
  RejectedInput,
  /// The store failed; nothing was committed and the request may be retried.
  StorageFailure,
  /// No data was supplied at all.
  MissingInput,
}

impl Outcome {
  pub fn is_success(self) -> bool { matches!(self, Self::Created) }
}

/// Normalize `records` and persist the result into `database`.
pub async fn ingest<S: MeasurementStore>(
  store: &S,
  database: &str,
  records: &[RawRecord],
) -> Outcome {
  match normalize(records) {
    Ok(tree) => persist(store, database, &tree).await,
    Err(e) => {
      tracing::warn!(database, error = %e, "nothing to ingest");
      Outcome::MissingInput
    }
  }
}

/// Persist an already-normalized tree, refusing trees without a source
/// before any connection is opened.
pub async fn persist<S: MeasurementStore>(
  store: &S,
  database: &str,
  tree: &MeasurementTree,
) -> Outcome {
  if let Err(e) = tree.require_source() {
    tracing::warn!(database, error = %e, "rejecting measurement");
    return Outcome::RejectedInput;
  }

  match store.persist(database, tree).await {
    Ok(persisted) => {
      tracing::info!(
        database,
        rows = persisted.rows,
        root_id = ?persisted.root_id,
        "stored measurement tree"
      );
      Outcome::Created
    }
    Err(e) if e.is_rejection() => {
      tracing::warn!(database, error = %e, "rejecting measurement");
      Outcome::RejectedInput
    }
    Err(e) => {
      tracing::error!(database, error = %e, "failed to store measurement tree");
      Outcome::StorageFailure
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use thiserror::Error;

  use super::*;
  use crate::store::{PersistError, Persisted};

  #[derive(Debug, Error)]
  enum FakeError {
    #[error("connection refused")]
    Unavailable,
    #[error("bad timestamp")]
    BadTimestamp,
  }

  impl PersistError for FakeError {
    fn is_rejection(&self) -> bool { matches!(self, Self::BadTimestamp) }
  }

  /// Records what it was asked to persist; optionally fails.
  #[derive(Default)]
  struct FakeStore {
    calls:     AtomicUsize,
    databases: Mutex<Vec<String>>,
    fail_with: Option<fn() -> FakeError>,
  }

  impl MeasurementStore for FakeStore {
    type Error = FakeError;

    async fn persist(
      &self,
      database: &str,
      tree: &MeasurementTree,
    ) -> Result<Persisted, FakeError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.databases.lock().unwrap().push(database.to_owned());
      match self.fail_with {
        Some(make) => Err(make()),
        None => Ok(Persisted { rows: tree.typed_count(), root_id: Some(1) }),
      }
    }
  }

  fn records() -> Vec<RawRecord> {
    let mut root = RawRecord::new("S1", "T");
    root.values = Some(vec![RawRecord::default(), RawRecord::default()]);
    vec![root]
  }

  #[tokio::test]
  async fn created_when_store_succeeds() {
    let store = FakeStore::default();
    assert_eq!(ingest(&store, "db", &records()).await, Outcome::Created);
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*store.databases.lock().unwrap(), vec!["db".to_owned()]);
  }

  #[tokio::test]
  async fn missing_input_never_reaches_the_store() {
    let store = FakeStore::default();
    assert_eq!(ingest(&store, "db", &[]).await, Outcome::MissingInput);
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn missing_source_is_rejected_before_the_store() {
    let store = FakeStore::default();
    let record = RawRecord { kind: Some("T".into()), ..RawRecord::default() };
    assert_eq!(ingest(&store, "db", &[record]).await, Outcome::RejectedInput);
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn store_errors_become_storage_failures() {
    let store = FakeStore {
      fail_with: Some(|| FakeError::Unavailable),
      ..FakeStore::default()
    };
    assert_eq!(ingest(&store, "db", &records()).await, Outcome::StorageFailure);
  }

  #[tokio::test]
  async fn store_rejections_are_reported_as_rejected_input() {
    let store = FakeStore {
      fail_with: Some(|| FakeError::BadTimestamp),
      ..FakeStore::default()
    };
    assert_eq!(ingest(&store, "db", &records()).await, Outcome::RejectedInput);
  }
}
