//! The `MeasurementStore` trait.
//!
//! Implemented by storage backends (e.g. `datasink-store-sqlite`). The server
//! depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::element::MeasurementTree;

/// What a successful [`MeasurementStore::persist`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persisted {
  /// Rows inserted; one per non-wrapper element.
  pub rows:    usize,
  /// Generated id of the root row, `None` when the root is a wrapper.
  pub root_id: Option<i64>,
}

/// Errors a store can report from [`MeasurementStore::persist`].
pub trait PersistError: std::error::Error + Send + Sync + 'static {
  /// `true` when the tree itself cannot be stored (missing source,
  /// unrepresentable timestamp) and retrying would not help.
  fn is_rejection(&self) -> bool { false }
}

/// Abstraction over a relational measurement store.
pub trait MeasurementStore: Send + Sync {
  type Error: PersistError;

  /// Write every non-wrapper element of `tree` into `database` inside a
  /// single transaction.
  ///
  /// Elements are inserted in pre-order. Each row's `parent` is the id of
  /// the nearest stored ancestor, so children of a wrapper attach to the
  /// wrapper's own parent. Either the whole tree is committed or nothing is.
  fn persist<'a>(
    &'a self,
    database: &'a str,
    tree: &'a MeasurementTree,
  ) -> impl Future<Output = Result<Persisted, Self::Error>> + Send + 'a;
}
