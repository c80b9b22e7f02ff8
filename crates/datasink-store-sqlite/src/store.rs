//! [`SqliteStore`], the SQLite implementation of [`MeasurementStore`].

use std::{path::PathBuf, time::Duration};

use datasink_core::{MeasurementStore, MeasurementTree, Persisted};
use rusqlite::{OpenFlags, TransactionBehavior};

use crate::{
  Error, Result,
  encode::{PendingRow, RawRow, StoredRow, plan_rows},
  schema::{INSERT_ROW, SCHEMA},
};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A measurement store keeping one SQLite file per logical database under
/// `data_dir`.
///
/// Holds no open connections: every call opens its own and closes it before
/// returning. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct SqliteStore {
  data_dir:         PathBuf,
  create_databases: bool,
  busy_timeout:     Duration,
}

impl SqliteStore {
  /// A store rooted at `data_dir` that creates databases on first use.
  pub fn new(data_dir: impl Into<PathBuf>) -> Self {
    Self {
      data_dir:         data_dir.into(),
      create_databases: true,
      busy_timeout:     DEFAULT_BUSY_TIMEOUT,
    }
  }

  /// When `false`, writing to a database whose file does not exist fails
  /// instead of creating it.
  pub fn create_databases(mut self, create: bool) -> Self {
    self.create_databases = create;
    self
  }

  /// How long a writer waits for a competing transaction on the same file.
  pub fn busy_timeout(mut self, timeout: Duration) -> Self {
    self.busy_timeout = timeout;
    self
  }

  /// File backing the logical database `database`.
  pub fn database_path(&self, database: &str) -> Result<PathBuf> {
    validate_database_name(database)?;
    Ok(self.data_dir.join(format!("{database}.sqlite3")))
  }

  /// Open a connection to `database` and make sure the schema exists.
  async fn connect(&self, database: &str) -> Result<tokio_rusqlite::Connection> {
    let path = self.database_path(database)?;

    let flags = if self.create_databases {
      tokio::fs::create_dir_all(&self.data_dir).await?;
      OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
    } else {
      if !tokio::fs::try_exists(&path).await? {
        return Err(Error::DatabaseNotFound(database.to_owned()));
      }
      OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX
    };

    let conn = tokio_rusqlite::Connection::open_with_flags(&path, flags).await?;
    let busy_timeout = self.busy_timeout;
    conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;

    tracing::debug!(database, path = %path.display(), "opened database");
    Ok(conn)
  }

  /// Read back every row of `database` in id order.
  ///
  /// Meant for inspection and tests; this is not a query API.
  pub async fn rows(&self, database: &str) -> Result<Vec<StoredRow>> {
    let conn = self.connect(database).await?;

    let raws = conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, parent, guid, arrival, production_start, production_end, type, value
           FROM data ORDER BY id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawRow {
              id:               row.get(0)?,
              parent:           row.get(1)?,
              guid:             row.get(2)?,
              arrival:          row.get(3)?,
              production_start: row.get(4)?,
              production_end:   row.get(5)?,
              kind:             row.get(6)?,
              value:            row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await;

    close(conn, database).await;
    raws?.into_iter().map(RawRow::into_stored).collect()
  }
}

/// Close `conn`, logging rather than failing: the outcome of the work done on
/// it is already decided.
async fn close(conn: tokio_rusqlite::Connection, database: &str) {
  if let Err(e) = conn.close().await {
    tracing::warn!(database, error = %e, "failed to close database connection");
  }
}

fn validate_database_name(database: &str) -> Result<()> {
  let valid = !database.is_empty()
    && database.len() <= 64
    && database
      .bytes()
      .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
  if valid {
    Ok(())
  } else {
    Err(Error::InvalidDatabaseName(database.to_owned()))
  }
}

/// Insert `plan` in order inside one transaction and return the generated
/// ids, index-aligned with `plan`.
fn insert_plan(
  conn: &mut rusqlite::Connection,
  plan: &[PendingRow],
) -> rusqlite::Result<Vec<i64>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let mut ids: Vec<i64> = Vec::with_capacity(plan.len());
  {
    let mut stmt = tx.prepare_cached(INSERT_ROW)?;
    for row in plan {
      // Plans are in pre-order, so the parent's id is already known.
      let parent = row.parent.map(|slot| ids[slot]);
      let id = stmt.insert(rusqlite::params![
        parent,
        row.guid,
        row.arrival,
        row.production_start,
        row.production_end,
        row.kind,
        row.value,
      ])?;
      ids.push(id);
    }
  }
  // An early return above drops `tx`, which rolls the transaction back.
  tx.commit()?;
  Ok(ids)
}

// ─── MeasurementStore impl ───────────────────────────────────────────────────

impl MeasurementStore for SqliteStore {
  type Error = Error;

  async fn persist(&self, database: &str, tree: &MeasurementTree) -> Result<Persisted> {
    let plan = plan_rows(tree)?;
    let conn = self.connect(database).await?;

    let inserted = conn
      .call(move |conn| Ok(insert_plan(conn, &plan)?))
      .await;

    close(conn, database).await;
    let ids = inserted?;

    Ok(Persisted {
      rows:    ids.len(),
      root_id: if tree.root().is_wrapper() { None } else { ids.first().copied() },
    })
  }
}
