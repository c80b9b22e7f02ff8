//! Encoding and decoding helpers between measurement elements and the
//! column values stored in SQLite.
//!
//! Timestamps are stored as UTC text with microsecond precision
//! (`YYYY-MM-DD HH:MM:SS.ffffff`); absent timestamps are NULL.

use chrono::{DateTime, NaiveDateTime, Utc};
use datasink_core::MeasurementTree;

use crate::{Error, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// ─── Timestamps ──────────────────────────────────────────────────────────────

/// Seconds since the Unix epoch → UTC column text.
pub fn encode_timestamp(secs: f64) -> Result<String> {
  let micros = (secs * 1_000_000.0).round();
  if !micros.is_finite() {
    return Err(Error::TimestampOutOfRange(secs));
  }
  DateTime::<Utc>::from_timestamp_micros(micros as i64)
    .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
    .ok_or(Error::TimestampOutOfRange(secs))
}

pub fn decode_timestamp(s: &str) -> Result<f64> {
  NaiveDateTime::parse_from_str(s, TIMESTAMP_PARSE_FORMAT)
    .map(|dt| dt.and_utc().timestamp_micros() as f64 / 1_000_000.0)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn encode_opt_timestamp(secs: Option<f64>) -> Result<Option<String>> {
  secs.map(encode_timestamp).transpose()
}

fn decode_opt_timestamp(s: Option<String>) -> Result<Option<f64>> {
  s.as_deref().map(decode_timestamp).transpose()
}

// ─── Insert plan ─────────────────────────────────────────────────────────────

/// A row ready to insert. `parent` points at an earlier entry of the same
/// plan, whose generated id is only known once it has been inserted.
#[derive(Debug, Clone)]
pub struct PendingRow {
  pub parent:           Option<usize>,
  pub guid:             String,
  pub arrival:          Option<String>,
  pub production_start: Option<String>,
  pub production_end:   Option<String>,
  pub kind:             String,
  pub value:            Option<f64>,
}

/// Flatten `tree` into the rows to insert, in pre-order.
///
/// Wrappers produce no row; anything below a wrapper points at the wrapper's
/// own nearest stored ancestor instead.
pub fn plan_rows(tree: &MeasurementTree) -> Result<Vec<PendingRow>> {
  tree.require_source().map_err(|_| Error::MissingSource)?;

  // Per element: plan index of the nearest stored element at or above it.
  let mut anchors: Vec<Option<usize>> = Vec::with_capacity(tree.element_count());
  let mut plan = Vec::with_capacity(tree.typed_count());

  for (_, element) in tree.iter() {
    let parent = element.parent().and_then(|p| anchors[p.index()]);

    let Some(kind) = &element.kind else {
      anchors.push(parent);
      continue;
    };

    plan.push(PendingRow {
      parent,
      guid: element.source.clone().ok_or(Error::MissingSource)?,
      arrival: encode_opt_timestamp(element.arrival)?,
      production_start: encode_opt_timestamp(element.production_start)?,
      production_end: encode_opt_timestamp(element.production_end)?,
      kind: kind.clone(),
      value: element.value,
    });
    anchors.push(Some(plan.len() - 1));
  }

  Ok(plan)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A `data` row read back from the store, timestamps in epoch seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
  pub id:               i64,
  pub parent:           Option<i64>,
  pub guid:             String,
  pub arrival:          Option<f64>,
  pub production_start: Option<f64>,
  pub production_end:   Option<f64>,
  pub kind:             Option<String>,
  pub value:            Option<f64>,
}

/// Raw column values read directly from a `data` row.
pub struct RawRow {
  pub id:               i64,
  pub parent:           Option<i64>,
  pub guid:             String,
  pub arrival:          Option<String>,
  pub production_start: Option<String>,
  pub production_end:   Option<String>,
  pub kind:             Option<String>,
  pub value:            Option<f64>,
}

impl RawRow {
  pub fn into_stored(self) -> Result<StoredRow> {
    Ok(StoredRow {
      id:               self.id,
      parent:           self.parent,
      guid:             self.guid,
      arrival:          decode_opt_timestamp(self.arrival)?,
      production_start: decode_opt_timestamp(self.production_start)?,
      production_end:   decode_opt_timestamp(self.production_end)?,
      kind:             self.kind,
      value:            self.value,
    })
  }
}
