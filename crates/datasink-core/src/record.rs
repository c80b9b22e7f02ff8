//! Raw input records: the wire shape of a measurement report.
//!
//! Every field is optional. A record either carries a single measurement
//! inline (`value`, `timestamp_production`, `duration_production`) or groups
//! nested records under `values`, or both. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Deepest record nesting accepted from clients, counting the root as 1.
///
/// Keeps every accepted body well inside `serde_json`'s own recursion limit,
/// which counts each record's object and its `values` array separately.
pub const MAX_DEPTH: usize = 50;

/// The `value` field: a single scalar, or an evenly-spaced series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
  Scalar(f64),
  /// Each entry becomes one child covering an equal slice of the record's
  /// production interval.
  Series(Vec<Option<f64>>),
}

/// One record as submitted by a device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
  pub source:               Option<String>,
  #[serde(rename = "type")]
  pub kind:                 Option<String>,
  pub value:                Option<RawValue>,
  /// Start of the production interval, seconds since the Unix epoch.
  pub timestamp_production: Option<f64>,
  /// Length of the production interval in seconds.
  pub duration_production:  Option<f64>,
  /// When the record reached the system, seconds since the Unix epoch.
  pub timestamp_arrival:    Option<f64>,
  pub values:               Option<Vec<RawRecord>>,
}

impl RawRecord {
  /// A record with only `source` and `type` set.
  pub fn new(source: impl Into<String>, kind: impl Into<String>) -> Self {
    Self {
      source: Some(source.into()),
      kind: Some(kind.into()),
      ..Self::default()
    }
  }

  /// Levels of records from this one down to its deepest descendant.
  pub fn depth(&self) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(self, 1)];
    while let Some((record, depth)) = pending.pop() {
      deepest = deepest.max(depth);
      for child in record.values.iter().flatten() {
        pending.push((child, depth + 1));
      }
    }
    deepest
  }
}

/// A request body: either one record or a list of top-level siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawInput {
  One(RawRecord),
  Many(Vec<RawRecord>),
}

impl RawInput {
  /// Decode an already-parsed JSON document.
  pub fn from_value(value: serde_json::Value) -> Result<Self> {
    Ok(serde_json::from_value(value)?)
  }

  pub fn into_records(self) -> Vec<RawRecord> {
    match self {
      Self::One(record) => vec![record],
      Self::Many(records) => records,
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn missing_and_null_fields_are_absent() {
    let record: RawRecord = serde_json::from_value(json!({
      "source": "0011223344556677",
      "type":   null,
      "value":  null,
    }))
    .unwrap();

    assert_eq!(record.source.as_deref(), Some("0011223344556677"));
    assert_eq!(record.kind, None);
    assert_eq!(record.value, None);
    assert_eq!(record.values, None);
  }

  #[test]
  fn value_accepts_scalar_and_series() {
    let scalar: RawRecord = serde_json::from_value(json!({ "value": 0.5 })).unwrap();
    assert_eq!(scalar.value, Some(RawValue::Scalar(0.5)));

    let series: RawRecord =
      serde_json::from_value(json!({ "value": [1.0, null, 3] })).unwrap();
    assert_eq!(
      series.value,
      Some(RawValue::Series(vec![Some(1.0), None, Some(3.0)]))
    );
  }

  #[test]
  fn unknown_fields_are_ignored() {
    let record: RawRecord =
      serde_json::from_value(json!({ "source": "a", "period": 100 })).unwrap();
    assert_eq!(record.source.as_deref(), Some("a"));
  }

  #[test]
  fn input_object_or_array() {
    let one = RawInput::from_value(json!({ "source": "a" })).unwrap();
    assert_eq!(one.into_records().len(), 1);

    let many =
      RawInput::from_value(json!([{ "source": "a" }, { "source": "b" }])).unwrap();
    let records = many.into_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].source.as_deref(), Some("b"));
  }

  #[test]
  fn depth_counts_the_deepest_branch() {
    let record: RawRecord = serde_json::from_value(json!({
      "source": "a",
      "values": [
        { "value": 1.0 },
        { "values": [{ "values": [{ "value": 2.0 }] }] },
      ],
    }))
    .unwrap();

    assert_eq!(RawRecord::new("a", "t").depth(), 1);
    assert_eq!(record.depth(), 4);
  }

  #[test]
  fn wrong_shape_is_rejected() {
    assert!(RawInput::from_value(json!(42)).is_err());
    assert!(RawInput::from_value(json!({ "source": 7 })).is_err());
  }
}
