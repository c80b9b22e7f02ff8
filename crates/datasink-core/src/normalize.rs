//! Turns raw records into a [`MeasurementTree`].
//!
//! Field resolution happens exactly once, top-down:
//!
//! | field | when absent on a record |
//! |-------|-------------------------|
//! | `source`, `type`, `timestamp_arrival` | copied from the parent element |
//! | `timestamp_production` | the parent's `production_start` |
//! | `duration_production` | `0`, never inherited |
//! | `value` | absent, never inherited |
//!
//! The production interval runs from `timestamp_production` for
//! `duration_production` seconds. Without a production timestamp anywhere on
//! the ancestor chain both interval ends stay absent.

use crate::{
  Error, Result,
  element::{ElementId, MeasurementElement, MeasurementTree},
  record::{RawRecord, RawValue},
};

/// Normalize a list of top-level records into a tree.
///
/// Only the first record becomes the root; any further top-level records are
/// dropped with a warning. Fails with [`Error::MissingInput`] when `records`
/// is empty.
pub fn normalize(records: &[RawRecord]) -> Result<MeasurementTree> {
  let (first, rest) = records.split_first().ok_or(Error::MissingInput)?;
  if !rest.is_empty() {
    tracing::warn!(
      dropped = rest.len(),
      "only the first top-level record is stored; dropping the rest"
    );
  }

  let mut builder = TreeBuilder::default();
  builder.push(first, None);
  Ok(MeasurementTree::from_elements(builder.elements))
}

// ─── Inheritance ─────────────────────────────────────────────────────────────

/// The fields a child may pick up from its parent.
#[derive(Debug, Clone, Default)]
struct Inherited {
  source:           Option<String>,
  kind:             Option<String>,
  arrival:          Option<f64>,
  production_start: Option<f64>,
}

impl Inherited {
  fn from_parent(parent: &MeasurementElement) -> Self {
    Self {
      source:           parent.source.clone(),
      kind:             parent.kind.clone(),
      arrival:          parent.arrival,
      production_start: parent.production_start,
    }
  }
}

/// `[start, start + duration]`, or nothing without a start.
fn interval(start: Option<f64>, duration: Option<f64>) -> (Option<f64>, Option<f64>) {
  match start {
    Some(start) => (Some(start), Some(start + duration.unwrap_or(0.0))),
    None => (None, None),
  }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct TreeBuilder {
  elements: Vec<MeasurementElement>,
}

impl TreeBuilder {
  fn push(&mut self, raw: &RawRecord, parent: Option<ElementId>) -> ElementId {
    let inherited = parent
      .map(|p| Inherited::from_parent(&self.elements[p.0]))
      .unwrap_or_default();

    let (production_start, production_end) = interval(
      raw.timestamp_production.or(inherited.production_start),
      raw.duration_production,
    );

    let value = match raw.value {
      Some(RawValue::Scalar(v)) => Some(v),
      _ => None,
    };

    let id = self.attach(
      MeasurementElement {
        source: raw.source.clone().or(inherited.source),
        kind: raw.kind.clone().or(inherited.kind),
        value,
        arrival: raw.timestamp_arrival.or(inherited.arrival),
        production_start,
        production_end,
        parent,
        children: Vec::new(),
      },
      parent,
    );

    for child in raw.values.iter().flatten() {
      self.push(child, Some(id));
    }

    if let Some(RawValue::Series(series)) = &raw.value {
      self.push_series(id, series, raw.duration_production.unwrap_or(0.0));
    }

    id
  }

  /// Split the interval of `parent` into one equal slice per series entry.
  fn push_series(&mut self, parent: ElementId, series: &[Option<f64>], duration: f64) {
    let inherited = Inherited::from_parent(&self.elements[parent.0]);
    let step = duration / series.len() as f64;
    if inherited.kind.is_none() && !series.is_empty() {
      tracing::warn!(
        samples = series.len(),
        "series has no type; its samples are wrappers and will not be stored"
      );
    }

    for (i, value) in series.iter().enumerate() {
      let (production_start, production_end) = interval(
        inherited.production_start.map(|start| start + i as f64 * step),
        Some(step),
      );
      self.attach(
        MeasurementElement {
          source: inherited.source.clone(),
          kind: inherited.kind.clone(),
          value: *value,
          arrival: inherited.arrival,
          production_start,
          production_end,
          parent: Some(parent),
          children: Vec::new(),
        },
        Some(parent),
      );
    }
  }

  fn attach(&mut self, element: MeasurementElement, parent: Option<ElementId>) -> ElementId {
    let id = ElementId(self.elements.len());
    self.elements.push(element);
    if let Some(parent) = parent {
      self.elements[parent.0].children.push(id);
    }
    id
  }
}
