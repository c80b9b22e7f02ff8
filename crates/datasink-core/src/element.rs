//! Normalized measurement elements and the tree that owns them.
//!
//! The tree is an arena: elements live in one `Vec` in pre-order (every
//! parent precedes its descendants) and refer to each other by
//! [`ElementId`]. The root is always the first element.

use crate::{Error, Result};

/// Position of an element inside its [`MeasurementTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
  pub const ROOT: ElementId = ElementId(0);

  pub fn index(self) -> usize { self.0 }
}

/// One measurement with every inheritable field already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementElement {
  pub source:           Option<String>,
  /// Classification tag. `None` marks a wrapper that is never stored.
  pub kind:             Option<String>,
  pub value:            Option<f64>,
  pub arrival:          Option<f64>,
  pub production_start: Option<f64>,
  pub production_end:   Option<f64>,
  pub(crate) parent:    Option<ElementId>,
  pub(crate) children:  Vec<ElementId>,
}

impl MeasurementElement {
  /// A wrapper only groups children; it has no row of its own.
  pub fn is_wrapper(&self) -> bool { self.kind.is_none() }

  pub fn parent(&self) -> Option<ElementId> { self.parent }

  /// Children in input order.
  pub fn children(&self) -> &[ElementId] { &self.children }
}

/// A normalized measurement report. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementTree {
  elements: Vec<MeasurementElement>,
}

impl MeasurementTree {
  pub(crate) fn from_elements(elements: Vec<MeasurementElement>) -> Self {
    debug_assert!(!elements.is_empty());
    Self { elements }
  }

  pub fn root(&self) -> &MeasurementElement { &self.elements[0] }

  pub fn get(&self, id: ElementId) -> Option<&MeasurementElement> {
    self.elements.get(id.0)
  }

  /// The root's source, which every descendant inherits unless it names its
  /// own.
  pub fn require_source(&self) -> Result<&str> {
    self.root().source.as_deref().ok_or(Error::MissingSource)
  }

  /// Direct children of `id`, in input order.
  pub fn children(
    &self,
    id: ElementId,
  ) -> impl Iterator<Item = &MeasurementElement> + '_ {
    self
      .get(id)
      .map(|e| e.children.as_slice())
      .unwrap_or_default()
      .iter()
      .map(|child| &self.elements[child.0])
  }

  /// All elements in pre-order.
  pub fn iter(&self) -> impl Iterator<Item = (ElementId, &MeasurementElement)> {
    self
      .elements
      .iter()
      .enumerate()
      .map(|(i, e)| (ElementId(i), e))
  }

  pub fn element_count(&self) -> usize { self.elements.len() }

  /// Number of rows a store writes for this tree.
  pub fn typed_count(&self) -> usize {
    self.elements.iter().filter(|e| !e.is_wrapper()).count()
  }
}
