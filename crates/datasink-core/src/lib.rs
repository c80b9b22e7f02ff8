//! Core types for the datasink measurement ingestion service.
//!
//! Raw, loosely-structured measurement reports are turned into a
//! [`MeasurementTree`] by [`normalize`], then written out by any
//! [`MeasurementStore`] backend. The crate does no I/O of its own and has no
//! HTTP or database dependencies.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
#![allow(async_fn_in_trait)]

pub mod element;
pub mod error;
pub mod normalize;
pub mod outcome;
pub mod record;
pub mod store;

pub use element::{ElementId, MeasurementElement, MeasurementTree};
pub use error::{Error, Result};
pub use normalize::normalize;
pub use outcome::{Outcome, ingest, persist};
pub use record::{MAX_DEPTH, RawInput, RawRecord, RawValue};
pub use store::{MeasurementStore, PersistError, Persisted};
