//! SQLite backend for the datasink measurement store.
//!
//! Each logical database is a separate SQLite file. Connections are opened
//! per request through [`tokio_rusqlite`] so all database access runs on a
//! dedicated thread without blocking the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use encode::StoredRow;
pub use error::{Error, Result};
pub use store::SqliteStore;
