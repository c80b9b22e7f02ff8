//! HTTP surface for the datasink.
//!
//! Exposes an axum [`Router`] accepting measurement reports at
//! `/api/v0/sink/{database}`, backed by any [`MeasurementStore`]. TLS is the
//! caller's responsibility.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use datasink_core::MeasurementStore;
use datasink_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `DATASINK_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  /// Directory holding one SQLite file per logical database.
  #[serde(default = "default_data_dir")]
  pub data_dir:           PathBuf,
  /// Create a database file on the first write to it.
  #[serde(default = "default_create_databases")]
  pub create_databases:   bool,
  /// How long a write waits on another writer to the same database.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms:    u64,
  #[serde(default = "default_max_body_bytes")]
  pub max_body_bytes:     usize,
  #[serde(default = "default_auth_username")]
  pub auth_username:      String,
  pub auth_password_hash: String,
}

fn default_host() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 54320 }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_create_databases() -> bool { true }
fn default_busy_timeout_ms() -> u64 { 5000 }
fn default_max_body_bytes() -> usize { 1024 * 1024 }
fn default_auth_username() -> String { "user".to_owned() }

impl ServerConfig {
  /// Defaults for everything except the data directory and password hash.
  pub fn new(data_dir: impl Into<PathBuf>, auth_password_hash: impl Into<String>) -> Self {
    Self {
      host:               default_host(),
      port:               default_port(),
      data_dir:           data_dir.into(),
      create_databases:   default_create_databases(),
      busy_timeout_ms:    default_busy_timeout_ms(),
      max_body_bytes:     default_max_body_bytes(),
      auth_username:      default_auth_username(),
      auth_password_hash: auth_password_hash.into(),
    }
  }

  /// The store described by `data_dir`, `create_databases` and
  /// `busy_timeout_ms`.
  pub fn store(&self) -> SqliteStore {
    SqliteStore::new(&self.data_dir)
      .create_databases(self.create_databases)
      .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
  }

  pub fn auth(&self) -> AuthConfig {
    AuthConfig {
      username:      self.auth_username.clone(),
      password_hash: self.auth_password_hash.clone(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: MeasurementStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the sink.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: MeasurementStore + Clone + 'static,
{
  let body_limit = state.config.max_body_bytes;
  Router::new()
    .route(
      "/api/v0/sink/{database}",
      get(handlers::info::<S>).post(handlers::ingest::<S>),
    )
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
