//! `datasink`, the measurement sink server.
//!
//! Configuration comes from an optional TOML file (`--config`, default
//! `config.toml`) overlaid with `DATASINK_*` environment variables, e.g.
//! `DATASINK_PORT=8080`. The only required setting is
//! `auth_password_hash`; produce one with:
//!
//! ```text
//! datasink --hash-password
//! ```

use std::{
  io::{self, BufRead as _, Write as _},
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use datasink_server::{AppState, ServerConfig};
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Measurement ingestion sink")]
struct Cli {
  /// TOML configuration file; missing is fine if the environment is enough.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Log at debug level, including every received body.
  #[arg(short, long)]
  debug: bool,

  /// Read a password from stdin, print its argon2 hash and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.debug);

  if cli.hash_password {
    println!("{}", hash_password(&prompt_password()?)?);
    return Ok(());
  }

  let config = load_config(&cli.config)?;
  serve(config).await
}

fn init_tracing(debug: bool) {
  let level = if debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy(),
    )
    .init();
}

fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let mut config: ServerConfig = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("DATASINK"))
    .build()
    .with_context(|| format!("failed to read configuration from {}", path.display()))?
    .try_deserialize()
    .context("invalid configuration")?;

  config.data_dir = expand_home(&config.data_dir);
  Ok(config)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
  let store = config.store();
  tracing::info!(
    data_dir = %config.data_dir.display(),
    create_databases = config.create_databases,
    busy_timeout_ms = config.busy_timeout_ms,
    "using sqlite store"
  );

  let address = format!("{}:{}", config.host, config.port);
  let state = AppState {
    store:  Arc::new(store),
    auth:   Arc::new(config.auth()),
    config: Arc::new(config),
  };

  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!("listening on http://{address}");

  axum::serve(listener, datasink_server::router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("server stopped");
  Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!(error = %e, "failed to listen for ctrl-c");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut signal) => {
        signal.recv().await;
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
  tracing::info!("shutdown requested");
}

fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
  Ok(hash.to_string())
}

fn prompt_password() -> anyhow::Result<String> {
  eprint!("Password: ");
  io::stderr().flush()?;
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

/// Resolve a leading `~/` against `$HOME`.
fn expand_home(path: &Path) -> PathBuf {
  match (path.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}
