//! HTTP Basic authentication for the sink routes.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use datasink_core::MeasurementStore;

use crate::{AppState, error::Error};

/// The single account allowed to submit measurements.
#[derive(Debug, Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// argon2 PHC string, as printed by `datasink --hash-password`.
  pub password_hash: String,
}

impl AuthConfig {
  /// `true` when `username` matches and `password` verifies against the
  /// stored hash. An unparseable hash never verifies.
  pub fn accepts(&self, username: &str, password: &str) -> bool {
    if username != self.username {
      return false;
    }
    PasswordHash::new(&self.password_hash).is_ok_and(|hash| {
      Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
    })
  }
}

/// Extractor proving the request carried valid credentials.
pub struct Authenticated;

/// Pull `(username, password)` out of an `Authorization: Basic` header.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let encoded = headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Basic ")?;
  let decoded = String::from_utf8(B64.decode(encoded.trim()).ok()?).ok()?;
  let (username, password) = decoded.split_once(':')?;
  Some((username.to_owned(), password.to_owned()))
}

/// Check the request headers against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  match basic_credentials(headers) {
    Some((username, password)) if config.accepts(&username, &password) => Ok(()),
    _ => Err(Error::Unauthorized),
  }
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: MeasurementStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, &state.auth).inspect_err(|_| {
      tracing::warn!(method = %parts.method, uri = %parts.uri, "rejected credentials")
    })?;
    Ok(Authenticated)
  }
}
