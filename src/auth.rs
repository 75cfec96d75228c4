use crate::{
    auth::backend::SatchelAuthBackend,
    error::{BcryptSnafu, JoinBlockingSnafu, SatchelResult},
};
use axum_login::AuthSession;
use secrecy::{ExposeSecret, SecretString};
use snafu::ResultExt;

pub mod backend;
pub mod postgres_store;

pub type SatchelSession = AuthSession<SatchelAuthBackend>;

///bcrypt is deliberately slow, so keep it off the async workers
pub async fn hash_password(password: SecretString, cost: u32) -> SatchelResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password.expose_secret(), cost))
        .await
        .context(JoinBlockingSnafu)?
        .context(BcryptSnafu)
}

/// Only follow `next` if it stays on this site.
pub fn local_redirect_target(next: Option<&str>) -> &str {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') => {
            next
        }
        _ => "/",
    }
}
