use crate::{
    data::user::User,
    error::{BcryptSnafu, JoinBlockingSnafu, SatchelError},
    state::SatchelState,
};
use async_trait::async_trait;
use axum_login::{AuthnBackend, UserId};
use secrecy::{ExposeSecret, SecretString};
use snafu::ResultExt;

#[derive(Clone, Debug)]
pub struct SatchelAuthBackend {
    state: SatchelState,
}

impl SatchelAuthBackend {
    pub const fn new(state: SatchelState) -> Self {
        Self { state }
    }
}

pub enum SatchelAuthCredentials {
    EmailPassword {
        email: String,
        password: SecretString,
    },
}

#[async_trait]
impl AuthnBackend for SatchelAuthBackend {
    type User = User;
    type Credentials = SatchelAuthCredentials;
    type Error = SatchelError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        match creds {
            SatchelAuthCredentials::EmailPassword { email, password } => {
                let Some(user) = self.state.users().get_by_email(&email).await? else {
                    return Ok(None);
                };
                let hash = user.bcrypt_hashed_password.clone();

                let password_verification_result = tokio::task::spawn_blocking(move || {
                    bcrypt::verify(password.expose_secret(), hash.expose_secret())
                })
                .await
                .context(JoinBlockingSnafu)?
                .context(BcryptSnafu)?;

                Ok(password_verification_result.then_some(user))
            }
        }
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        self.state.users().get_by_id(*user_id).await
    }
}
