use crate::error::{EmailTakenSnafu, InvalidStoredValueSnafu, MakeQuerySnafu, SatchelError, SatchelResult};
use async_trait::async_trait;
use axum_login::AuthUser;
use email_address::EmailAddress;
use secrecy::{ExposeSecret, SecretString};
use snafu::{OptionExt, ResultExt, ensure};
use sqlx::{FromRow, Pool, Postgres};
use std::{collections::HashMap, fmt::Debug, str::FromStr};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Someone who can sign in and change student records.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: EmailAddress,
    pub display_name: String,
    pub bcrypt_hashed_password: SecretString,
    pub created_at: OffsetDateTime,
}

pub struct NewUser {
    pub email: EmailAddress,
    pub display_name: String,
    pub bcrypt_hashed_password: String,
}

impl AuthUser for User {
    type Id = Uuid;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        self.bcrypt_hashed_password.expose_secret().as_bytes()
    }
}

#[async_trait]
pub trait UserStore: Debug + Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> SatchelResult<Option<User>>;
    async fn get_by_email(&self, email: &str) -> SatchelResult<Option<User>>;
    ///fails with `EmailTaken` if someone already has that email
    async fn insert(&self, new_user: NewUser) -> SatchelResult<User>;
    ///inserts only while there are no accounts at all, checked and written as one step
    ///
    ///`Ok(None)` if some account already exists
    async fn insert_first(&self, new_user: NewUser) -> SatchelResult<Option<User>>;
    async fn any_exist(&self) -> SatchelResult<bool>;
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    display_name: String,
    bcrypt_hashed_password: String,
    created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = SatchelError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = EmailAddress::from_str(&row.email)
            .ok()
            .context(InvalidStoredValueSnafu {
                column: "email",
                value: row.email.as_str(),
            })?;

        Ok(Self {
            id: row.id,
            email,
            display_name: row.display_name,
            bcrypt_hashed_password: SecretString::from(row.bcrypt_hashed_password),
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, display_name, bcrypt_hashed_password, created_at";

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: Pool<Postgres>,
}

impl PgUserStore {
    pub const fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_id(&self, id: Uuid) -> SatchelResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM public.users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context(MakeQuerySnafu)?
        .map(User::try_from)
        .transpose()
    }

    async fn get_by_email(&self, email: &str) -> SatchelResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM public.users WHERE lower(email) = lower($1)"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .context(MakeQuerySnafu)?
        .map(User::try_from)
        .transpose()
    }

    async fn insert(&self, new_user: NewUser) -> SatchelResult<User> {
        let NewUser {
            email,
            display_name,
            bcrypt_hashed_password,
        } = new_user;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO public.users (email, display_name, bcrypt_hashed_password) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING {USER_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(&display_name)
        .bind(&bcrypt_hashed_password)
        .fetch_optional(&self.pool)
        .await
        .context(MakeQuerySnafu)?;

        match row {
            Some(row) => row.try_into(),
            None => EmailTakenSnafu {
                email: email.as_str(),
            }
            .fail(),
        }
    }

    async fn insert_first(&self, new_user: NewUser) -> SatchelResult<Option<User>> {
        let NewUser {
            email,
            display_name,
            bcrypt_hashed_password,
        } = new_user;

        let mut transaction = self.pool.begin().await.context(MakeQuerySnafu)?;
        //readers still get through, but a second onboarding waits here until we commit
        sqlx::query("LOCK TABLE public.users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *transaction)
            .await
            .context(MakeQuerySnafu)?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO public.users (email, display_name, bcrypt_hashed_password) SELECT $1, $2, $3 WHERE NOT EXISTS (SELECT 1 FROM public.users) RETURNING {USER_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(&display_name)
        .bind(&bcrypt_hashed_password)
        .fetch_optional(&mut *transaction)
        .await
        .context(MakeQuerySnafu)?;

        transaction.commit().await.context(MakeQuerySnafu)?;
        row.map(User::try_from).transpose()
    }

    async fn any_exist(&self) -> SatchelResult<bool> {
        let (exists,): (bool,) = sqlx::query_as("SELECT exists(SELECT 1 FROM public.users)")
            .fetch_one(&self.pool)
            .await
            .context(MakeQuerySnafu)?;
        Ok(exists)
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_id(&self, id: Uuid) -> SatchelResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> SatchelResult<Option<User>> {
        let email = email.trim();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email.as_str().eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert(&self, new_user: NewUser) -> SatchelResult<User> {
        let mut users = self.users.write().await;
        Self::insert_into(&mut users, new_user)
    }

    async fn insert_first(&self, new_user: NewUser) -> SatchelResult<Option<User>> {
        let mut users = self.users.write().await;
        if !users.is_empty() {
            return Ok(None);
        }
        Self::insert_into(&mut users, new_user).map(Some)
    }

    async fn any_exist(&self) -> SatchelResult<bool> {
        Ok(!self.users.read().await.is_empty())
    }
}

impl MemoryUserStore {
    fn insert_into(users: &mut HashMap<Uuid, User>, new_user: NewUser) -> SatchelResult<User> {
        ensure!(
            !users
                .values()
                .any(|user| user.email.as_str().eq_ignore_ascii_case(new_user.email.as_str())),
            EmailTakenSnafu {
                email: new_user.email.as_str()
            }
        );

        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            display_name: new_user.display_name,
            bcrypt_hashed_password: SecretString::from(new_user.bcrypt_hashed_password),
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}
