use crate::error::{MakeQuerySnafu, RmpSerdeEncodeSnafu, SatchelError};
use async_trait::async_trait;
use axum_login::tower_sessions::{
    ExpiredDeletion, SessionStore,
    session::{Id, Record},
    session_store::Error as SSError,
};
use snafu::ResultExt;
use sqlx::{FromRow, PgConnection, Pool, Postgres};
use time::OffsetDateTime;

/// Sessions kept in the `sessions` table, with the data as MessagePack.
#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    pool: Pool<Postgres>,
}

#[derive(FromRow)]
struct SessionRow {
    data: Vec<u8>,
    expiry_date: OffsetDateTime,
}

impl PostgresSessionStore {
    pub const fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn id_exists(id: Id, conn: &mut PgConnection) -> Result<bool, SatchelError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM sessions WHERE id = $1)")
                .bind(id.to_string())
                .fetch_one(conn)
                .await
                .context(MakeQuerySnafu)?;
        Ok(exists)
    }

    async fn save_session(record: &Record, conn: &mut PgConnection) -> Result<(), SatchelError> {
        let serialised_data = rmp_serde::to_vec(&record.data).context(RmpSerdeEncodeSnafu)?;

        sqlx::query("INSERT INTO sessions VALUES ($1, $2, $3) ON CONFLICT (id) DO UPDATE SET data = excluded.data, expiry_date = excluded.expiry_date")
            .bind(record.id.to_string())
            .bind(serialised_data)
            .bind(record.expiry_date)
            .execute(conn)
            .await
            .context(MakeQuerySnafu)?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, session_record: &mut Record) -> Result<(), SSError> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|e| SSError::Backend(e.to_string()))?;

        while Self::id_exists(session_record.id, &mut transaction)
            .await
            .map_err(|e| SSError::Backend(e.to_string()))?
        {
            session_record.id = Id::default();
        }

        Self::save_session(session_record, &mut transaction)
            .await
            .map_err(|e| SSError::Encode(e.to_string()))?;

        transaction
            .commit()
            .await
            .map_err(|e| SSError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn save(&self, session_record: &Record) -> Result<(), SSError> {
        let mut connection = self
            .pool
            .acquire()
            .await
            .map_err(|e| SSError::Backend(e.to_string()))?;

        Self::save_session(session_record, &mut connection)
            .await
            .map_err(|e| SSError::Encode(e.to_string()))?;

        Ok(())
    }

    async fn load(&self, session_id: &Id) -> Result<Option<Record>, SSError> {
        let Some(sql_record) = sqlx::query_as::<_, SessionRow>(
            "SELECT data, expiry_date FROM sessions WHERE id = $1 AND expiry_date > now()",
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context(MakeQuerySnafu)
        .map_err(|e| SSError::Backend(e.to_string()))?
        else {
            return Ok(None);
        };

        let data =
            rmp_serde::from_slice(&sql_record.data).map_err(|e| SSError::Decode(e.to_string()))?;

        Ok(Some(Record {
            id: *session_id,
            data,
            expiry_date: sql_record.expiry_date,
        }))
    }

    async fn delete(&self, session_id: &Id) -> Result<(), SSError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await
            .context(MakeQuerySnafu)
            .map_err(|e| SSError::Backend(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for PostgresSessionStore {
    async fn delete_expired(&self) -> Result<(), SSError> {
        sqlx::query("DELETE FROM sessions WHERE expiry_date < now()")
            .execute(&self.pool)
            .await
            .context(MakeQuerySnafu)
            .map_err(|e| SSError::Backend(e.to_string()))?;
        Ok(())
    }
}
