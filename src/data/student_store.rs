use crate::{
    data::student::{
        AcademicLevel, Choice, EnrolledStatus, Field, Gender, STUDENT_FIELDS, Student,
        StudentFields, StudentOrder,
    },
    error::{InvalidStoredValueSnafu, MakeQuerySnafu, SatchelError, SatchelResult},
};
use async_trait::async_trait;
use snafu::{OptionExt, ResultExt};
use sqlx::{
    FromRow, Pool, Postgres,
    postgres::PgArguments,
    query::QueryAs,
};
use std::{collections::HashMap, fmt::Debug, sync::LazyLock};
use time::{Date, Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait StudentStore: Debug + Send + Sync {
    ///assigns the id and both timestamps
    async fn create(&self, fields: StudentFields) -> SatchelResult<Student>;
    async fn get(&self, id: Uuid) -> SatchelResult<Option<Student>>;
    async fn list(&self, order: StudentOrder) -> SatchelResult<Vec<Student>>;
    ///replaces every field apart from `id` and `created_at`, and always advances `updated_at`
    ///
    ///`Ok(None)` if there was no student with that id
    async fn update(&self, id: Uuid, fields: StudentFields) -> SatchelResult<Option<Student>>;
    ///whether there was a student to delete
    async fn delete(&self, id: Uuid) -> SatchelResult<bool>;
    async fn count(&self) -> SatchelResult<u64>;
}

#[derive(FromRow)]
struct StudentRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    birth_date: Date,
    gender: String,
    current_academic_level: String,
    enrolled_status: String,
    photo: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

fn decode_choice<T: Choice>(column: &'static str, value: String) -> SatchelResult<T> {
    T::from_code(&value).context(InvalidStoredValueSnafu { column, value })
}

impl TryFrom<StudentRow> for Student {
    type Error = SatchelError;

    fn try_from(row: StudentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            birth_date: row.birth_date,
            gender: decode_choice::<Gender>(Field::Gender.name(), row.gender)?,
            current_academic_level: decode_choice::<AcademicLevel>(
                Field::CurrentAcademicLevel.name(),
                row.current_academic_level,
            )?,
            enrolled_status: decode_choice::<EnrolledStatus>(
                Field::EnrolledStatus.name(),
                row.enrolled_status,
            )?,
            photo: row.photo,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

static RETURNED_COLUMNS: LazyLock<String> = LazyLock::new(|| {
    let mut columns = vec!["id"];
    columns.extend(STUDENT_FIELDS.iter().map(|spec| spec.field.name()));
    columns.extend(["created_at", "updated_at"]);
    columns.join(", ")
});

static INSERT_QUERY: LazyLock<String> = LazyLock::new(|| {
    let columns = STUDENT_FIELDS
        .iter()
        .map(|spec| spec.field.name())
        .collect::<Vec<_>>();
    let placeholders = (1..=columns.len())
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>();

    format!(
        "INSERT INTO public.students ({}) VALUES ({}) RETURNING {}",
        columns.join(", "),
        placeholders.join(", "),
        *RETURNED_COLUMNS
    )
});

//$1 is the id, so the fields start from $2
static UPDATE_QUERY: LazyLock<String> = LazyLock::new(|| {
    let assignments = STUDENT_FIELDS
        .iter()
        .enumerate()
        .map(|(i, spec)| format!("{} = ${}", spec.field.name(), i + 2))
        .collect::<Vec<_>>();

    format!(
        "UPDATE public.students SET {}, updated_at = GREATEST(now(), updated_at + interval '1 microsecond') WHERE id = $1 RETURNING {}",
        assignments.join(", "),
        *RETURNED_COLUMNS
    )
});

type StudentQuery<'q> = QueryAs<'q, Postgres, StudentRow, PgArguments>;

///binds in `STUDENT_FIELDS` order, to line up with the generated queries
fn bind_fields<'q>(mut query: StudentQuery<'q>, fields: &'q StudentFields) -> StudentQuery<'q> {
    for spec in &STUDENT_FIELDS {
        query = match spec.field {
            Field::FirstName => query.bind(fields.first_name.as_str()),
            Field::LastName => query.bind(fields.last_name.as_str()),
            Field::BirthDate => query.bind(fields.birth_date),
            Field::Gender => query.bind(fields.gender.code()),
            Field::CurrentAcademicLevel => query.bind(fields.current_academic_level.code()),
            Field::EnrolledStatus => query.bind(fields.enrolled_status.code()),
            Field::Photo => query.bind(fields.photo.as_deref()),
        };
    }
    query
}

#[derive(Debug, Clone)]
pub struct PgStudentStore {
    pool: Pool<Postgres>,
}

impl PgStudentStore {
    pub const fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentStore for PgStudentStore {
    async fn create(&self, fields: StudentFields) -> SatchelResult<Student> {
        bind_fields(sqlx::query_as(INSERT_QUERY.as_str()), &fields)
            .fetch_one(&self.pool)
            .await
            .context(MakeQuerySnafu)?
            .try_into()
    }

    async fn get(&self, id: Uuid) -> SatchelResult<Option<Student>> {
        let query = format!(
            "SELECT {} FROM public.students WHERE id = $1",
            *RETURNED_COLUMNS
        );
        sqlx::query_as::<_, StudentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context(MakeQuerySnafu)?
            .map(Student::try_from)
            .transpose()
    }

    async fn list(&self, order: StudentOrder) -> SatchelResult<Vec<Student>> {
        let order_by = match order {
            StudentOrder::NewestFirst => "created_at DESC, id DESC",
            StudentOrder::OldestFirst => "created_at ASC, id ASC",
            StudentOrder::LastName => {
                "lower(last_name), lower(first_name), created_at DESC, id DESC"
            }
        };
        let query = format!(
            "SELECT {} FROM public.students ORDER BY {order_by}",
            *RETURNED_COLUMNS
        );

        sqlx::query_as::<_, StudentRow>(&query)
            .fetch_all(&self.pool)
            .await
            .context(MakeQuerySnafu)?
            .into_iter()
            .map(Student::try_from)
            .collect()
    }

    async fn update(&self, id: Uuid, fields: StudentFields) -> SatchelResult<Option<Student>> {
        bind_fields(sqlx::query_as(UPDATE_QUERY.as_str()).bind(id), &fields)
            .fetch_optional(&self.pool)
            .await
            .context(MakeQuerySnafu)?
            .map(Student::try_from)
            .transpose()
    }

    async fn delete(&self, id: Uuid) -> SatchelResult<bool> {
        let result = sqlx::query("DELETE FROM public.students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context(MakeQuerySnafu)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> SatchelResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM public.students")
            .fetch_one(&self.pool)
            .await
            .context(MakeQuerySnafu)?;
        Ok(count.unsigned_abs())
    }
}

/// Keeps everything in a map, for running without a database.
#[derive(Debug, Default)]
pub struct MemoryStudentStore {
    students: RwLock<HashMap<Uuid, Student>>,
}

///postgres timestamps only go down to microseconds, so keep the two stores comparable
fn now_micros() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

#[async_trait]
impl StudentStore for MemoryStudentStore {
    async fn create(&self, fields: StudentFields) -> SatchelResult<Student> {
        let student = Student::new(Uuid::new_v4(), fields, now_micros());
        self.students
            .write()
            .await
            .insert(student.id, student.clone());
        Ok(student)
    }

    async fn get(&self, id: Uuid) -> SatchelResult<Option<Student>> {
        Ok(self.students.read().await.get(&id).cloned())
    }

    async fn list(&self, order: StudentOrder) -> SatchelResult<Vec<Student>> {
        let mut students: Vec<Student> = self.students.read().await.values().cloned().collect();
        match order {
            StudentOrder::NewestFirst => {
                students.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
            }
            StudentOrder::OldestFirst => students.sort_by_key(|student| (student.created_at, student.id)),
            StudentOrder::LastName => students.sort_by(|a, b| {
                a.last_name
                    .to_lowercase()
                    .cmp(&b.last_name.to_lowercase())
                    .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
                    .then_with(|| (b.created_at, b.id).cmp(&(a.created_at, a.id)))
            }),
        }
        Ok(students)
    }

    async fn update(&self, id: Uuid, fields: StudentFields) -> SatchelResult<Option<Student>> {
        let mut students = self.students.write().await;
        let Some(existing) = students.get_mut(&id) else {
            return Ok(None);
        };

        let mut updated = Student::new(id, fields, existing.created_at);
        updated.updated_at = now_micros().max(existing.updated_at + Duration::microseconds(1));
        *existing = updated.clone();

        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> SatchelResult<bool> {
        Ok(self.students.write().await.remove(&id).is_some())
    }

    async fn count(&self) -> SatchelResult<u64> {
        Ok(self.students.read().await.len() as u64)
    }
}
