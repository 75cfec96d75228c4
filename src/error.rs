use crate::auth::backend::SatchelAuthBackend;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{DOCTYPE, html};
use snafu::Snafu;
use std::{num::ParseIntError, path::PathBuf};
use uuid::Uuid;

pub type SatchelResult<T> = Result<T, SatchelError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SatchelError {
    #[snafu(display("Error opening database"))]
    OpenDatabase { source: sqlx::Error },
    #[snafu(display("Error making SQL query"))]
    MakeQuery { source: sqlx::Error },
    #[snafu(display("Error migrating DB schema"))]
    MigrateError { source: sqlx::migrate::MigrateError },
    #[snafu(display("Found {value:?} in column `{column}`, which isn't a known value"))]
    InvalidStoredValue { column: &'static str, value: String },
    #[snafu(display("Error serialising with rmp_serde"))]
    RmpSerdeEncode { source: rmp_serde::encode::Error },
    #[snafu(display("Unable to retrieve env var `{}`", name))]
    BadEnvVar {
        source: dotenvy::Error,
        name: &'static str,
    },
    #[snafu(display("Unable to parse env var `{}` as a number", name))]
    ParseNumber {
        source: ParseIntError,
        name: &'static str,
    },
    #[snafu(display("Env var `{name}` must be one of {expected:?}, found {found:?}"))]
    UnknownOption {
        name: &'static str,
        expected: &'static [&'static str],
        found: String,
    },
    #[snafu(display("Unable to find student with UUID: {}", id))]
    MissingStudent { id: Uuid },
    #[snafu(display("{original:?} is not a valid student ID"))]
    InvalidStudentId { original: String },
    #[snafu(display("A user with the email {email:?} already exists"))]
    EmailTaken { email: String },
    #[snafu(display("Error with hashing/password verification"))]
    Bcrypt { source: bcrypt::BcryptError },
    #[snafu(display("Error joining blocking task"))]
    JoinBlocking { source: tokio::task::JoinError },
    #[snafu(display("Error with sessions"))]
    TowerSession {
        source: axum_login::tower_sessions::session::Error,
    },
    #[snafu(display("Error with multipart form input"))]
    Multipart {
        source: axum::extract::multipart::MultipartError,
    },
    #[snafu(display("Error with file at {}", path.display()))]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Error with S3 Credentials"))]
    S3Creds {
        source: s3::creds::error::CredentialsError,
    },
    #[snafu(display("Error with S3"))]
    S3 { source: s3::error::S3Error },
}

impl From<axum_login::Error<SatchelAuthBackend>> for SatchelError {
    fn from(value: axum_login::Error<SatchelAuthBackend>) -> Self {
        match value {
            axum_login::Error::Session(source) => Self::TowerSession { source },
            axum_login::Error::Backend(backend) => backend,
        }
    }
}

impl SatchelError {
    pub fn status_code(&self) -> StatusCode {
        const ISE: StatusCode = StatusCode::INTERNAL_SERVER_ERROR; //internal server error
        const NF: StatusCode = StatusCode::NOT_FOUND; //not found

        match self {
            Self::OpenDatabase { .. } => ISE,
            Self::MigrateError { .. } => ISE,
            Self::MakeQuery { source } => match source {
                sqlx::Error::RowNotFound => NF,
                _ => ISE,
            },
            Self::InvalidStoredValue { .. } => ISE,
            Self::RmpSerdeEncode { .. } => ISE,
            Self::BadEnvVar { .. } | Self::ParseNumber { .. } | Self::UnknownOption { .. } => ISE,
            Self::MissingStudent { .. } | Self::InvalidStudentId { .. } => NF,
            Self::EmailTaken { .. } => StatusCode::CONFLICT,
            Self::Bcrypt { .. } | Self::JoinBlocking { .. } => ISE,
            Self::TowerSession { .. } => ISE,
            Self::Multipart { source } => source.status(),
            Self::Io { .. } => ISE,
            Self::S3Creds { .. } | Self::S3 { .. } => ISE,
        }
    }
}

impl IntoResponse for SatchelError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let page = html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="UTF-8" {}
                    script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4" {}
                    title { "Satchel - " (status_code.to_string()) }
                }
                body class="bg-gray-900 h-screen flex flex-col items-center justify-center text-white" {
                    div class="bg-red-100 border border-red-400 text-red-700 px-4 py-3 rounded relative mb-4" role="alert" {
                        strong class="font-bold" {"Satchel Error: "}
                        span {(self.to_string())}
                    }
                    a href="/students/list/" class="text-blue-200 underline" {"Back to all students"}
                }
            }
        };

        if status_code.is_server_error() {
            error!(?self, "Error!");
        } else {
            warn!(?self, "Request failed");
        }
        (status_code, page).into_response()
    }
}
