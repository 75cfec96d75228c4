use crate::{
    auth::SatchelSession,
    config::{PhotoConfig, RuntimeConfiguration, StorageConfig},
    data::{
        photo::{LocalPhotoStore, PhotoStore, S3PhotoStore},
        student::Student,
        student_store::{MemoryStudentStore, PgStudentStore, StudentStore},
        user::{MemoryUserStore, PgUserStore, UserStore},
    },
    error::{MigrateSnafu, OpenDatabaseSnafu, SatchelResult},
    flash::take_flashes,
    maud_conveniences::{flash_list, render_nav},
};
use axum_login::tower_sessions::Session;
use maud::{DOCTYPE, Markup, html};
use snafu::ResultExt;
use sqlx::{Pool, Postgres, postgres::PgPoolOptions};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct SatchelState {
    pool: Option<Pool<Postgres>>,
    config: RuntimeConfiguration,
    students: Arc<dyn StudentStore>,
    users: Arc<dyn UserStore>,
    photos: Arc<dyn PhotoStore>,
}

impl SatchelState {
    pub async fn new(options: PgPoolOptions, config: RuntimeConfiguration) -> SatchelResult<Self> {
        let (pool, students, users) = match config.storage() {
            StorageConfig::Postgres(db_config) => {
                let pool = options
                    .connect(&db_config.get_db_path())
                    .await
                    .context(OpenDatabaseSnafu)?;

                sqlx::migrate!().run(&pool).await.context(MigrateSnafu)?;

                let students: Arc<dyn StudentStore> = Arc::new(PgStudentStore::new(pool.clone()));
                let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
                (Some(pool), students, users)
            }
            StorageConfig::Memory => {
                warn!("Using in-memory storage, nothing will survive a restart");
                let students: Arc<dyn StudentStore> = Arc::new(MemoryStudentStore::default());
                let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::default());
                (None, students, users)
            }
        };

        let photos: Arc<dyn PhotoStore> = match config.photos().as_ref() {
            PhotoConfig::Local { media_root } => {
                Arc::new(LocalPhotoStore::new(media_root.clone()).await?)
            }
            PhotoConfig::S3(s3_config) => Arc::new(S3PhotoStore::new(s3_config)?),
        };

        Ok(Self {
            pool,
            config,
            students,
            users,
            photos,
        })
    }

    ///wraps a page in the shared chrome, and uses up any pending flash messages
    pub async fn render(
        &self,
        session: &SatchelSession,
        tower_session: &Session,
        markup: Markup,
    ) -> SatchelResult<Markup> {
        let flashes = take_flashes(tower_session).await?;
        let nav = render_nav(session.user.as_ref());

        Ok(html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="UTF-8" {}
                    meta name="viewport" content="width=device-width, initial-scale=1.0" {}
                    script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4" {}
                    title { "Satchel" }
                }
                body class="bg-gray-900 min-h-screen flex flex-col items-center text-white" {
                    (nav)
                    main class="w-full max-w-4xl px-4 py-8 flex flex-col items-center" {
                        (flash_list(&flashes))
                        (markup)
                    }
                }
            }
        })
    }

    pub const fn config(&self) -> &RuntimeConfiguration {
        &self.config
    }

    pub fn students(&self) -> &dyn StudentStore {
        self.students.as_ref()
    }

    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub fn photos(&self) -> &dyn PhotoStore {
        self.photos.as_ref()
    }

    pub const fn pool(&self) -> Option<&Pool<Postgres>> {
        self.pool.as_ref()
    }

    pub async fn photo_url(&self, student: &Student) -> SatchelResult<Option<String>> {
        match &student.photo {
            Some(key) => Ok(Some(self.photos.url(key).await?)),
            None => Ok(None),
        }
    }

    ///for cleanup after the record itself is already dealt with, so a failure here shouldn't fail the request
    pub async fn remove_photo_quietly(&self, key: &str) {
        if let Err(e) = self.photos.remove(key).await {
            warn!(?e, ?key, "Unable to remove photo");
        }
    }

    pub async fn sensible_shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
