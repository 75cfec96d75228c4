use crate::{
    config::S3Config,
    error::{IoSnafu, S3CredsSnafu, S3Snafu, SatchelResult},
};
use async_trait::async_trait;
use s3::{Bucket, Region, creds::Credentials};
use secrecy::ExposeSecret;
use snafu::ResultExt;
use std::{
    fmt::Debug,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use uuid::Uuid;

pub const PHOTO_NAMESPACE: &str = "students/photos";
pub const ACCEPTED_IMAGE_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// An uploaded image whose type has been sniffed from its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
}

impl ImageUpload {
    ///`None` unless the bytes look like a JPEG or PNG, whatever the browser claimed
    pub fn sniff(bytes: Vec<u8>) -> Option<Self> {
        let kind = infer::get(&bytes)?;
        if !ACCEPTED_IMAGE_TYPES.contains(&kind.mime_type()) {
            return None;
        }

        Some(Self {
            content_type: kind.mime_type(),
            extension: kind.extension(),
            bytes,
        })
    }

    fn new_key(&self) -> String {
        format!("{PHOTO_NAMESPACE}/{}.{}", Uuid::new_v4(), self.extension)
    }
}

#[async_trait]
pub trait PhotoStore: Debug + Send + Sync {
    ///returns the key to keep on the student
    async fn save(&self, upload: ImageUpload) -> SatchelResult<String>;
    ///removing something that isn't there is fine
    async fn remove(&self, key: &str) -> SatchelResult<()>;
    async fn url(&self, key: &str) -> SatchelResult<String>;
    ///where `/media` should be served from, if anywhere
    fn served_from(&self) -> Option<&Path> {
        None
    }
}

/// Photos on disk, served under `/media`.
#[derive(Debug, Clone)]
pub struct LocalPhotoStore {
    media_root: PathBuf,
}

impl LocalPhotoStore {
    pub async fn new(media_root: PathBuf) -> SatchelResult<Self> {
        let photos_dir = media_root.join(PHOTO_NAMESPACE);
        tokio::fs::create_dir_all(&photos_dir)
            .await
            .context(IoSnafu { path: photos_dir })?;
        Ok(Self { media_root })
    }

    ///keys come from the database, so don't let one wander outside the photo directory
    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let file_name = key.strip_prefix(PHOTO_NAMESPACE)?.strip_prefix('/')?;
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return None;
        }
        Some(self.media_root.join(PHOTO_NAMESPACE).join(file_name))
    }
}

#[async_trait]
impl PhotoStore for LocalPhotoStore {
    async fn save(&self, upload: ImageUpload) -> SatchelResult<String> {
        let key = upload.new_key();
        let path = self.media_root.join(&key);
        tokio::fs::write(&path, &upload.bytes)
            .await
            .context(IoSnafu { path })?;
        Ok(key)
    }

    async fn remove(&self, key: &str) -> SatchelResult<()> {
        let Some(path) = self.path_for(key) else {
            warn!(?key, "Refusing to remove photo with odd key");
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other.context(IoSnafu { path }),
        }
    }

    async fn url(&self, key: &str) -> SatchelResult<String> {
        Ok(format!("/media/{key}"))
    }

    fn served_from(&self) -> Option<&Path> {
        Some(&self.media_root)
    }
}

/// Photos in an S3 bucket, handed out through presigned URLs.
#[derive(Debug)]
pub struct S3PhotoStore {
    bucket: Box<Bucket>,
}

impl S3PhotoStore {
    const PRESIGN_SECONDS: u32 = 60 * 5; //5 mins

    pub fn new(config: &S3Config) -> SatchelResult<Self> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(config.access_key_id.as_str()),
            Some(config.secret_access_key.expose_secret()),
            None,
            None,
            None,
        )
        .context(S3CredsSnafu)?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .context(S3Snafu)?
            .with_path_style();
        Ok(Self { bucket })
    }
}

#[async_trait]
impl PhotoStore for S3PhotoStore {
    async fn save(&self, upload: ImageUpload) -> SatchelResult<String> {
        let key = upload.new_key();
        self.bucket
            .put_object_with_content_type(format!("/{key}"), &upload.bytes, upload.content_type)
            .await
            .context(S3Snafu)?;
        Ok(key)
    }

    async fn remove(&self, key: &str) -> SatchelResult<()> {
        self.bucket
            .delete_object(format!("/{key}"))
            .await
            .context(S3Snafu)?;
        Ok(())
    }

    async fn url(&self, key: &str) -> SatchelResult<String> {
        self.bucket
            .presign_get(format!("/{key}"), Self::PRESIGN_SECONDS, None)
            .await
            .context(S3Snafu)
    }
}
