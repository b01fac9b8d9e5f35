//! Moves images from a source site into object storage.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;

use crate::configuration;

pub mod azure;
pub mod s3;

pub use azure::AzureBlobStorage;
pub use s3::S3Storage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to upload {key}: {message}")]
    Upload { key: String, message: String },

    #[error("Invalid storage configuration: {0}")]
    Configuration(String),
}

/// Backend that accepts finished objects and hands back their public URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, StorageError>;
}

#[async_trait]
pub trait ImageTransfer: Send + Sync {
    /// Stores the image at `source_url` under `{title}/{subtitle}/` and returns the stored URL.
    async fn upload(
        &self,
        source_url: &str,
        title: &str,
        subtitle: &str,
    ) -> Result<String, StorageError>;
}

pub fn storage_key(title: &str, subtitle: &str) -> String {
    format!("{}/{}/{}.jpg", title, subtitle, uuid::Uuid::new_v4())
}

/// Percent-encodes each path segment of a key, keeping the separators.
pub(crate) fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub struct ImageUploader {
    client: reqwest::Client,
    storage: Arc<dyn ObjectStorage>,
}

impl ImageUploader {
    pub fn new(client: reqwest::Client, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { client, storage }
    }

    async fn download(&self, url: &str) -> Result<(Bytes, Option<String>), StorageError> {
        let fetch_error = |source| StorageError::Fetch {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(fetch_error)?;

        Ok((body, content_type))
    }
}

#[async_trait]
impl ImageTransfer for ImageUploader {
    #[tracing::instrument(name = "transfer image", skip(self))]
    async fn upload(
        &self,
        source_url: &str,
        title: &str,
        subtitle: &str,
    ) -> Result<String, StorageError> {
        let (body, content_type) = self.download(source_url).await?;
        let key = storage_key(title, subtitle);

        let url = self
            .storage
            .put_object(&key, body, content_type.as_deref())
            .await?;

        tracing::debug!(%url, "Image stored");
        Ok(url)
    }
}

/// Builds the backend selected by `storage.backend`.
pub fn from_config(
    config: &configuration::Storage,
    client: reqwest::Client,
) -> Result<Arc<dyn ObjectStorage>, StorageError> {
    match config {
        configuration::Storage::Azure(azure) => {
            Ok(Arc::new(AzureBlobStorage::new(client, azure.clone())?))
        }
        configuration::Storage::S3(s3) => Ok(Arc::new(S3Storage::new(s3.clone()))),
    }
}
