use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
};
use bytes::Bytes;
use secrecy::ExposeSecret;

use crate::configuration;

use super::{ObjectStorage, StorageError, encode_key};

/// S3 or any S3-compatible endpoint (MinIO, R2).
pub struct S3Storage {
    client: Client,
    bucket: String,
    public_base: String,
}

fn public_base(config: &configuration::S3Storage) -> String {
    match (&config.public_url, &config.endpoint) {
        (Some(public_url), _) => public_url.trim_end_matches('/').to_string(),
        (None, Some(endpoint)) => format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket),
        (None, None) => format!(
            "https://{}.s3.{}.amazonaws.com",
            config.bucket, config.region
        ),
    }
}

impl S3Storage {
    pub fn new(config: configuration::S3Storage) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.expose_secret().to_string(),
            None,
            None,
            "nexa-crawler",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            public_base: public_base(&config),
            bucket: config.bucket,
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, encode_key(key))
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    #[tracing::instrument(name = "put s3 object", skip(self, body), fields(size = body.len()))]
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(self.object_url(key))
    }
}
