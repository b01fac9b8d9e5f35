use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use secrecy::ExposeSecret;

use crate::configuration::AzureStorage;

use super::{ObjectStorage, StorageError, encode_key};

/// Block blob uploads through the Blob REST API, authorised with a container SAS.
pub struct AzureBlobStorage {
    client: reqwest::Client,
    container_url: String,
    sas_token: String,
}

impl AzureBlobStorage {
    pub fn new(client: reqwest::Client, config: AzureStorage) -> Result<Self, StorageError> {
        let account_url = url::Url::parse(&config.account_url)
            .map_err(|e| StorageError::Configuration(format!("account_url: {}", e)))?;

        if config.container.trim().is_empty() {
            return Err(StorageError::Configuration(
                "container must not be empty".to_string(),
            ));
        }

        let container_url = format!(
            "{}/{}",
            account_url.as_str().trim_end_matches('/'),
            config.container.trim_matches('/')
        );
        let sas_token = config
            .sas_token
            .expose_secret()
            .trim_start_matches('?')
            .to_string();

        Ok(Self {
            client,
            container_url,
            sas_token,
        })
    }

    pub fn blob_url(&self, key: &str) -> String {
        format!("{}/{}", self.container_url, encode_key(key))
    }
}

#[async_trait]
impl ObjectStorage for AzureBlobStorage {
    #[tracing::instrument(name = "put azure blob", skip(self, body), fields(size = body.len()))]
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        let blob_url = self.blob_url(key);
        let upload_error = |message: String| StorageError::Upload {
            key: key.to_string(),
            message,
        };

        let mut request = self
            .client
            .put(format!("{}?{}", blob_url, self.sas_token))
            .header("x-ms-blob-type", "BlockBlob")
            .body(body);
        if let Some(content_type) = content_type {
            request = request
                .header(CONTENT_TYPE, content_type)
                .header("x-ms-blob-content-type", content_type);
        }

        let response = request
            .send()
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upload_error(format!("{}: {}", status, body)));
        }

        Ok(blob_url)
    }
}
