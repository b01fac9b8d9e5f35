use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header},
    routing::{get, put},
};
use nexa_crawler::{
    configuration::AzureStorage,
    storage::{AzureBlobStorage, ImageTransfer, ImageUploader, StorageError},
};
use secrecy::SecretString;

use crate::helper::spawn_server;

#[derive(Debug, Clone)]
struct ReceivedBlob {
    path: String,
    query: Option<String>,
    blob_type: Option<String>,
    content_type: Option<String>,
    body: Bytes,
}

type Received = Arc<Mutex<Vec<ReceivedBlob>>>;

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn image() -> ([(header::HeaderName, &'static str); 1], &'static [u8]) {
    ([(header::CONTENT_TYPE, "image/webp")], b"RIFF-image-bytes")
}

async fn put_blob(
    State(received): State<Received>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    received.lock().unwrap().push(ReceivedBlob {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        blob_type: header_value(&headers, "x-ms-blob-type"),
        content_type: header_value(&headers, "x-ms-blob-content-type"),
        body,
    });

    StatusCode::CREATED
}

async fn rejecting_blob() -> (StatusCode, &'static str) {
    (StatusCode::FORBIDDEN, "AuthenticationFailed")
}

async fn uploader(router: Router) -> (ImageUploader, String) {
    let base = spawn_server(router).await;
    let storage = AzureBlobStorage::new(
        reqwest::Client::new(),
        AzureStorage {
            account_url: base.clone(),
            container: "nexa".to_string(),
            sas_token: SecretString::from("?sv=2024&sig=abc".to_string()),
        },
    )
    .unwrap();

    (
        ImageUploader::new(reqwest::Client::new(), Arc::new(storage)),
        base,
    )
}

#[tokio::test]
async fn image_is_copied_into_the_container() {
    let received = Received::default();
    let router = Router::new()
        .route("/images/1.webp", get(image))
        .route("/nexa/{*key}", put(put_blob))
        .with_state(received.clone());
    let (uploader, base) = uploader(router).await;

    let url = uploader
        .upload(
            &format!("{}/images/1.webp", base),
            "Solo Leveling",
            "Chapter 1",
        )
        .await
        .unwrap();

    let received = received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    let blob = &received[0];
    assert!(blob.path.starts_with("/nexa/Solo%20Leveling/Chapter%201/"));
    assert!(blob.path.ends_with(".jpg"));
    assert_eq!(blob.query.as_deref(), Some("sv=2024&sig=abc"));
    assert_eq!(blob.blob_type.as_deref(), Some("BlockBlob"));
    assert_eq!(blob.content_type.as_deref(), Some("image/webp"));
    assert_eq!(&blob.body[..], b"RIFF-image-bytes");

    assert_eq!(url, format!("{}{}", base, blob.path));
    assert!(!url.contains("sig="));
}

#[tokio::test]
async fn every_upload_gets_its_own_key() {
    let received = Received::default();
    let router = Router::new()
        .route("/images/1.webp", get(image))
        .route("/nexa/{*key}", put(put_blob))
        .with_state(received.clone());
    let (uploader, base) = uploader(router).await;
    let source = format!("{}/images/1.webp", base);

    let first = uploader.upload(&source, "Solo Leveling", "cover").await.unwrap();
    let second = uploader.upload(&source, "Solo Leveling", "cover").await.unwrap();

    assert_ne!(first, second);
}

#[tokio::test]
async fn missing_source_image_is_a_status_error() {
    let received = Received::default();
    let router = Router::new()
        .route("/nexa/{*key}", put(put_blob))
        .with_state(received.clone());
    let (uploader, base) = uploader(router).await;

    let result = uploader
        .upload(&format!("{}/images/gone.jpg", base), "Solo Leveling", "Chapter 1")
        .await;

    assert!(matches!(result, Err(StorageError::Status { status: 404, .. })));
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_upload_is_an_upload_error() {
    let router = Router::new()
        .route("/images/1.webp", get(image))
        .route("/nexa/{*key}", put(rejecting_blob));
    let (uploader, base) = uploader(router).await;

    let result = uploader
        .upload(&format!("{}/images/1.webp", base), "Solo Leveling", "Chapter 1")
        .await;

    match result {
        Err(StorageError::Upload { message, .. }) => {
            assert!(message.contains("403"));
            assert!(message.contains("AuthenticationFailed"));
        }
        other => panic!("expected an upload error, got {:?}", other),
    }
}

#[test]
fn invalid_account_url_is_rejected() {
    let result = AzureBlobStorage::new(
        reqwest::Client::new(),
        AzureStorage {
            account_url: "not a url".to_string(),
            container: "nexa".to_string(),
            sas_token: SecretString::from("sig=abc".to_string()),
        },
    );

    assert!(matches!(result, Err(StorageError::Configuration(_))));
}
