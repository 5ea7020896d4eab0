//! Cover image storage backends

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::{
    config::{StorageConfig, StorageProvider},
    error::{AppError, AppResult},
    models::book::ImageUpload,
};

/// Stores an uploaded image and returns its public URL
#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn upload(&self, image: ImageUpload) -> AppResult<String>;
}

/// Build the backend selected in configuration
pub fn from_config(config: &StorageConfig) -> AppResult<Arc<dyn ImageStorage>> {
    match config.provider {
        StorageProvider::Local => Ok(Arc::new(LocalStorage::new(
            &config.local_directory,
            &config.local_public_url,
        ))),
        StorageProvider::Cloudinary => {
            let (Some(cloud_name), Some(api_key), Some(api_secret)) = (
                config.cloudinary_cloud_name.clone(),
                config.cloudinary_api_key.clone(),
                config.cloudinary_api_secret.clone(),
            ) else {
                return Err(AppError::Internal(
                    "Cloudinary storage requires cloud name, api key and api secret".to_string(),
                ));
            };
            Ok(Arc::new(CloudinaryStorage::new(
                cloud_name,
                api_key,
                api_secret,
                config.folder.clone(),
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Cloudinary
// ---------------------------------------------------------------------------

pub struct CloudinaryStorage {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl CloudinaryStorage {
    pub fn new(cloud_name: String, api_key: String, api_secret: String, folder: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name,
            api_key,
            api_secret,
            folder,
        }
    }

    /// Signed upload signature: SHA-1 of the sorted parameters followed by the secret
    fn signature(&self, timestamp: i64) -> String {
        let payload = format!(
            "folder={}&timestamp={}{}",
            self.folder, timestamp, self.api_secret
        );
        hex::encode(Sha1::digest(payload.as_bytes()))
    }
}

#[async_trait]
impl ImageStorage for CloudinaryStorage {
    async fn upload(&self, image: ImageUpload) -> AppResult<String> {
        let timestamp = Utc::now().timestamp();
        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.cloud_name
        );

        let mut file = reqwest::multipart::Part::bytes(image.bytes)
            .file_name(image.file_name.unwrap_or_else(|| "cover".to_string()));
        if let Some(content_type) = image.content_type.as_deref() {
            file = file
                .mime_str(content_type)
                .map_err(|e| AppError::Validation(format!("Invalid image content type: {}", e)))?;
        }

        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("folder", self.folder.clone())
            .text("signature", self.signature(timestamp));

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Cloudinary request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!(
                "Cloudinary rejected upload ({}): {}",
                status, body
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Invalid Cloudinary response: {}", e)))?;

        tracing::debug!("Uploaded cover image to {}", uploaded.secure_url);
        Ok(uploaded.secure_url)
    }
}

// ---------------------------------------------------------------------------
// Local filesystem
// ---------------------------------------------------------------------------

/// Writes images under a directory served statically by the HTTP layer
pub struct LocalStorage {
    directory: PathBuf,
    public_url: String,
}

impl LocalStorage {
    pub fn new(directory: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            directory: directory.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStorage for LocalStorage {
    async fn upload(&self, image: ImageUpload) -> AppResult<String> {
        let name = format!("{}.{}", uuid::Uuid::new_v4(), extension(&image));

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| AppError::Storage(format!("Cannot create image directory: {}", e)))?;
        tokio::fs::write(self.directory.join(&name), &image.bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Cannot write image: {}", e)))?;

        Ok(format!("{}/{}", self.public_url, name))
    }
}

/// File extension from the uploaded name, else from the content type
fn extension(image: &ImageUpload) -> String {
    let from_name = image
        .file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| {
        match image.content_type.as_deref() {
            Some("image/png") => "png",
            Some("image/gif") => "gif",
            Some("image/webp") => "webp",
            _ => "jpg",
        }
        .to_string()
    })
}
