use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::{
    config::CloudinaryConfig,
    models::Image,
    utils::error::{AppError, AppResult},
};

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// File received from a multipart form, held in memory until uploaded
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Hosting service for attraction images
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, file: UploadFile) -> AppResult<Image>;
    async fn delete(&self, deletable_ids: &[String]) -> AppResult<()>;
}

/// Uploads files one at a time, in order.
pub async fn upload_all(store: &dyn ImageStore, files: Vec<UploadFile>) -> AppResult<Vec<Image>> {
    let mut images = Vec::with_capacity(files.len());
    for file in files {
        log::info!("☁️  Uploading {} ({} bytes)", file.filename, file.bytes.len());
        images.push(store.upload(file).await?);
    }
    Ok(images)
}

/// Deletes hosted images in the background. Failures are logged, never surfaced.
pub fn schedule_image_deletion(
    store: Arc<dyn ImageStore>,
    deletable_ids: Vec<String>,
) -> Option<tokio::task::JoinHandle<()>> {
    if deletable_ids.is_empty() {
        return None;
    }

    Some(actix_web::rt::spawn(async move {
        match store.delete(&deletable_ids).await {
            Ok(()) => log::info!("🗑️  Deleted {} hosted images", deletable_ids.len()),
            Err(e) => log::warn!("⚠️  Failed to delete images {:?}: {}", deletable_ids, e),
        }
    }))
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: String,
}

pub struct CloudinaryStore {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// SHA-256 signature over the alphabetically sorted parameters followed by the API secret.
    fn sign(&self, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<_> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.config.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn upload(&self, file: UploadFile) -> AppResult<Image> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signed = [
            ("folder", self.config.folder.clone()),
            ("timestamp", timestamp.clone()),
        ];
        let signature = self.sign(&signed);

        let mut part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.filename.clone());
        if let Some(content_type) = &file.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| AppError::InvalidRequest(format!("Invalid content type: {}", e)))?;
        }

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("folder", self.config.folder.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let url = format!("{}/{}/image/upload", CLOUDINARY_API_BASE, self.config.cloud_name);
        let response = self.http.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamFailure(format!(
                "Image upload failed for {}: {} {}",
                file.filename, status, body
            )));
        }

        let uploaded: UploadResponse = response.json().await?;
        let url = uploaded
            .secure_url
            .or(uploaded.url)
            .ok_or_else(|| AppError::UpstreamFailure("Image upload returned no URL".to_string()))?;

        Ok(Image {
            url,
            deletable_id: uploaded.public_id,
        })
    }

    async fn delete(&self, deletable_ids: &[String]) -> AppResult<()> {
        let url = format!(
            "{}/{}/resources/image/upload",
            CLOUDINARY_API_BASE, self.config.cloud_name
        );
        let query: Vec<(&str, &str)> = deletable_ids
            .iter()
            .map(|id| ("public_ids[]", id.as_str()))
            .collect();

        let response = self
            .http
            .delete(&url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamFailure(format!(
                "Image deletion failed: {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store that records every call
    #[derive(Default)]
    pub struct FakeImageStore {
        pub uploaded: Mutex<Vec<String>>,
        pub deleted: Mutex<Vec<String>>,
        pub fail_deletes: bool,
    }

    #[async_trait]
    impl ImageStore for FakeImageStore {
        async fn upload(&self, file: UploadFile) -> AppResult<Image> {
            self.uploaded.lock().unwrap().push(file.filename.clone());
            Ok(Image {
                url: format!("https://img.test/{}", file.filename),
                deletable_id: format!("arcane-london/{}", file.filename),
            })
        }

        async fn delete(&self, deletable_ids: &[String]) -> AppResult<()> {
            if self.fail_deletes {
                return Err(AppError::UpstreamFailure("store offline".to_string()));
            }
            self.deleted.lock().unwrap().extend(deletable_ids.iter().cloned());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeImageStore;
    use super::*;

    fn file(name: &str) -> UploadFile {
        UploadFile {
            filename: name.to_string(),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![0xff, 0xd8, 0xff],
        }
    }

    #[test]
    fn test_signature_is_order_independent() {
        let store = CloudinaryStore::new(crate::config::test_config().cloudinary);
        let a = store.sign(&[("timestamp", "1".into()), ("folder", "x".into())]);
        let b = store.sign(&[("folder", "x".into()), ("timestamp", "1".into())]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_upload_all_preserves_order() {
        let store = FakeImageStore::default();
        let images = upload_all(&store, vec![file("a.jpg"), file("b.jpg")]).await.unwrap();
        assert_eq!(images[0].url, "https://img.test/a.jpg");
        assert_eq!(images[1].deletable_id, "arcane-london/b.jpg");
        assert_eq!(*store.uploaded.lock().unwrap(), vec!["a.jpg", "b.jpg"]);
    }

    #[actix_rt::test]
    async fn test_scheduled_deletion_swallows_failures() {
        let store = Arc::new(FakeImageStore { fail_deletes: true, ..Default::default() });
        let handle = schedule_image_deletion(store.clone(), vec!["arcane-london/a.jpg".into()]);
        handle.unwrap().await.unwrap();
        assert!(store.deleted.lock().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_nothing_scheduled_for_empty_ids() {
        let store = Arc::new(FakeImageStore::default());
        assert!(schedule_image_deletion(store, Vec::new()).is_none());
    }
}
