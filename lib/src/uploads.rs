// lib/src/uploads.rs

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use models::{ClinicError, ClinicResult};

use crate::config::CloudinaryConfig;

/// Largest image accepted for a profile picture.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Object storage for profile images. Returns the public URL of the stored image.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, image: ImageUpload) -> ClinicResult<String>;
}

/// Uploads `image` when one was supplied. Supplying an image while no
/// storage is configured is `Unavailable`; omitting it is always fine.
pub async fn store_optional_image(
    images: Option<&dyn ImageStore>,
    image: Option<ImageUpload>,
) -> ClinicResult<Option<String>> {
    match (image, images) {
        (None, _) => Ok(None),
        (Some(_), None) => Err(ClinicError::Unavailable("Image storage is not configured".to_string())),
        (Some(image), Some(store)) => store.upload(image).await.map(Some),
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Signed uploads to the Cloudinary image API.
pub struct CloudinaryImageStore {
    client: reqwest::Client,
    config: CloudinaryConfig,
    endpoint: String,
}

impl CloudinaryImageStore {
    pub fn new(config: CloudinaryConfig) -> ClinicResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClinicError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        let endpoint = format!("https://api.cloudinary.com/v1_1/{}/image/upload", config.cloud_name);
        info!("Cloudinary image storage enabled for cloud {}", config.cloud_name);
        Ok(CloudinaryImageStore { client, config, endpoint })
    }

    /// SHA-256 over the `k=v` pairs sorted by key and joined with `&`,
    /// followed directly by the API secret.
    pub fn signature(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn public_id(filename: &str, millis: i64) -> String {
        let name = filename.split_whitespace().collect::<Vec<_>>().join("-");
        format!("{}-{}", millis, name)
    }
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    async fn upload(&self, image: ImageUpload) -> ClinicResult<String> {
        let now = Utc::now();
        let mut signed: BTreeMap<&str, String> = BTreeMap::new();
        signed.insert("folder", self.config.folder.clone());
        signed.insert("public_id", Self::public_id(&image.filename, now.timestamp_millis()));
        signed.insert("timestamp", now.timestamp().to_string());
        let signature = Self::signature(&signed, &self.config.api_secret);

        let data_uri = format!("data:{};base64,{}", image.content_type, STANDARD.encode(&image.bytes));
        let mut form: Vec<(&str, String)> = signed.into_iter().collect();
        form.push(("file", data_uri));
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        debug!("Uploading {} ({} bytes) to Cloudinary", image.filename, image.bytes.len());
        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!("Cloudinary request failed: {}", e);
                ClinicError::Unavailable("Image storage is unreachable".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Cloudinary rejected upload with {}: {}", status, body);
            return Err(ClinicError::Unavailable(format!("Image upload failed with status {}", status)));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| ClinicError::Serialization(format!("Unexpected Cloudinary response: {}", e)))?;
        Ok(uploaded.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageUpload {
        ImageUpload { bytes: vec![1, 2, 3], filename: "me.png".into(), content_type: "image/png".into() }
    }

    #[test]
    fn signature_is_sha256_of_sorted_params_and_secret() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample_image".to_string());
        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"public_id=sample_image&timestamp=1315060510abcd");
            hex::encode(hasher.finalize())
        };
        assert_eq!(CloudinaryImageStore::signature(&params, "abcd"), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn public_ids_replace_whitespace() {
        assert_eq!(CloudinaryImageStore::public_id("dr  who photo.png", 42), "42-dr-who-photo.png");
    }

    #[tokio::test]
    async fn missing_storage_only_matters_when_an_image_is_supplied() {
        assert_eq!(store_optional_image(None, None).await.unwrap(), None);
        let err = store_optional_image(None, Some(image())).await.unwrap_err();
        assert!(matches!(err, ClinicError::Unavailable(_)));
    }

    #[tokio::test]
    async fn configured_storage_returns_the_url() {
        let mut store = MockImageStore::new();
        store
            .expect_upload()
            .withf(|img| img.filename == "me.png")
            .returning(|_| Ok("https://cdn.example/me.png".to_string()));
        let url = store_optional_image(Some(&store), Some(image())).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://cdn.example/me.png"));
    }
}
