/// Image uploads to S3-compatible object storage
use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use crate::metrics::UPLOADS_TOTAL;
use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{Datelike, Utc};
use mime::Mime;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Destination for uploaded images
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}

pub struct S3ImageStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3ImageStore {
    /// Build the store, or `None` when no bucket is configured
    pub async fn from_config(config: &StorageConfig) -> Option<Self> {
        let bucket = config.bucket.clone()?;
        let region = config.region.clone().unwrap_or_else(|| "us-east-1".to_string());

        let shared_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let public_base_url = public_base_url(config, &bucket, &region);
        info!(bucket = %bucket, region = %region, "S3 image store configured");

        Some(Self {
            client: Client::from_conf(builder.build()),
            bucket,
            public_base_url,
        })
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload {}: {}", key, e)))?;

        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

fn public_base_url(config: &StorageConfig, bucket: &str, region: &str) -> String {
    if let Some(url) = &config.public_base_url {
        return url.trim_end_matches('/').to_string();
    }
    match &config.endpoint {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}

/// Image formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    /// Identify the format from the file signature
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageKind::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }

    /// Whether a client-declared content type is compatible with the sniffed format.
    /// Missing and `application/octet-stream` types are accepted.
    pub fn accepts_declared(&self, declared: Option<&Mime>) -> bool {
        let declared = match declared {
            Some(d) => d,
            None => return true,
        };
        if declared.essence_str() == mime::APPLICATION_OCTET_STREAM.essence_str() {
            return true;
        }
        if declared.type_() != mime::IMAGE {
            return false;
        }
        matches!(
            (self, declared.subtype().as_str()),
            (ImageKind::Jpeg, "jpeg" | "jpg" | "pjpeg")
                | (ImageKind::Png, "png")
                | (ImageKind::Gif, "gif")
                | (ImageKind::Webp, "webp")
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    pub url: String,
    pub key: String,
    pub content_type: String,
    pub size: usize,
}

pub struct MediaService {
    store: Arc<dyn ImageStore>,
    max_bytes: usize,
}

impl MediaService {
    pub fn new(store: Arc<dyn ImageStore>, max_bytes: usize) -> Self {
        Self { store, max_bytes }
    }

    pub async fn upload_image(
        &self,
        user_id: Uuid,
        bytes: Vec<u8>,
        declared_type: Option<&Mime>,
    ) -> Result<UploadedImage> {
        if bytes.is_empty() {
            UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if bytes.len() > self.max_bytes {
            UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(AppError::Validation(format!(
                "File exceeds the {} byte limit",
                self.max_bytes
            )));
        }

        let kind = match ImageKind::sniff(&bytes) {
            Some(kind) if kind.accepts_declared(declared_type) => kind,
            Some(_) => {
                UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
                return Err(AppError::Validation(
                    "Declared content type does not match file contents".to_string(),
                ));
            }
            None => {
                UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
                return Err(AppError::Validation(
                    "Only JPEG, PNG, GIF and WebP images are allowed".to_string(),
                ));
            }
        };

        let key = object_key(user_id, kind);
        let size = bytes.len();
        let url = match self.store.put(&key, bytes, kind.mime()).await {
            Ok(url) => url,
            Err(e) => {
                UPLOADS_TOTAL.with_label_values(&["error"]).inc();
                return Err(e);
            }
        };

        UPLOADS_TOTAL.with_label_values(&["stored"]).inc();
        info!(user_id = %user_id, key = %key, size, "Image uploaded");

        Ok(UploadedImage {
            url,
            key,
            content_type: kind.mime().to_string(),
            size,
        })
    }
}

/// `images/{user_id}/{yyyy}/{mm}/{uuid}.{ext}`
pub fn object_key(user_id: Uuid, kind: ImageKind) -> String {
    let now = Utc::now();
    format!(
        "images/{}/{:04}/{:02}/{}.{}",
        user_id,
        now.year(),
        now.month(),
        Uuid::new_v4(),
        kind.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[derive(Default)]
    struct MemoryStore {
        keys: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageStore for MemoryStore {
        async fn put(&self, key: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<String> {
            self.keys.lock().unwrap().push(key.to_string());
            Ok(format!("https://cdn.test/{}", key))
        }
    }

    #[test]
    fn sniffs_supported_formats() {
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(PNG), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(b"GIF89a...."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"%PDF-1.7"), None);
    }

    #[test]
    fn declared_type_must_agree() {
        let jpg: Mime = "image/jpg".parse().unwrap();
        assert!(ImageKind::Jpeg.accepts_declared(Some(&jpg)));
        assert!(ImageKind::Jpeg.accepts_declared(Some(&mime::IMAGE_JPEG)));
        assert!(ImageKind::Png.accepts_declared(Some(&mime::APPLICATION_OCTET_STREAM)));
        assert!(ImageKind::Png.accepts_declared(None));
        assert!(!ImageKind::Png.accepts_declared(Some(&mime::IMAGE_GIF)));
        assert!(!ImageKind::Gif.accepts_declared(Some(&mime::TEXT_PLAIN)));
    }

    #[test]
    fn key_layout() {
        let user = Uuid::new_v4();
        let key = object_key(user, ImageKind::Webp);
        assert!(key.starts_with(&format!("images/{}/", user)));
        assert!(key.ends_with(".webp"));
        assert_eq!(key.split('/').count(), 5);
    }

    #[tokio::test]
    async fn upload_rejects_oversized_and_non_images() {
        let store = Arc::new(MemoryStore::default());
        let service = MediaService::new(store.clone(), 16);

        let mut too_big = PNG.to_vec();
        too_big.extend_from_slice(&[0u8; 16]);
        assert!(service.upload_image(Uuid::new_v4(), too_big, None).await.is_err());
        assert!(service
            .upload_image(Uuid::new_v4(), b"plain text".to_vec(), Some(&mime::TEXT_PLAIN))
            .await
            .is_err());
        assert!(store.keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_stores_png() {
        let store = Arc::new(MemoryStore::default());
        let service = MediaService::new(store.clone(), 1024);

        let uploaded = service
            .upload_image(Uuid::new_v4(), PNG.to_vec(), Some(&mime::IMAGE_PNG))
            .await
            .unwrap();
        assert_eq!(uploaded.content_type, "image/png");
        assert_eq!(uploaded.size, PNG.len());
        assert!(uploaded.url.ends_with(".png"));
        assert_eq!(store.keys.lock().unwrap().len(), 1);
    }

    #[test]
    fn public_url_prefers_configured_base() {
        let mut config = StorageConfig {
            bucket: Some("blog".into()),
            public_base_url: Some("https://cdn.example.com/".into()),
            ..StorageConfig::default()
        };
        assert_eq!(public_base_url(&config, "blog", "eu-west-1"), "https://cdn.example.com");

        config.public_base_url = None;
        assert_eq!(
            public_base_url(&config, "blog", "eu-west-1"),
            "https://blog.s3.eu-west-1.amazonaws.com"
        );

        config.endpoint = Some("http://minio:9000".into());
        assert_eq!(public_base_url(&config, "blog", "eu-west-1"), "http://minio:9000/blog");
    }
}
