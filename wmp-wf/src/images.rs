//! Image intake and storage
//!
//! Images arrive base64-encoded in request bodies (optionally as a
//! `data:` URL). They are decoded and validated before any external call,
//! and stored before the unit of work opens; a stored image whose unit of
//! work later rolls back is an orphan file, never a partial entity.

use async_trait::async_trait;
use base64::Engine;
use std::path::PathBuf;
use uuid::Uuid;
use wmp_common::{Error, Result};

/// Upper bound on accepted image size
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Decoded, validated image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    bytes: Vec<u8>,
    extension: &'static str,
}

impl ImageUpload {
    /// Decode a base64 body field
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let data = match encoded.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => encoded,
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| Error::Validation(format!("Image is not valid base64: {}", e)))?;

        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Validation("Image is empty".to_string()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(Error::Validation(format!(
                "Image exceeds {} bytes",
                MAX_IMAGE_BYTES
            )));
        }

        let extension = sniff_extension(&bytes)
            .ok_or_else(|| Error::Validation("Unsupported image format".to_string()))?;

        Ok(Self { bytes, extension })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn extension(&self) -> &'static str {
        self.extension
    }
}

/// Identify JPEG, PNG, GIF and WebP by magic bytes
fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// Object storage contract
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist an image, returning the reference stored on the entity
    async fn put(&self, image: &ImageUpload) -> Result<String>;
}

/// Stores images as files under a directory
pub struct FsImageStore {
    dir: PathBuf,
}

impl FsImageStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn put(&self, image: &ImageUpload) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::ExternalService(format!("Image storage unavailable: {}", e)))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), image.extension());
        let path = self.dir.join(&file_name);

        tokio::fs::write(&path, image.bytes())
            .await
            .map_err(|e| Error::ExternalService(format!("Failed to store image: {}", e)))?;

        tracing::debug!(path = %path.display(), size = image.bytes().len(), "Stored image");

        Ok(format!("images/{}", file_name))
    }
}
