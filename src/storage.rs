use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("Upload is empty")]
    Empty,

    #[error("Upload exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl ImageKind {
    pub fn from_content_type(content_type: &str) -> Result<Self, StorageError> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/png" => Ok(ImageKind::Png),
            "image/jpeg" | "image/jpg" => Ok(ImageKind::Jpeg),
            "image/webp" => Ok(ImageKind::Webp),
            "image/gif" => Ok(ImageKind::Gif),
            _ => Err(StorageError::UnsupportedType(essence)),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Webp => "webp",
            ImageKind::Gif => "gif",
        }
    }
}

/// Image store for payment screenshots, QR codes and profile photos.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persist `bytes` and return the public URL they can be fetched from.
    async fn store(&self, bytes: &[u8], kind: ImageKind) -> Result<String, StorageError>;
}

/// Writes uploads under `root`, served by the HTTP layer at `/uploads/`.
pub struct LocalDiskStorage {
    root: PathBuf,
    public_base_url: String,
    max_bytes: usize,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }
}

#[async_trait]
impl FileStorage for LocalDiskStorage {
    async fn store(&self, bytes: &[u8], kind: ImageKind) -> Result<String, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let file_name = format!("{}.{}", Uuid::new_v4(), kind.extension());
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&file_name), bytes).await?;

        tracing::debug!(file = %file_name, size = bytes.len(), "Stored upload");
        Ok(format!("{}/uploads/{}", self.public_base_url, file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_parsing() {
        assert_eq!(ImageKind::from_content_type("image/png").unwrap(), ImageKind::Png);
        assert_eq!(
            ImageKind::from_content_type("Image/JPEG; charset=binary").unwrap(),
            ImageKind::Jpeg
        );
        assert!(matches!(
            ImageKind::from_content_type("application/pdf"),
            Err(StorageError::UnsupportedType(_))
        ));
    }

    #[tokio::test]
    async fn test_store_writes_file_and_returns_url() {
        let root = std::env::temp_dir().join(format!("uploads-{}", Uuid::new_v4()));
        let storage = LocalDiskStorage::new(&root, "http://localhost:3000/", 16);

        let url = storage.store(b"fake png", ImageKind::Png).await.unwrap();

        assert!(url.starts_with("http://localhost:3000/uploads/"));
        assert!(url.ends_with(".png"));
        let file_name = url.rsplit('/').next().unwrap();
        assert_eq!(tokio::fs::read(root.join(file_name)).await.unwrap(), b"fake png");

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_enforces_limits() {
        let root = std::env::temp_dir().join(format!("uploads-{}", Uuid::new_v4()));
        let storage = LocalDiskStorage::new(&root, "http://localhost:3000", 4);

        assert!(matches!(
            storage.store(b"", ImageKind::Gif).await,
            Err(StorageError::Empty)
        ));
        assert!(matches!(
            storage.store(b"too large", ImageKind::Gif).await,
            Err(StorageError::TooLarge { limit: 4 })
        ));
    }
}
