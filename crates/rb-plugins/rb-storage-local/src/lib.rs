//! # rb-storage-local
//!
//! Local filesystem implementation of `UploadService`.
//! Features: content-addressable storage, directory sharding, thumbnailing,
//! and retry of the last failed upload.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, ImageReader};
use rb_core::error::AppError;
use rb_core::models::{UploadDescriptor, UploadFile};
use rb_core::traits::UploadService;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::Mutex;

/// Longest side of generated thumbnails, in pixels.
pub const THUMB_SIZE: u32 = 250;

/// Default cap on accepted file size (8 MiB).
pub const DEFAULT_MAX_SIZE: usize = 8 << 20;

pub struct LocalUploader {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    max_size: usize,
    /// The file whose last attempt failed, kept for `retry`
    last_failed: Mutex<Option<UploadFile>>,
}

impl LocalUploader {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root_path: root,
            max_size: DEFAULT_MAX_SIZE,
            last_failed: Mutex::new(None),
        }
    }

    pub fn with_max_size(mut self, bytes: usize) -> Self {
        self.max_size = bytes;
        self
    }

    /// Generates a sharded path: "ab/cd/abcd...hash"
    fn get_sharded_path(&self, hash: &str) -> PathBuf {
        let mut path = self.root_path.clone();
        path.push(&hash[0..2]);
        path.push(&hash[2..4]);
        path.push(hash);
        path
    }

    /// Validates, stores and thumbnails `file`.
    pub async fn process(&self, file: &UploadFile) -> anyhow::Result<UploadDescriptor> {
        if file.data.is_empty() {
            return Err(AppError::Validation(format!("{} is empty", file.name)).into());
        }
        if file.data.len() > self.max_size {
            return Err(AppError::Validation(format!(
                "{} exceeds {} bytes",
                file.name, self.max_size
            ))
            .into());
        }
        match mime_guess::from_path(&file.name).first() {
            Some(m) if m.type_() == mime::IMAGE => {}
            other => {
                return Err(AppError::Validation(format!(
                    "{}: unsupported file type {:?}",
                    file.name,
                    other.map(|m| m.essence_str().to_owned())
                ))
                .into())
            }
        }

        // 1. Content address
        let hash = hex::encode(Sha256::digest(&file.data));
        let target_path = self.get_sharded_path(&hash);
        let parent = target_path
            .parent()
            .ok_or_else(|| AppError::Upload(format!("no parent for {}", target_path.display())))?;

        // 2. Ensure directory exists
        fs::create_dir_all(parent).await?;

        // 3. Save original and thumbnail (if not stored already)
        if fs::metadata(&target_path).await.is_err() {
            generate_thumbnail(file.data.clone(), parent.join(format!("thumb_{hash}.webp"))).await?;
            fs::write(&target_path, &file.data).await?;
        }

        log::info!("stored upload {} as {}", file.name, hash);
        Ok(UploadDescriptor {
            token: hash,
            name: file.name.clone(),
            spoiler: file.spoiler,
        })
    }

    async fn attempt(&self, file: UploadFile) -> Option<UploadDescriptor> {
        match self.process(&file).await {
            Ok(descriptor) => {
                *self.last_failed.lock().await = None;
                Some(descriptor)
            }
            Err(e) => {
                log::warn!("upload of {} failed: {e:#}", file.name);
                *self.last_failed.lock().await = Some(file);
                None
            }
        }
    }
}

/// Decodes `data` and writes a WebP thumbnail to `thumb_path`.
async fn generate_thumbnail(data: Vec<u8>, thumb_path: PathBuf) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || write_thumbnail(&data, &thumb_path)).await?
}

fn write_thumbnail(data: &[u8], thumb_path: &Path) -> anyhow::Result<()> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()
        .map_err(|e| AppError::Upload(format!("undecodable image: {e}")))?;

    // The WebP encoder only takes 8-bit RGB(A)
    let thumb = DynamicImage::ImageRgba8(img.thumbnail(THUMB_SIZE, THUMB_SIZE).to_rgba8());
    thumb.save_with_format(thumb_path, ImageFormat::WebP)?;
    Ok(())
}

#[async_trait]
impl UploadService for LocalUploader {
    async fn upload(&self, file: UploadFile) -> Option<UploadDescriptor> {
        self.attempt(file).await
    }

    async fn retry(&self) -> Option<UploadDescriptor> {
        let file = self.last_failed.lock().await.take()?;
        log::debug!("retrying upload of {}", file.name);
        self.attempt(file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgb([200u8, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn file(name: &str, data: Vec<u8>) -> UploadFile {
        UploadFile { name: name.into(), data, spoiler: false }
    }

    #[tokio::test]
    async fn test_upload_stores_original_and_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = LocalUploader::new(dir.path().to_path_buf());

        let descriptor = uploader.upload(file("cat.png", png(600, 300))).await.unwrap();
        assert_eq!(descriptor.token.len(), 64);
        assert_eq!(descriptor.name, "cat.png");

        let original = uploader.get_sharded_path(&descriptor.token);
        assert!(original.exists());
        let thumb = original
            .parent()
            .unwrap()
            .join(format!("thumb_{}.webp", descriptor.token));
        let thumb = image::open(thumb).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (250, 125));
    }

    #[tokio::test]
    async fn test_identical_files_share_a_token() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = LocalUploader::new(dir.path().to_path_buf());
        let a = uploader.upload(file("a.png", png(4, 4))).await.unwrap();
        let b = uploader.upload(file("b.png", png(4, 4))).await.unwrap();
        assert_eq!(a.token, b.token);
        assert_eq!(b.name, "b.png");
    }

    #[tokio::test]
    async fn test_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = LocalUploader::new(dir.path().to_path_buf());
        assert!(uploader.upload(file("notes.txt", b"hello".to_vec())).await.is_none());
        assert!(uploader.upload(file("fake.png", b"not a png".to_vec())).await.is_none());
        assert!(uploader.upload(file("empty.png", Vec::new())).await.is_none());
    }

    #[tokio::test]
    async fn test_rejects_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = LocalUploader::new(dir.path().to_path_buf()).with_max_size(16);
        assert!(uploader.upload(file("cat.png", png(8, 8))).await.is_none());
    }

    #[tokio::test]
    async fn test_retry_reprocesses_last_failure() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("uploads");
        // A plain file where the upload directory should be makes storing fail
        std::fs::write(&root, b"in the way").unwrap();
        let uploader = LocalUploader::new(root.clone());

        assert!(uploader.upload(file("cat.png", png(4, 4))).await.is_none());

        std::fs::remove_file(&root).unwrap();
        let descriptor = uploader.retry().await.unwrap();
        assert_eq!(descriptor.name, "cat.png");

        // Nothing left to retry
        assert!(uploader.retry().await.is_none());
    }
}
