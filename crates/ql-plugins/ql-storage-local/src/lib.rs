//! # ql-storage-local
//! quill/crates/ql-plugins/ql-storage-local/src/lib.rs
//! Local filesystem implementation of `MediaStore`.
//! Features: Content-addressable storage, directory sharding, and thumbnailing.

use std::io::Cursor;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use image::io::Reader as ImageReader;
use image::ImageFormat;
use ql_core::error::AppError;
use ql_core::traits::MediaStore;
use sha2::{Digest, Sha256};
use tokio::fs;

/// Bounding box of generated thumbnails, matching the feed's image slot.
pub const THUMB_WIDTH: u32 = 960;
pub const THUMB_HEIGHT: u32 = 339;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/media")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        let url_prefix = url_prefix.trim_end_matches('/').to_string();
        Self {
            root_path: root,
            url_prefix,
        }
    }

    /// Relative shard directory for a media id: "ab/cd"
    fn shard(media_id: &str) -> Option<(&str, &str)> {
        Some((media_id.get(0..2)?, media_id.get(2..4)?))
    }

    /// Generates a sharded path: "ab/cd/<name>"
    fn get_sharded_path(&self, media_id: &str, name: &str) -> PathBuf {
        let mut path = self.root_path.clone();
        if let Some((a, b)) = Self::shard(media_id) {
            path.push(a);
            path.push(b);
        }
        path.push(name);
        path
    }

    fn public_url(&self, media_id: &str, name: &str) -> String {
        match Self::shard(media_id) {
            Some((a, b)) => format!("{}/{}/{}/{}", self.url_prefix, a, b, name),
            None => format!("{}/{}", self.url_prefix, name),
        }
    }

    fn thumbnail_name(media_id: &str) -> String {
        let stem = media_id.split('.').next().unwrap_or(media_id);
        format!("thumb_{stem}.png")
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Decodes the whole image; a recognizable header alone is not enough.
    fn check_image(&self, data: &[u8]) -> ql_core::Result<()> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        if reader.format().is_none() {
            return Err(AppError::ValidationError("unrecognized image format".into()));
        }
        reader
            .decode()
            .map(|_| ())
            .map_err(|e| AppError::ValidationError(e.to_string()))
    }

    /// Saves an upload using its SHA-256 hash as the filename.
    /// This automatically deduplicates files.
    async fn save_upload(&self, data: Vec<u8>, filename: &str) -> anyhow::Result<String> {
        let format = image::guess_format(&data)
            .with_context(|| format!("unrecognized upload {filename:?}"))?;
        let ext = format.extensions_str().first().copied().unwrap_or("img");

        // 1. Calculate Hash
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let hash = hex::encode(hasher.finalize());
        let media_id = format!("{hash}.{ext}");

        let target_path = self.get_sharded_path(&media_id, &media_id);
        let parent = target_path
            .parent()
            .context("media path has no parent directory")?;

        // 2. Ensure directory exists
        fs::create_dir_all(parent).await?;

        // 3. Save Original (if not exists)
        if !fs::try_exists(&target_path).await? {
            fs::write(&target_path, &data).await?;

            // 4. Generate Thumbnail
            let thumb_path = self.get_sharded_path(&media_id, &Self::thumbnail_name(&media_id));
            generate_thumbnail(data, format, thumb_path).await?;
            log::debug!("stored upload {filename:?} as {media_id}");
        }

        Ok(media_id)
    }

    async fn get_url(&self, media_id: &str) -> String {
        self.public_url(media_id, media_id)
    }

    async fn get_thumbnail_url(&self, media_id: &str) -> String {
        self.public_url(media_id, &Self::thumbnail_name(media_id))
    }
}

/// Fits the image into the thumbnail box and writes it as PNG.
async fn generate_thumbnail(
    data: Vec<u8>,
    format: ImageFormat,
    thumb_path: PathBuf,
) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let img = image::load_from_memory_with_format(&data, format)?;
        let thumb = img.thumbnail(THUMB_WIDTH, THUMB_HEIGHT);
        thumb.save_with_format(&thumb_path, ImageFormat::Png)?;
        Ok(())
    })
    .await
    .context("thumbnail task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, RgbImage};

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 3));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageOutputFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "/media".into());
        assert!(store.check_image(&[0xED, 0x95, 0x9C]).is_err());
        assert!(store.check_image(&[]).is_err());
        assert!(store.check_image(&png_bytes()).is_ok());
    }

    #[test]
    fn rejects_truncated_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "/media".into());
        let png = png_bytes();
        assert!(store.check_image(&png[..png.len() / 2]).is_err());
    }

    #[tokio::test]
    async fn saves_sharded_and_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "/media/".into());

        let first = store.save_upload(png_bytes(), "a.png").await.unwrap();
        let second = store.save_upload(png_bytes(), "b.png").await.unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with(".png"));

        let original = dir.path().join(&first[0..2]).join(&first[2..4]).join(&first);
        assert!(original.exists());
        let thumb = original
            .parent()
            .unwrap()
            .join(LocalMediaStore::thumbnail_name(&first));
        assert!(thumb.exists());

        let url = store.get_url(&first).await;
        assert_eq!(url, format!("/media/{}/{}/{}", &first[0..2], &first[2..4], first));
        assert!(store.get_thumbnail_url(&first).await.ends_with(".png"));
    }
}
