//! # rr-storage-local
//! rusty-recipes/crates/rr-plugins/rr-storage-local/src/lib.rs
//! Local filesystem implementation of `MediaHost`.
//! Features: content-addressable storage, directory sharding, and
//! downsizing to WebP.

use std::io::{self, Cursor};
use std::path::PathBuf;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use rr_core::error::{AppError, Result};
use rr_core::models::{ImageUpload, UploadedImage};
use rr_core::traits::MediaHost;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, error};

pub struct LocalMediaHost {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
    max_width: u32,
    max_height: u32,
}

struct Processed {
    webp: Vec<u8>,
    width: u32,
    height: u32,
}

impl LocalMediaHost {
    pub fn new(root: PathBuf, url_prefix: String, max_width: u32, max_height: u32) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            max_width,
            max_height,
        }
    }

    /// Generates a sharded path: "ab/cd/abcd...hash.webp"
    fn sharded_path(&self, hash: &str) -> PathBuf {
        let mut path = self.root_path.clone();
        path.push(&hash[0..2]);
        path.push(&hash[2..4]);
        path.push(format!("{hash}.webp"));
        path
    }

    fn public_url(&self, hash: &str) -> String {
        format!("{}/{}/{}/{}.webp", self.url_prefix, &hash[0..2], &hash[2..4], hash)
    }

    /// Decodes, shrinks to fit the bounds (never enlarging), and re-encodes.
    fn process(bytes: &[u8], max_width: u32, max_height: u32) -> Result<Processed> {
        let img = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|_| unreadable())?
            .decode()
            .map_err(|_| unreadable())?;

        let img = if img.width() > max_width || img.height() > max_height {
            img.resize(max_width, max_height, FilterType::Lanczos3)
        } else {
            img
        };

        // The WebP encoder only accepts 8-bit buffers.
        let img = DynamicImage::ImageRgba8(img.to_rgba8());
        let mut webp = Vec::new();
        img.write_to(&mut Cursor::new(&mut webp), ImageFormat::WebP)
            .map_err(|err| {
                error!(error = %err, "webp encoding failed");
                AppError::internal("image encoding failed")
            })?;

        Ok(Processed {
            webp,
            width: img.width(),
            height: img.height(),
        })
    }
}

fn unreadable() -> AppError {
    AppError::validation("file", "file is not a readable image")
}

fn upstream(action: &str, err: io::Error) -> AppError {
    error!(action, error = %err, "media storage failed");
    AppError::Upstream(format!("{action} failed"))
}

fn is_digest(id: &str) -> bool {
    id.len() == 64 && id.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

#[async_trait]
impl MediaHost for LocalMediaHost {
    /// Saves an upload under the SHA-256 of its encoded form.
    /// Identical results deduplicate to one file.
    async fn upload(&self, upload: &ImageUpload) -> Result<UploadedImage> {
        let bytes = upload.bytes.clone();
        let (max_width, max_height) = (self.max_width, self.max_height);
        let processed = tokio::task::spawn_blocking(move || Self::process(&bytes, max_width, max_height))
            .await
            .map_err(|err| AppError::internal(format!("image worker failed: {err}")))??;

        let hash = hex::encode(Sha256::digest(&processed.webp));
        let target_path = self.sharded_path(&hash);
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| upstream("creating upload directory", err))?;
        }

        let already_stored = fs::try_exists(&target_path)
            .await
            .map_err(|err| upstream("checking image", err))?;
        if already_stored {
            debug!(%hash, "image already stored");
        } else {
            fs::write(&target_path, &processed.webp)
                .await
                .map_err(|err| upstream("writing image", err))?;
        }

        Ok(UploadedImage {
            url: self.public_url(&hash),
            public_id: hash,
            width: processed.width,
            height: processed.height,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        if !is_digest(public_id) {
            return Err(AppError::validation("publicId", "unknown image id"));
        }
        match fs::remove_file(self.sharded_path(public_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(public_id, "image already gone");
                Ok(())
            }
            Err(err) => Err(upstream("removing image", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use image::{Rgb, RgbImage};
    use rr_core::error::ErrorKind;
    use tempfile::TempDir;

    fn host(dir: &TempDir) -> LocalMediaHost {
        LocalMediaHost::new(dir.path().to_path_buf(), "/static/uploads/".into(), 1200, 800)
    }

    fn png(width: u32, height: u32) -> ImageUpload {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        ImageUpload {
            file_name: "borsch.png".into(),
            content_type: mime::IMAGE_PNG,
            bytes: Bytes::from(out),
        }
    }

    #[tokio::test]
    async fn large_images_are_shrunk_keeping_aspect_ratio() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir);

        let stored = host.upload(&png(2400, 1000)).await.unwrap();
        assert_eq!((stored.width, stored.height), (1200, 500));
        assert_eq!(stored.public_id.len(), 64);
        assert_eq!(
            stored.url,
            format!(
                "/static/uploads/{}/{}/{}.webp",
                &stored.public_id[0..2],
                &stored.public_id[2..4],
                stored.public_id
            )
        );
        assert!(host.sharded_path(&stored.public_id).exists());
    }

    #[tokio::test]
    async fn small_images_are_not_enlarged_and_deduplicate() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir);

        let first = host.upload(&png(100, 50)).await.unwrap();
        let second = host.upload(&png(100, 50)).await.unwrap();
        assert_eq!((first.width, first.height), (100, 50));
        assert_eq!(first.public_id, second.public_id);
    }

    #[tokio::test]
    async fn undecodable_bytes_are_a_validation_error() {
        let dir = TempDir::new().unwrap();
        let upload = ImageUpload {
            file_name: "notes.png".into(),
            content_type: mime::IMAGE_PNG,
            bytes: Bytes::from_static(b"definitely not a png"),
        };
        let err = host(&dir).upload(&upload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.field(), Some("file"));
    }

    #[tokio::test]
    async fn delete_removes_file_and_tolerates_missing_assets() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir);
        let stored = host.upload(&png(10, 10)).await.unwrap();

        host.delete(&stored.public_id).await.unwrap();
        assert!(!host.sharded_path(&stored.public_id).exists());
        host.delete(&stored.public_id).await.unwrap();
    }

    #[tokio::test]
    async fn delete_rejects_ids_that_are_not_digests() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir);
        let not_hex = "G".repeat(64);
        for id in ["../../etc/passwd", "abc", not_hex.as_str()] {
            let err = host.delete(id).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "id {id:?}");
        }
    }

    #[tokio::test]
    async fn unusable_upload_root_is_an_upstream_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("uploads");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let host = LocalMediaHost::new(blocker, "/static/uploads/".into(), 1200, 800);

        let err = host.upload(&png(10, 10)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }
}
