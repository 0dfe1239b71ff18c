//! # Media service
//!
//! Admin-only image upload and removal on the media host. A failed upload
//! never touches recipe rows: the editor attaches the returned URL to a
//! recipe in a separate write.

use std::sync::Arc;

use rr_core::{AppError, ImageUpload, MediaHost, RequestContext, Result, UploadedImage};
use tracing::{info, instrument};

/// 10 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub struct MediaService {
    host: Arc<dyn MediaHost>,
    max_upload_bytes: u64,
}

impl MediaService {
    pub fn new(host: Arc<dyn MediaHost>, max_upload_bytes: u64) -> Self {
        Self {
            host,
            max_upload_bytes,
        }
    }

    #[instrument(skip_all, fields(file = %upload.file_name, size = upload.bytes.len()))]
    pub async fn upload(&self, ctx: &RequestContext, upload: ImageUpload) -> Result<UploadedImage> {
        ctx.require_admin()?;

        if upload.content_type.type_() != mime::IMAGE {
            return Err(AppError::validation("file", "file must be an image"));
        }
        if upload.bytes.is_empty() {
            return Err(AppError::validation("file", "file is empty"));
        }
        if upload.bytes.len() as u64 > self.max_upload_bytes {
            return Err(AppError::validation(
                "file",
                format!(
                    "file is too large; the limit is {} MB",
                    self.max_upload_bytes / (1024 * 1024)
                ),
            ));
        }

        let image = self.host.upload(&upload).await?;
        info!(public_id = %image.public_id, width = image.width, height = image.height, "image uploaded");
        Ok(image)
    }

    #[instrument(skip_all, fields(public_id = %public_id))]
    pub async fn delete(&self, ctx: &RequestContext, public_id: &str) -> Result<()> {
        ctx.require_admin()?;
        let public_id = public_id.trim();
        if public_id.is_empty() {
            return Err(AppError::validation("publicId", "public id is required"));
        }
        self.host.delete(public_id).await?;
        info!("image deleted");
        Ok(())
    }
}
