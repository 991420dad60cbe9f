/// Local media storage for post images
///
/// Files live at `<upload_dir>/<post_id>/<uuid>.<ext>` and are exposed to
/// clients as `/uploads/<post_id>/<uuid>.<ext>`.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Largest accepted image, in bytes
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Most images a single post may carry
pub const MAX_IMAGES_PER_POST: usize = 10;

pub const PUBLIC_PREFIX: &str = "/uploads";

/// An image read from a multipart payload, not yet stored
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Stored file read back for serving
#[derive(Debug)]
pub struct StoredMedia {
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

pub struct MediaStore {
    root: PathBuf,
}

/// File extension for an accepted image content type
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn content_type_for(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    match ext {
        "jpg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Only names this store generates are served: `<uuid>.<known ext>`
fn is_valid_file_name(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((stem, _)) => Uuid::parse_str(stem).is_ok() && content_type_for(file_name).is_some(),
        None => false,
    }
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn post_dir(&self, post_id: Uuid) -> PathBuf {
        self.root.join(post_id.to_string())
    }

    /// Reject uploads with an unsupported type or over the size limit
    pub fn validate(upload: &ImageUpload) -> Result<&'static str> {
        let ext = extension_for(&upload.content_type).ok_or_else(|| {
            AppError::Validation(format!(
                "Unsupported image type '{}'; expected jpeg, png, gif or webp",
                upload.content_type
            ))
        })?;

        if upload.data.is_empty() {
            return Err(AppError::Validation("Image file is empty".to_string()));
        }
        if upload.data.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Validation(format!(
                "Image exceeds the {} MiB limit",
                MAX_IMAGE_BYTES / (1024 * 1024)
            )));
        }

        Ok(ext)
    }

    /// Write one image and return its public path
    pub async fn save_image(&self, post_id: Uuid, upload: &ImageUpload) -> Result<String> {
        let ext = Self::validate(upload)?;
        let dir = self.post_dir(post_id);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(dir.join(&file_name), &upload.data).await?;

        tracing::debug!(%post_id, %file_name, bytes = upload.data.len(), "image stored");
        Ok(format!("{}/{}/{}", PUBLIC_PREFIX, post_id, file_name))
    }

    /// `None` when the name is not one this store could have produced or
    /// the file does not exist
    pub async fn read(&self, post_id: Uuid, file_name: &str) -> Result<Option<StoredMedia>> {
        if !is_valid_file_name(file_name) {
            return Ok(None);
        }
        let Some(content_type) = content_type_for(file_name) else {
            return Ok(None);
        };

        match tokio::fs::read(self.post_dir(post_id).join(file_name)).await {
            Ok(data) => Ok(Some(StoredMedia { content_type, data })),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Delete files written by `save_image` that never made it onto the post.
    /// Paths outside this store are skipped.
    pub async fn remove_images(&self, post_id: Uuid, paths: &[String]) {
        let prefix = format!("{}/{}/", PUBLIC_PREFIX, post_id);
        for path in paths {
            let Some(file_name) = path.strip_prefix(&prefix) else {
                continue;
            };
            if !is_valid_file_name(file_name) {
                continue;
            }

            match tokio::fs::remove_file(self.post_dir(post_id).join(file_name)).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::warn!(%post_id, %file_name, "failed to remove image: {}", err)
                }
            }
        }
    }

    /// Delete every file stored for a post; a missing directory is fine
    pub async fn remove_post_media(&self, post_id: Uuid) -> Result<()> {
        match tokio::fs::remove_dir_all(self.post_dir(post_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
