//! Uploaded image storage on the local filesystem
//!
//! Images live under `<root>/posts/<uuid>.<ext>`; the database stores the
//! path relative to the root.

use std::path::{Component, Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::forms::ImageUpload;

/// Sub-directory holding post images
pub const POSTS_DIR: &str = "posts";

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write an image and return its relative path
    pub async fn save_post_image(&self, image: &ImageUpload) -> Result<String> {
        let dir = self.root.join(POSTS_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!("{}.{}", Uuid::new_v4(), image.extension);
        tokio::fs::write(dir.join(&name), &image.bytes).await?;

        let relative = format!("{}/{}", POSTS_DIR, name);
        info!(path = %relative, bytes = image.bytes.len(), "stored post image");
        Ok(relative)
    }

    /// Resolve a relative media path; `None` for anything that could escape
    /// the root (absolute paths, `..`, empty segments)
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        if relative.is_empty() || path.components().any(|c| !matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(path))
    }

    /// Read a stored file; `None` if it is missing or the path is rejected
    pub async fn read(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.resolve(relative) else {
            return Ok(None);
        };
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        Ok(Some(tokio::fs::read(&path).await?))
    }

    /// Remove a stored file, ignoring files that are already gone
    pub async fn remove(&self, relative: &str) -> Result<()> {
        let Some(path) = self.resolve(relative) else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Content type for a stored file, by extension
pub fn content_type_for(relative: &str) -> &'static str {
    let ext = Path::new(relative)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("gif") => "image/gif",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
