//! Image uploads for club logos, banners and event covers.

use crate::error::{AppError, AppResult};
use anyhow::Context;
use async_trait::async_trait;
use mime::Mime;
use nanoid::nanoid;
use std::path::{Path, PathBuf};
use url::Url;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
const ALLOWED_SUBTYPES: [&str; 3] = ["jpeg", "png", "webp"];

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists the image and returns the public URL it is served from.
    async fn store(&self, bytes: Vec<u8>, content_type: &Mime) -> anyhow::Result<String>;
}

/// Checks an uploaded file before it is stored and returns its sniffed type.
///
/// The declared file name only has to carry an allowed extension; the
/// content itself must be a JPEG, PNG or WebP image.
pub fn validate_image(file_name: Option<&str>, bytes: &[u8], max_bytes: usize) -> AppResult<Mime> {
    if bytes.is_empty() {
        return Err(AppError::bad_request("the uploaded file is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::bad_request(format!(
            "file too large, the limit is {max_bytes} bytes"
        )));
    }

    let ext = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AppError::bad_request(format!(
            "invalid file type, allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    let sniffed = infer::get(bytes)
        .and_then(|kind| kind.mime_type().parse::<Mime>().ok())
        .filter(|m| m.type_() == mime::IMAGE && ALLOWED_SUBTYPES.contains(&m.subtype().as_str()))
        .ok_or_else(|| AppError::bad_request("the file content is not a JPEG, PNG or WebP image"))?;

    Ok(sniffed)
}

fn extension_for(content_type: &Mime) -> &'static str {
    match content_type.subtype().as_str() {
        "png" => "png",
        "webp" => "webp",
        _ => "jpg",
    }
}

/// Writes images below `<assets>/uploads`, which the router serves at
/// `/assets/uploads`.
pub struct LocalImageStore {
    dir: PathBuf,
    base_url: Url,
}

impl LocalImageStore {
    pub fn new(assets_dir: impl Into<PathBuf>, public_url: &Url) -> anyhow::Result<Self> {
        let mut root = public_url.clone();
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let base_url = root
            .join("assets/uploads/")
            .context("PUBLIC_URL cannot be used as a base URL")?;

        Ok(LocalImageStore {
            dir: assets_dir.into().join("uploads"),
            base_url,
        })
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &Mime) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let name = format!("{}.{}", nanoid!(), extension_for(content_type));
        let path = self.dir.join(&name);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        let url = self.base_url.join(&name)?;
        tracing::info!(file = %name, size = bytes.len(), "image stored");
        Ok(url.to_string())
    }
}
