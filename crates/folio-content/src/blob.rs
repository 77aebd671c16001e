//! Blob upload clients.
//!
//! An upload is all-or-nothing: the bytes are stored under an
//! application-chosen key and the returned handle resolves to a public URL.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, info};

use crate::error::BlobError;

/// Storage key such as `projectImages/1718000000000-shot.png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey(String);

impl BlobKey {
    pub fn parse(raw: &str) -> Result<Self, BlobError> {
        let valid = !raw.is_empty()
            && !raw.starts_with('/')
            && !raw.contains('\\')
            && raw
                .split('/')
                .all(|s| !s.is_empty() && s != "." && s != ".." && !s.chars().any(char::is_control));
        if !valid {
            return Err(BlobError::InvalidKey(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// `{category}/{unix_ms}-{file_name}` for a file picked by the user.
    pub fn for_upload(category: &str, file_name: &str) -> Result<Self, BlobError> {
        Self::for_upload_at(category, file_name, Utc::now().timestamp_millis())
    }

    pub fn for_upload_at(category: &str, file_name: &str, millis: i64) -> Result<Self, BlobError> {
        Self::parse(&format!("{category}/{millis}-{}", sanitize_file_name(file_name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment, used as the file name when a remote host needs one.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip directories and anything that would need escaping in a URL.
fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Opaque result of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle(String);

impl BlobHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
pub trait BlobUploader: Send + Sync {
    async fn upload(&self, bytes: Bytes, key: &BlobKey) -> Result<BlobHandle, BlobError>;

    async fn public_url(&self, handle: &BlobHandle) -> Result<String, BlobError>;
}

// ---------------------------------------------------------------------------
// Local filesystem store
// ---------------------------------------------------------------------------

/// Verify that a resolved path stays within the expected base directory.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, BlobError> {
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(&canonical_base)
        .unwrap_or(target)
        .components()
    {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::ParentDir => {
                return Err(BlobError::InvalidKey(target.display().to_string()));
            }
            _ => {}
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(BlobError::InvalidKey(target.display().to_string()));
    }
    Ok(resolved)
}

/// Blob store on the local filesystem, served back under
/// `{public_base}/blobs/{key}`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
    max_size: usize,
    public_base: String,
}

impl LocalBlobStore {
    pub async fn new(
        base_path: PathBuf,
        max_size: usize,
        public_base: &str,
    ) -> Result<Self, BlobError> {
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self {
            base_path,
            max_size,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub async fn read(&self, key: &BlobKey) -> Result<Vec<u8>, BlobError> {
        let path = self.safe_blob_path(key)?;
        if !path.is_file() {
            return Err(BlobError::NotFound(key.to_string()));
        }

        let data = fs::read(&path).await?;
        debug!(key = %key, size = data.len(), "Retrieved blob");
        Ok(data)
    }

    pub async fn delete(&self, key: &BlobKey) -> Result<(), BlobError> {
        let path = self.safe_blob_path(key)?;
        if !path.is_file() {
            return Err(BlobError::NotFound(key.to_string()));
        }

        fs::remove_file(&path).await?;
        debug!(key = %key, "Deleted blob");
        Ok(())
    }

    fn safe_blob_path(&self, key: &BlobKey) -> Result<PathBuf, BlobError> {
        let raw = self.base_path.join(key.as_str());
        ensure_within(&self.base_path, &raw)
    }
}

#[async_trait]
impl BlobUploader for LocalBlobStore {
    async fn upload(&self, bytes: Bytes, key: &BlobKey) -> Result<BlobHandle, BlobError> {
        if bytes.is_empty() {
            return Err(BlobError::Empty);
        }
        if bytes.len() > self.max_size {
            return Err(BlobError::TooLarge {
                size: bytes.len(),
                max: self.max_size,
            });
        }

        let path = self.safe_blob_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &bytes).await?;

        debug!(key = %key, size = bytes.len(), "Stored blob");
        Ok(BlobHandle::new(key.as_str()))
    }

    async fn public_url(&self, handle: &BlobHandle) -> Result<String, BlobError> {
        let key = BlobKey::parse(handle.as_str())?;
        Ok(format!("{}/blobs/{}", self.public_base, key))
    }
}

// ---------------------------------------------------------------------------
// Image host
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

/// Unsigned multipart upload to a hosted image service.
#[derive(Debug, Clone)]
pub struct ImageHostClient {
    http: reqwest::Client,
    base_url: String,
    preset: String,
}

impl ImageHostClient {
    pub fn new(base_url: &str, preset: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, preset)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str, preset: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            preset: preset.to_string(),
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/image/upload", self.base_url)
    }
}

#[async_trait]
impl BlobUploader for ImageHostClient {
    async fn upload(&self, bytes: Bytes, key: &BlobKey) -> Result<BlobHandle, BlobError> {
        if bytes.is_empty() {
            return Err(BlobError::Empty);
        }

        let size = bytes.len();
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(key.file_name().to_string());
        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.preset.clone())
            .part("file", part);

        let response: UploadResponse = self
            .http
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let url = response
            .secure_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| BlobError::Rejected("response has no secure_url".to_string()))?;

        debug!(key = %key, size, url = %url, "Uploaded to image host");
        Ok(BlobHandle::new(url))
    }

    async fn public_url(&self, handle: &BlobHandle) -> Result<String, BlobError> {
        Ok(handle.as_str().to_string())
    }
}
