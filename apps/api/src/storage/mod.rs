//! Storage adapters for the blob filesystem and key-value store.
//!
//! Both are external collaborators: the service never interprets what they hold
//! beyond the resume record JSON. Handlers and the upload flow only see the
//! `BlobStore` / `KvStore` traits carried in `AppState`.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

pub mod local;
pub mod memory;
pub mod redis_kv;
pub mod s3;

pub use local::FsBlobStore;
pub use memory::MemoryKv;
pub use redis_kv::RedisKv;
pub use s3::S3BlobStore;

/// Handle returned by a successful blob upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBlob {
    pub path: String,
    pub name: String,
    pub size: u64,
}

/// Blob filesystem: upload by name, read back by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredBlob, AppError>;

    /// `Ok(None)` when nothing is stored at `path`.
    async fn read(&self, path: &str) -> Result<Option<Bytes>, AppError>;
}

/// String-keyed, string-valued store. No transactions.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
    /// All `(key, value)` pairs whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>, AppError>;
}

/// Builds a collision-free storage path for an uploaded file.
pub fn blob_path(file_name: &str) -> String {
    format!("uploads/{}/{}", Uuid::new_v4(), sanitize_file_name(file_name))
}

/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
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
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_directories_and_odd_chars() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\cv\\my resume.pdf"), "my_resume.pdf");
        assert_eq!(sanitize_file_name("..."), "file");
    }

    #[test]
    fn test_blob_paths_are_unique() {
        let a = blob_path("resume.pdf");
        let b = blob_path("resume.pdf");
        assert_ne!(a, b);
        assert!(a.starts_with("uploads/"));
        assert!(a.ends_with("/resume.pdf"));
    }
}
