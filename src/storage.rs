/*!
 * # Photo Storage Boundary
 *
 * The platform stores originals and watermarked previews in object storage.
 * This module exposes the storage surface the rest of the service consumes:
 * upload, bulk delete, and signed download URLs. The production backend is an
 * S3-compatible store; the in-memory implementation backs development and
 * tests.
 */

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::config::StorageConfig;

type HmacSha256 = Hmac<Sha256>;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Upload failed: {0}")]
    UploadFailed(String),
    #[error("Invalid signing key")]
    InvalidKey,
}

/// Object ACL, mirroring the subset of S3 ACLs the platform uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAcl {
    Private,
    PublicRead,
}

/// Storage surface consumed by the catalog and entitlement paths.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Stores an object under `key` and returns its public URL.
    async fn upload(&self, key: &str, body: Vec<u8>, acl: ObjectAcl)
        -> Result<String, StorageError>;

    /// Deletes a batch of objects. Missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> Result<(), StorageError>;

    /// Produces a time-limited signed URL granting download access to `key`.
    fn signed_url(&self, key: &str, ttl_secs: u64) -> String;
}

/// In-memory storage used by development and the test harness. Objects live
/// in a process-local map; signed URLs carry a real HMAC so URL-shape
/// assertions behave like production.
#[derive(Debug)]
pub struct InMemoryPhotoStorage {
    objects: DashMap<String, Vec<u8>>,
    base_url: String,
    signing_secret: String,
}

impl InMemoryPhotoStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            objects: DashMap::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            signing_secret: config.signing_secret.clone(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

#[async_trait]
impl PhotoStorage for InMemoryPhotoStorage {
    async fn upload(
        &self,
        key: &str,
        body: Vec<u8>,
        _acl: ObjectAcl,
    ) -> Result<String, StorageError> {
        if key.is_empty() {
            return Err(StorageError::UploadFailed("empty key".to_string()));
        }
        self.objects.insert(key.to_string(), body);
        Ok(format!("{}/{}", self.base_url, key))
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            self.objects.remove(key);
        }
        Ok(())
    }

    fn signed_url(&self, key: &str, ttl_secs: u64) -> String {
        let expires = Utc::now().timestamp() + ttl_secs as i64;
        let signature = sign_download(&self.signing_secret, key, expires);
        format!(
            "{}/{}?expires={}&signature={}",
            self.base_url, key, expires, signature
        )
    }
}

/// HMAC over `key` and expiry, hex-encoded, matching what the CDN edge
/// verifies before serving an original.
fn sign_download(secret: &str, key: &str, expires: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(key.as_bytes());
    mac.update(b"\n");
    mac.update(expires.to_string().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
