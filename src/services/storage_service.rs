//! src/services/storage_service.rs
//!
//! StorageService — tiered paste storage backed by SQLite for inline records
//! and local disk for large payloads. Content below the inline threshold is
//! encoded into the relational `content` column; content above it leaves a
//! sentinel in the row and lands as raw bytes beneath
//! `base_path/{shard}/{shard}/{key}`.

use crate::models::{
    content::{ContentKind, StoredContent},
    paste::{PasteMetadata, PasteRecord},
};
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

/// Hard ceiling on accepted content.
pub const MAX_CONTENT_BYTES: usize = 15 * 1024 * 1024;

/// Largest payload kept inline in the relational row (~0.99 MiB).
pub const INLINE_MAX_BYTES: usize = 1024 * 1024 * 99 / 100;

const MAX_KEY_LEN: usize = 256;

/// Tunables handed to the service explicitly, so tier boundaries and key
/// length are testable without ambient environment state.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Public URL prefix echoed back after an upload.
    pub base_url: String,

    /// Length of generated keys.
    pub key_length: usize,

    /// Reject content above this size.
    pub max_content_bytes: usize,

    /// Route content above this size to the external tier.
    pub inline_max_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/".into(),
            key_length: 6,
            max_content_bytes: MAX_CONTENT_BYTES,
            inline_max_bytes: INLINE_MAX_BYTES,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("content of {size} bytes exceeds the {limit} byte limit")]
    ContentTooLarge { size: usize, limit: usize },
    #[error("invalid paste key")]
    InvalidKey,
    #[error("paste `{0}` not found")]
    PasteNotFound(String),
    #[error("not authorized to delete paste `{0}`")]
    Unauthorized(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Decoded paste bytes plus the storage form they came from.
///
/// The form matters to rendering: tagged-binary content must never be probed
/// as text again.
#[derive(Debug)]
pub struct PasteContent {
    pub bytes: Vec<u8>,
    pub kind: ContentKind,
}

/// StorageService provides the paste operations:
/// - Store (encode small content into the row, spill large content to disk)
/// - Load (reverse the tiering and encoding to recover the original bytes)
/// - Delete (creator-IP gated, removes both tiers)
///
/// Each request works against the shared pool and the object root; there is
/// no in-process state beyond them. Store is an atomic insert-or-replace per
/// key; the two-tier write for large content is not transactional across
/// stores, and a failed external write after the row write leaves a dangling
/// sentinel that later reads surface as NotFound.
#[derive(Clone)]
pub struct StorageService {
    /// Shared SQLite connection pool for the inline tier.
    pub db: Arc<SqlitePool>,

    /// Root directory of the external large-object tier.
    pub base_path: PathBuf,

    /// Explicit tunables (thresholds, key length, base URL).
    pub config: ServiceConfig,
}

impl StorageService {
    /// Create a new StorageService backed by the provided SQLite pool and
    /// using `base_path` as the root directory for large payloads.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>, config: ServiceConfig) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            config,
        }
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Keys name files beneath the object root, so reject anything that
    /// could escape it. Generated keys always pass; this guards
    /// caller-chosen slugs.
    fn ensure_key_safe(&self, key: &str) -> StorageResult<()> {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(StorageError::InvalidKey);
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(StorageError::InvalidKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StorageError::InvalidKey);
        }
        Ok(())
    }

    /// Generate two-level shard identifiers for a key.
    ///
    /// Uses MD5(key) and returns the first two bytes as lowercase hex
    /// (00–ff). Keeps file counts per directory bounded.
    fn object_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Construct the payload path for a key under the object root.
    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Fetch the relational row for `key`.
    async fn fetch_paste(&self, key: &str) -> StorageResult<PasteRecord> {
        sqlx::query_as::<_, PasteRecord>("SELECT key, content, metadata FROM pastes WHERE key = ?")
            .bind(key)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => StorageError::PasteNotFound(key.to_string()),
                other => StorageError::Sqlx(other),
            })
    }

    /// Store content under `key`, overwriting any previous record there.
    ///
    /// Content above the inline threshold writes the sentinel row first and
    /// the raw bytes to the external tier second; everything else encodes
    /// into the row directly. Content above the hard ceiling is rejected
    /// before anything is persisted.
    pub async fn store_paste(&self, key: &str, bytes: &[u8], ip: &str) -> StorageResult<()> {
        self.ensure_key_safe(key)?;
        if bytes.len() > self.config.max_content_bytes {
            return Err(StorageError::ContentTooLarge {
                size: bytes.len(),
                limit: self.config.max_content_bytes,
            });
        }

        let metadata = serde_json::to_string(&PasteMetadata::new(ip))?;

        if bytes.len() > self.config.inline_max_bytes {
            self.upsert_row(key, &StoredContent::External.into_column(), &metadata)
                .await?;
            self.write_external(key, bytes).await?;
            debug!(key, size = bytes.len(), "stored paste in external tier");
        } else {
            let column = StoredContent::encode(bytes).into_column();
            self.upsert_row(key, &column, &metadata).await?;
            // An earlier oversized paste under this key may have left an
            // external object behind; the row no longer points at it.
            self.remove_external(key).await?;
            debug!(key, size = bytes.len(), "stored paste inline");
        }

        Ok(())
    }

    /// Load and reconstruct the original bytes for `key`.
    ///
    /// A sentinel row without a backing external object reads as NotFound,
    /// not as an internal error.
    pub async fn load_paste(&self, key: &str) -> StorageResult<PasteContent> {
        self.ensure_key_safe(key)?;
        let record = self.fetch_paste(key).await?;
        if record.content.is_empty() {
            return Err(StorageError::PasteNotFound(key.to_string()));
        }

        let stored = StoredContent::from_column(&record.content);
        if matches!(stored, StoredContent::External) {
            let bytes = self.read_external(key).await?;
            return Ok(PasteContent {
                bytes,
                kind: ContentKind::External,
            });
        }

        let Some((bytes, kind)) = stored.decode() else {
            return Err(StorageError::PasteNotFound(key.to_string()));
        };
        Ok(PasteContent { bytes, kind })
    }

    /// Delete `key` after checking the creator IP.
    ///
    /// Unparseable metadata denies the delete the same way a mismatched IP
    /// does. The external object, when present, goes first; the row second.
    pub async fn delete_paste(&self, key: &str, client_ip: &str) -> StorageResult<()> {
        self.ensure_key_safe(key)?;
        let record = self.fetch_paste(key).await?;

        let authorized = serde_json::from_str::<PasteMetadata>(&record.metadata)
            .map(|meta| meta.ip == client_ip)
            .unwrap_or(false);
        if !authorized {
            return Err(StorageError::Unauthorized(key.to_string()));
        }

        if matches!(
            StoredContent::from_column(&record.content),
            StoredContent::External
        ) {
            self.remove_external(key).await?;
        }

        sqlx::query("DELETE FROM pastes WHERE key = ?")
            .bind(key)
            .execute(&*self.db)
            .await?;

        debug!(key, "deleted paste");
        Ok(())
    }

    async fn upsert_row(&self, key: &str, content: &str, metadata: &str) -> StorageResult<()> {
        sqlx::query("INSERT OR REPLACE INTO pastes (key, content, metadata) VALUES (?, ?, ?)")
            .bind(key)
            .bind(content)
            .bind(metadata)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    /// Write raw payload bytes beneath the object root.
    ///
    /// Goes through a temp file with fsync and an atomic rename so a failed
    /// write never leaves a partial object under the final name.
    async fn write_external(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        let file_path = self.object_path(key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = write_and_sync(&mut file, bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }

        Ok(())
    }

    /// Read the raw external payload for `key`.
    async fn read_external(&self, key: &str) -> StorageResult<Vec<u8>> {
        match fs::read(self.object_path(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::PasteNotFound(key.to_string()))
            }
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Remove the external object for `key`, tolerating its absence, and
    /// prune emptied shard directories.
    async fn remove_external(&self, key: &str) -> StorageResult<()> {
        let file_path = self.object_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed external object {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(StorageError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }

        Ok(())
    }

    /// Recursively remove empty shard directories up to the object root.
    ///
    /// Stops at the root, at a non-empty directory, or on unexpected I/O
    /// errors.
    async fn prune_empty_dirs(&self, start: &Path) {
        let stop = self.base_path.as_path();
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

async fn write_and_sync(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}
