//! Read access to the image store.
//!
//! Image records (content key, name, import time, sizes) live in a small
//! database; the image manifests are kept next to it, one file per key. The
//! records are owned by the runtime's fetch and garbage collection and are
//! never modified here.
use async_trait::async_trait;

mod sqlite;

pub use sqlite::SqliteImageStore;

use crate::fsutil::FileReadError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("image `{0}` not found")]
    NotFound(String),
    #[error("image id `{id}` is ambiguous ({count} matches)")]
    Ambiguous { id: String, count: usize },
    #[error("invalid image key `{key}`: {reason}")]
    InvalidKey { key: String, reason: &'static str },
    #[error("failed to connect to image store: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("failed to query image store: {0}")]
    Query(#[source] sqlx::Error),
    #[error(transparent)]
    Manifest(#[from] FileReadError),
    #[error("invalid manifest for image `{key}`: {source}")]
    InvalidManifest {
        key: String,
        #[source]
        source: crate::manifest::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// One stored image as recorded by the image store.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ImageRecord {
    #[sqlx(rename = "blobkey")]
    pub blob_key: String,
    pub name: String,
    /// Import time in UNIX epoch seconds.
    #[sqlx(rename = "importtime")]
    pub import_time: i64,
    pub latest: bool,
    /// Size of the image blob in bytes.
    pub size: i64,
    /// Size of the rendered filesystem tree in bytes, 0 if not rendered.
    #[sqlx(rename = "treestoresize")]
    pub tree_store_size: i64,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Resolves a full key, a key prefix or an image name to a canonical key.
    async fn resolve_key(&self, id: &str) -> Result<String>;

    /// Returns the raw manifest stored for `key`.
    async fn manifest_bytes(&self, key: &str) -> Result<Vec<u8>>;

    /// Returns all image records, oldest import first.
    async fn all_records(&self) -> Result<Vec<ImageRecord>>;

    async fn record(&self, key: &str) -> Result<ImageRecord>;
}
