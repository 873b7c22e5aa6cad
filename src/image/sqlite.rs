use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::fsutil;

use super::{Error, ImageRecord, ImageStore, Result};

const KEY_PREFIX: &str = "sha512-";
/// Prefix plus the hex encoding of a sha512 digest.
const FULL_KEY_LEN: usize = KEY_PREFIX.len() + 128;
const MIN_KEY_LEN: usize = KEY_PREFIX.len() + 2;

const SELECT_RECORDS: &str = r#"
SELECT blobkey, name, importtime, latest, size, treestoresize
FROM aciinfo
"#;

/// [`ImageStore`] over the runtime's SQLite image database.
#[derive(Debug, Clone)]
pub struct SqliteImageStore {
    db: SqlitePool,
    manifests_dir: PathBuf,
}

impl SqliteImageStore {
    pub fn new(db: SqlitePool, manifests_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            manifests_dir: manifests_dir.into(),
        }
    }

    /// Opens the database at `db_path` read-only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the database cannot be opened.
    pub async fn connect(db_path: impl AsRef<Path>, manifests_dir: impl Into<PathBuf>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path.as_ref())
            .read_only(true);
        let db = SqlitePoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(10))
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(Error::Connection)?;
        Ok(Self::new(db, manifests_dir))
    }

    async fn resolve_key_prefix(&self, id: &str) -> Result<String> {
        let key = id.to_ascii_lowercase();
        if key.len() < MIN_KEY_LEN {
            return Err(Error::InvalidKey {
                key,
                reason: "image ID too short",
            });
        }
        if key.len() > FULL_KEY_LEN {
            return Err(Error::InvalidKey {
                key,
                reason: "image ID too long",
            });
        }
        if key.len() == FULL_KEY_LEN {
            return Ok(key);
        }

        let keys: Vec<(String,)> = sqlx::query_as(
            "SELECT blobkey FROM aciinfo WHERE substr(blobkey, 1, length(?1)) = ?1",
        )
        .bind(&key)
        .fetch_all(&self.db)
        .await
        .map_err(Error::Query)?;

        match keys.as_slice() {
            [] => Err(Error::NotFound(id.to_owned())),
            [(found,)] => Ok(found.clone()),
            _ => Err(Error::Ambiguous {
                id: id.to_owned(),
                count: keys.len(),
            }),
        }
    }

    async fn resolve_name(&self, name: &str) -> Result<String> {
        let records: Vec<ImageRecord> =
            sqlx::query_as(&format!("{SELECT_RECORDS} WHERE name = ? ORDER BY importtime DESC"))
                .bind(name)
                .fetch_all(&self.db)
                .await
                .map_err(Error::Query)?;

        if let Some(latest) = records.iter().find(|record| record.latest) {
            return Ok(latest.blob_key.clone());
        }
        match records.as_slice() {
            [] => Err(Error::NotFound(name.to_owned())),
            [record] => Ok(record.blob_key.clone()),
            _ => Err(Error::Ambiguous {
                id: name.to_owned(),
                count: records.len(),
            }),
        }
    }
}

#[async_trait]
impl ImageStore for SqliteImageStore {
    async fn resolve_key(&self, id: &str) -> Result<String> {
        let has_key_prefix = id
            .get(..KEY_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(KEY_PREFIX));
        if has_key_prefix {
            self.resolve_key_prefix(id).await
        } else {
            self.resolve_name(id).await
        }
    }

    async fn manifest_bytes(&self, key: &str) -> Result<Vec<u8>> {
        if key.is_empty() || key.contains('/') || key.starts_with('.') {
            return Err(Error::InvalidKey {
                key: key.to_owned(),
                reason: "not a store key",
            });
        }
        Ok(fsutil::read_file(self.manifests_dir.join(key))?)
    }

    async fn all_records(&self) -> Result<Vec<ImageRecord>> {
        sqlx::query_as(&format!("{SELECT_RECORDS} ORDER BY importtime, blobkey"))
            .fetch_all(&self.db)
            .await
            .map_err(Error::Query)
    }

    async fn record(&self, key: &str) -> Result<ImageRecord> {
        sqlx::query_as(&format!("{SELECT_RECORDS} WHERE blobkey = ?"))
            .bind(key)
            .fetch_optional(&self.db)
            .await
            .map_err(Error::Query)?
            .ok_or_else(|| Error::NotFound(key.to_owned()))
    }
}
