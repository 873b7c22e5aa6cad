//! Streaming of persisted app logs to a subscriber.
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use crate::pod::{self, DirPodStore, PodId};

/// Upper bound of bytes read and pushed per chunk.
pub const CHUNK_SIZE: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Pod(#[from] pod::Error),
    #[error("invalid app name `{0}`")]
    InvalidApp(String),
    #[error("failed to open log `{path}`: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read log: {0}")]
    Read(#[source] std::io::Error),
    #[error("log subscriber went away")]
    SubscriberGone,
}

pub type Result<T> = std::result::Result<T, Error>;

pub type LogReader = Box<dyn AsyncRead + Send + Unpin>;

/// Source of the persisted output of an app.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn open(&self, pod: &PodId, app: &str) -> Result<LogReader>;
}

/// [`LogSource`] reading `<pod dir>/logs/<app>.log`.
#[derive(Debug, Clone)]
pub struct FileLogSource {
    pods: DirPodStore,
}

impl FileLogSource {
    pub fn new(pods: DirPodStore) -> Self {
        Self { pods }
    }
}

#[async_trait]
impl LogSource for FileLogSource {
    async fn open(&self, pod: &PodId, app: &str) -> Result<LogReader> {
        if app.is_empty() || app.contains('/') || app.starts_with('.') {
            return Err(Error::InvalidApp(app.to_owned()));
        }
        let (_, pod_dir) = self
            .pods
            .locate(pod)?
            .ok_or(pod::Error::NotFound(*pod))?;
        let path = pod_dir.join("logs").join(format!("{app}.log"));
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|source| Error::Open { path, source })?;
        Ok(Box::new(file))
    }
}

/// Pushes log chunks to a subscriber as batches of lines.
#[derive(Debug, Clone)]
pub struct LogStreamWriter {
    tx: mpsc::Sender<Vec<String>>,
}

impl LogStreamWriter {
    pub fn new(tx: mpsc::Sender<Vec<String>>) -> Self {
        Self { tx }
    }

    /// Sends the non-empty lines of `chunk` as one batch.
    ///
    /// Lines split across chunks are sent as two lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SubscriberGone`] if the receiver was dropped.
    pub async fn write(&self, chunk: &[u8]) -> Result<()> {
        let lines = String::from_utf8_lossy(chunk)
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        self.tx.send(lines).await.map_err(|_| Error::SubscriberGone)
    }
}

/// Copies `reader` to `writer` chunk by chunk until EOF.
pub async fn pump(mut reader: impl AsyncRead + Unpin, writer: &LogStreamWriter) -> Result<()> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await.map_err(Error::Read)?;
        if n == 0 {
            return Ok(());
        }
        writer.write(&buf[..n]).await?;
    }
}
