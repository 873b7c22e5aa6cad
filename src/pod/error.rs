use std::path::PathBuf;

use crate::fsutil::FileReadError;

use super::PodId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid pod id `{id}`: {source}")]
    InvalidPodID {
        id: String,
        #[source]
        source: uuid::Error,
    },
    #[error("pod `{0}` not found")]
    NotFound(PodId),
    #[error("failed to read pod directory `{path}`: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to probe lock of pod directory `{path}`: {source}")]
    LockProbe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    File(#[from] FileReadError),
    #[error("invalid manifest `{path}`: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: crate::manifest::Error,
    },
    #[error("invalid network info `{path}`: {source}")]
    NetInfo {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("process {pid} has no child process")]
    NoChildProcess { pid: i32 },
    #[error("invalid child process id `{value}` of process {pid}")]
    InvalidChildPid { pid: i32, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
