use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Error that occurs when reading a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to read file `{path}`: {source}")]
pub struct FileReadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FileReadError {
    pub fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the file did not exist.
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// Reads the whole file at the given path.
///
/// # Errors
///
/// Returns a [`FileReadError`] if the file cannot be read.
///
/// # Example
/// ```no_run
/// # use podscope::fsutil;
/// let manifest = fsutil::read_file("/var/lib/rkt/pods/run/some-pod/pod")?;
/// # Ok::<(), fsutil::FileReadError>(())
/// ```
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, FileReadError> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|source| FileReadError::new(path, source))
}

/// Reads a file holding a single decimal integer, ignoring surrounding whitespace.
///
/// # Errors
///
/// Returns a [`FileReadError`] if the file cannot be read or does not contain an
/// integer. Parse failures are reported with [`io::ErrorKind::InvalidData`].
pub fn read_int_from_file(path: impl AsRef<Path>) -> Result<i32, FileReadError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| FileReadError::new(path, source))?;
    raw.trim().parse::<i32>().map_err(|err| {
        FileReadError::new(path, io::Error::new(io::ErrorKind::InvalidData, err))
    })
}

/// Returns the modification time of `path`, or `None` if it does not exist.
pub fn modified_time(path: impl AsRef<Path>) -> Result<Option<SystemTime>, FileReadError> {
    let path = path.as_ref();
    match std::fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(time) => Ok(Some(time)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(FileReadError::new(path, err)),
    }
}
