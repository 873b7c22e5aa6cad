//! Access to the pods persisted by the container runtime.
//!
//! The runtime owns every pod directory; this module only reads them. A
//! [`PodStore`] enumerates pods and hands out [`PodHandle`]s, each exposing the
//! independent data sources a pod view is assembled from: the manifest, the
//! lifecycle state, timestamps, process ids, network attachments and the
//! per-app status files.
//!
//! # Key Components
//!
//! - [`PodId`]: A validated pod identifier (UUID).
//! - [`RuntimeState`]: The runtime's internal lifecycle state of a pod.
//! - [`PodStore`] / [`PodHandle`]: Collaborator traits consumed by the views.
//! - [`DirPodStore`]: Read-only store over the runtime's data directory.
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::SystemTime;

mod dir;
mod error;

pub use dir::{DirPod, DirPodStore};
pub use error::{Error, Result};

use crate::manifest::ImageManifest;

/// A validated pod identifier.
///
/// # Examples
///
/// ```
/// # use podscope::pod::PodId;
/// let id: PodId = "6d0ac7b5-7d65-4c5e-b0e5-0b8f9e4c1e2a".parse().unwrap();
/// assert_eq!(id.to_string(), "6d0ac7b5-7d65-4c5e-b0e5-0b8f9e4c1e2a");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PodId(uuid::Uuid);

impl PodId {
    /// Creates a new `PodId` from its textual form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPodID`] if the input is not a UUID.
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        uuid::Uuid::parse_str(src)
            .map(Self)
            .map_err(|source| Error::InvalidPodID {
                id: src.to_owned(),
                source,
            })
    }

    /// The name the pod registers under with the machine registration service.
    pub fn machine_name(&self) -> String {
        format!("rkt-{}", self.0)
    }
}

impl FromStr for PodId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for PodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Lifecycle state of a pod as tracked by the runtime.
///
/// This is richer than the public state exposed by the API; states without a
/// public counterpart are reported as undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Embryo,
    Preparing,
    AbortedPrepare,
    Prepared,
    Running,
    Deleting,
    ExitedDeleting,
    Exited,
    ExitedGarbage,
    Garbage,
}

/// Directory category a pod lives in; each maps to a subdirectory of the pods dir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodDir {
    Embryo,
    Prepare,
    Prepared,
    Run,
    ExitedGarbage,
    Garbage,
}

impl PodDir {
    pub const ALL: [PodDir; 6] = [
        PodDir::Embryo,
        PodDir::Prepare,
        PodDir::Prepared,
        PodDir::Run,
        PodDir::ExitedGarbage,
        PodDir::Garbage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PodDir::Embryo => "embryo",
            PodDir::Prepare => "prepare",
            PodDir::Prepared => "prepared",
            PodDir::Run => "run",
            PodDir::ExitedGarbage => "exited-garbage",
            PodDir::Garbage => "garbage",
        }
    }
}

/// Selects which pod directories a walk visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkPolicy(&'static [PodDir]);

impl WalkPolicy {
    /// Visits every pod directory, including pods that are still being set up
    /// or already collected.
    pub const fn most_dirs() -> Self {
        Self(&PodDir::ALL)
    }

    pub const fn only(dirs: &'static [PodDir]) -> Self {
        Self(dirs)
    }

    pub fn dirs(&self) -> &'static [PodDir] {
        self.0
    }
}

/// A network the pod is attached to.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct NetworkAttachment {
    #[serde(rename = "netName")]
    pub net_name: String,
    #[serde(default)]
    pub ip: String,
}

/// Read access to a single pod.
///
/// Any resources held by a handle are released when it is dropped.
pub trait PodHandle: Send + Sync {
    fn id(&self) -> &PodId;

    /// Reads a file relative to the pod directory.
    fn read_file(&self, name: &str) -> Result<Vec<u8>>;

    fn state(&self) -> RuntimeState;

    fn creation_time(&self) -> Result<Option<SystemTime>>;

    fn start_time(&self) -> Result<Option<SystemTime>>;

    fn gc_marked_time(&self) -> Result<Option<SystemTime>>;

    /// Process id of the pod's supervisor.
    fn pid(&self) -> Result<i32>;

    /// Process id of the first process inside the pod.
    fn primary_process_pid(&self) -> Result<i32>;

    fn networks(&self) -> Result<Vec<NetworkAttachment>>;

    fn app_image_manifest(&self, app_name: &str) -> Result<ImageManifest>;

    /// Directory holding one exit status file per app.
    fn status_dir(&self) -> Result<PathBuf>;

    fn is_running(&self) -> bool {
        self.state() == RuntimeState::Running
    }

    /// Returns `true` once the pod has stopped running.
    fn after_run(&self) -> bool {
        matches!(
            self.state(),
            RuntimeState::Exited
                | RuntimeState::ExitedDeleting
                | RuntimeState::ExitedGarbage
                | RuntimeState::Deleting
                | RuntimeState::Garbage
        )
    }
}

/// Enumerates and opens pods.
pub trait PodStore: Send + Sync {
    /// Opens every pod in the directories selected by `policy`.
    ///
    /// # Errors
    ///
    /// Fails if the store itself cannot be enumerated. Individual pods that
    /// cannot be opened are skipped.
    fn walk(&self, policy: WalkPolicy) -> Result<Vec<Box<dyn PodHandle>>>;

    /// Opens the pod with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no pod directory carries the id.
    fn get(&self, id: &PodId) -> Result<Box<dyn PodHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_id_roundtrip_display() {
        let id = PodId::new("6D0AC7B5-7D65-4C5E-B0E5-0B8F9E4C1E2A").unwrap();
        assert_eq!(id.to_string(), "6d0ac7b5-7d65-4c5e-b0e5-0b8f9e4c1e2a");
        assert_eq!(
            id.machine_name(),
            "rkt-6d0ac7b5-7d65-4c5e-b0e5-0b8f9e4c1e2a"
        );
    }

    #[test]
    fn test_pod_id_invalid() {
        let err = PodId::new("not-a-uuid").unwrap_err();
        match err {
            Error::InvalidPodID { id, .. } => assert_eq!(id, "not-a-uuid"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_most_dirs_visits_all() {
        assert_eq!(WalkPolicy::most_dirs().dirs().len(), PodDir::ALL.len());
        assert_eq!(
            WalkPolicy::only(&[PodDir::Run]).dirs(),
            &[PodDir::Run]
        );
    }
}
