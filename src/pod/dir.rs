use std::fs::{File, TryLockError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::fsutil;
use crate::manifest::ImageManifest;

use super::{
    Error, NetworkAttachment, PodDir, PodHandle, PodId, PodStore, Result, RuntimeState,
    WalkPolicy,
};

/// Read-only [`PodStore`] over the runtime's data directory.
///
/// Pods live in `<data dir>/pods/<category>/<uuid>`, where the category
/// directory together with the advisory lock the runtime holds on a pod
/// directory determines the pod's [`RuntimeState`].
#[derive(Debug, Clone)]
pub struct DirPodStore {
    pods_dir: PathBuf,
    rootfs: PathBuf,
}

impl DirPodStore {
    /// Creates a store for `data_dir`. Process information is read from
    /// `<rootfs>/proc`.
    pub fn new(data_dir: impl AsRef<Path>, rootfs: impl Into<PathBuf>) -> Self {
        Self {
            pods_dir: data_dir.as_ref().join("pods"),
            rootfs: rootfs.into(),
        }
    }

    /// Finds the directory of the pod with the given id, if any.
    pub fn locate(&self, id: &PodId) -> Result<Option<(PodDir, PathBuf)>> {
        for dir in PodDir::ALL {
            let path = self.pods_dir.join(dir.name()).join(id.to_string());
            match path.try_exists() {
                Ok(true) => return Ok(Some((dir, path))),
                Ok(false) => {}
                Err(source) => return Err(Error::ReadDir { path, source }),
            }
        }
        Ok(None)
    }

    /// Opens the pod directory at `path`.
    pub fn open(&self, id: PodId, dir: PodDir, path: PathBuf) -> Result<DirPod> {
        let state = probe_state(dir, &path)?;
        Ok(DirPod {
            id,
            dir,
            path,
            state,
            rootfs: self.rootfs.clone(),
        })
    }

    fn walk_dir(&self, dir: PodDir, out: &mut Vec<Box<dyn PodHandle>>) -> Result<()> {
        let path = self.pods_dir.join(dir.name());
        let entries = match std::fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(source) => return Err(Error::ReadDir { path, source }),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("failed to read entry of `{}`: {}", path.display(), err);
                    continue;
                }
            };
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                log::warn!("skipping non UTF-8 pod entry {:?}", entry.path());
                continue;
            };
            match PodId::new(name) {
                Ok(id) => found.push((id, entry.path())),
                Err(err) => log::warn!("skipping pod entry `{}`: {}", entry.path().display(), err),
            }
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));

        for (id, pod_path) in found {
            match self.open(id, dir, pod_path) {
                Ok(pod) => out.push(Box::new(pod)),
                // The pod may have moved on to another category meanwhile.
                Err(err) => log::warn!("failed to open pod `{}`: {}", id, err),
            }
        }
        Ok(())
    }
}

impl PodStore for DirPodStore {
    fn walk(&self, policy: WalkPolicy) -> Result<Vec<Box<dyn PodHandle>>> {
        let mut pods = Vec::new();
        for dir in policy.dirs() {
            self.walk_dir(*dir, &mut pods)?;
        }
        log::debug!("Found {} pods in `{}`", pods.len(), self.pods_dir.display());
        Ok(pods)
    }

    fn get(&self, id: &PodId) -> Result<Box<dyn PodHandle>> {
        let (dir, path) = self.locate(id)?.ok_or(Error::NotFound(*id))?;
        Ok(Box::new(self.open(*id, dir, path)?))
    }
}

/// Returns `true` if the runtime holds an exclusive lock on the directory.
fn is_locked(path: &Path) -> Result<bool> {
    let dir = File::open(path).map_err(|source| Error::LockProbe {
        path: path.to_path_buf(),
        source,
    })?;
    // The shared lock is released when `dir` is dropped.
    match dir.try_lock_shared() {
        Ok(()) => Ok(false),
        Err(TryLockError::WouldBlock) => Ok(true),
        Err(TryLockError::Error(source)) => Err(Error::LockProbe {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn probe_state(dir: PodDir, path: &Path) -> Result<RuntimeState> {
    let state = match dir {
        PodDir::Embryo => RuntimeState::Embryo,
        PodDir::Prepared => RuntimeState::Prepared,
        PodDir::Prepare if is_locked(path)? => RuntimeState::Preparing,
        PodDir::Prepare => RuntimeState::AbortedPrepare,
        PodDir::Run if is_locked(path)? => RuntimeState::Running,
        PodDir::Run => RuntimeState::Exited,
        PodDir::ExitedGarbage if is_locked(path)? => RuntimeState::ExitedDeleting,
        PodDir::ExitedGarbage => RuntimeState::ExitedGarbage,
        PodDir::Garbage if is_locked(path)? => RuntimeState::Deleting,
        PodDir::Garbage => RuntimeState::Garbage,
    };
    Ok(state)
}

/// A pod opened from a [`DirPodStore`].
#[derive(Debug)]
pub struct DirPod {
    id: PodId,
    dir: PodDir,
    path: PathBuf,
    state: RuntimeState,
    rootfs: PathBuf,
}

impl DirPod {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PodHandle for DirPod {
    fn id(&self) -> &PodId {
        &self.id
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        Ok(fsutil::read_file(self.path.join(name))?)
    }

    fn state(&self) -> RuntimeState {
        self.state
    }

    fn creation_time(&self) -> Result<Option<SystemTime>> {
        Ok(fsutil::modified_time(self.path.join("pod-created"))?)
    }

    fn start_time(&self) -> Result<Option<SystemTime>> {
        Ok(fsutil::modified_time(self.path.join("pid"))?)
    }

    fn gc_marked_time(&self) -> Result<Option<SystemTime>> {
        match self.dir {
            PodDir::ExitedGarbage | PodDir::Garbage => Ok(fsutil::modified_time(&self.path)?),
            _ => Ok(None),
        }
    }

    fn pid(&self) -> Result<i32> {
        Ok(fsutil::read_int_from_file(self.path.join("pid"))?)
    }

    fn primary_process_pid(&self) -> Result<i32> {
        let pid = self.pid()?;
        let children = self
            .rootfs
            .join(format!("proc/{pid}/task/{pid}/children"));
        let raw = fsutil::read_file(&children)?;
        let raw = String::from_utf8_lossy(&raw);
        let first = raw
            .split_whitespace()
            .next()
            .ok_or(Error::NoChildProcess { pid })?;
        first.parse::<i32>().map_err(|_| Error::InvalidChildPid {
            pid,
            value: first.to_owned(),
        })
    }

    fn networks(&self) -> Result<Vec<NetworkAttachment>> {
        let path = self.path.join("net-info.json");
        let data = match fsutil::read_file(&path) {
            Ok(data) => data,
            Err(err) if err.is_not_found() => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&data).map_err(|source| Error::NetInfo { path, source })
    }

    fn app_image_manifest(&self, app_name: &str) -> Result<ImageManifest> {
        let path = self.path.join("appsinfo").join(app_name).join("manifest");
        let data = fsutil::read_file(&path)?;
        ImageManifest::parse(&data).map_err(|source| Error::Manifest { path, source })
    }

    fn status_dir(&self) -> Result<PathBuf> {
        Ok(self.path.join("stage1/rootfs/rkt/status"))
    }
}
