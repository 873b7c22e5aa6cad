use std::ffi::OsString;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "/var/lib/rkt";
const DEFAULT_ROOTFS: &str = "/";
const DEFAULT_MACHINES_DIR: &str = "/run/systemd/machines";

/// Locations of the runtime state the service reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root of the pod and image stores.
    pub data_dir: PathBuf,
    /// Host root filesystem, `/proc` is read below it.
    pub rootfs: PathBuf,
    /// State directory of the machine registration service.
    pub machines_dir: PathBuf,
    /// Image database; defaults to `<data dir>/cas/db/ql.sqlite`.
    pub image_db: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            rootfs: PathBuf::from(DEFAULT_ROOTFS),
            machines_dir: PathBuf::from(DEFAULT_MACHINES_DIR),
            image_db: None,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// - `PODSCOPE_DATA_DIR`
    /// - `ROOTFS_MOUNT_PATH`
    /// - `PODSCOPE_MACHINES_DIR`
    /// - `PODSCOPE_IMAGE_DB`
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var_os(name))
    }

    fn from_vars(var: impl Fn(&str) -> Option<OsString>) -> Self {
        let defaults = Self::default();
        let path = |name: &str, default: PathBuf| var(name).map(PathBuf::from).unwrap_or(default);
        Self {
            data_dir: path("PODSCOPE_DATA_DIR", defaults.data_dir),
            rootfs: path("ROOTFS_MOUNT_PATH", defaults.rootfs),
            machines_dir: path("PODSCOPE_MACHINES_DIR", defaults.machines_dir),
            image_db: var("PODSCOPE_IMAGE_DB").map(PathBuf::from),
        }
    }

    pub fn image_db(&self) -> PathBuf {
        self.image_db
            .clone()
            .unwrap_or_else(|| self.data_dir.join("cas/db/ql.sqlite"))
    }

    pub fn image_manifests_dir(&self) -> PathBuf {
        self.data_dir.join("cas/imageManifest")
    }
}
