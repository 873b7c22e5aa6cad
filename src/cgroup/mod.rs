//! Control group lookup for pod processes.
//!
//! Resolves the cgroup a process belongs to by reading `/proc/<pid>/cgroup`
//! below the configured root filesystem.
//!
//! # File format
//!
//! Each line is `<hierarchy-id>:<controller-list>:<cgroup-path>`:
//!
//! - v1: arbitrary hierarchy id, comma-separated controllers (e.g. `cpu,memory`
//!   or named hierarchies such as `name=systemd`).
//! - v2: hierarchy id `0` and an empty controller list.
use std::path::{Path, PathBuf};

use crate::fsutil::{self, FileReadError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    File(#[from] FileReadError),
    #[error("no cgroup for controller `{controller}` in `{path}`")]
    ControllerNotFound { controller: String, path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Resolves the cgroup path of a process.
pub trait CgroupResolver: Send + Sync {
    fn path_for_pid(&self, pid: i32, controller: &str) -> Result<String>;
}

/// [`CgroupResolver`] reading the procfs mounted below `rootfs`.
#[derive(Debug, Clone)]
pub struct ProcCgroupResolver {
    rootfs: PathBuf,
}

impl ProcCgroupResolver {
    pub fn new(rootfs: impl Into<PathBuf>) -> Self {
        Self {
            rootfs: rootfs.into(),
        }
    }
}

impl CgroupResolver for ProcCgroupResolver {
    fn path_for_pid(&self, pid: i32, controller: &str) -> Result<String> {
        let path = self.rootfs.join(format!("proc/{pid}/cgroup"));
        let content = fsutil::read_file(&path)?;
        find_cgroup_path(&String::from_utf8_lossy(&content), controller, &path)
    }
}

/// Picks the path of the hierarchy holding `controller`, falling back to the
/// unified hierarchy.
fn find_cgroup_path(content: &str, controller: &str, origin: &Path) -> Result<String> {
    let mut unified = None;
    for line in content.lines().filter(|line| !line.trim().is_empty()) {
        let cgl = match parse_cgroup_line(line) {
            Ok(cgl) => cgl,
            Err(err) => {
                log::warn!("skipping line of `{}`: {}", origin.display(), err);
                continue;
            }
        };
        if cgl.controller_list.contains(&controller) {
            return Ok(cgl.cgroup_path.to_owned());
        }
        if cgl.hierarchy_id == 0 && cgl.controller_list.is_empty() && unified.is_none() {
            unified = Some(cgl.cgroup_path.to_owned());
        }
    }

    unified.ok_or_else(|| Error::ControllerNotFound {
        controller: controller.to_owned(),
        path: origin.to_path_buf(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum CgroupLineError {
    #[error("invalid cgroup line format: {0}")]
    InvalidFormat(String),
    #[error("invalid hierarchy id in cgroup line: {0}")]
    InvalidHierarchyID(String),
}

#[derive(Debug)]
pub struct CgroupLine<'a> {
    hierarchy_id: u32,
    controller_list: Vec<&'a str>,
    cgroup_path: &'a str,
}

fn parse_cgroup_line(line: &str) -> std::result::Result<CgroupLine<'_>, CgroupLineError> {
    // The path is the remainder and may itself contain colons.
    let mut it = line.splitn(3, ':');
    let hierarchy_id = it
        .next()
        .ok_or_else(|| CgroupLineError::InvalidFormat(line.to_owned()))?
        .parse::<u32>()
        .map_err(|_| CgroupLineError::InvalidHierarchyID(line.to_owned()))?;
    let controller_list = it
        .next()
        .ok_or_else(|| CgroupLineError::InvalidFormat(line.to_owned()))?;
    let controller_list: Vec<&str> = if controller_list.is_empty() {
        Vec::default()
    } else {
        controller_list.split(',').collect()
    };
    let cgroup_path = it
        .next()
        .ok_or_else(|| CgroupLineError::InvalidFormat(line.to_owned()))?;

    Ok(CgroupLine {
        hierarchy_id,
        controller_list,
        cgroup_path: cgroup_path.trim(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const V1: &str = "\
11:memory:/machine.slice/machine-rkt\\x2d1234.scope
2:cpu,cpuacct:/machine.slice
1:name=systemd:/machine.slice/machine-rkt\\x2d1234.scope/init.scope
0::/unified.slice
";

    #[test]
    fn test_parse_cgroup_line_v2() {
        let line = parse_cgroup_line("0::/system.slice/foo.scope\n").unwrap();
        assert_eq!(line.hierarchy_id, 0);
        assert!(line.controller_list.is_empty());
        assert_eq!(line.cgroup_path, "/system.slice/foo.scope");
    }

    #[test]
    fn test_parse_cgroup_line_errors() {
        assert!(matches!(
            parse_cgroup_line("x:cpu:/"),
            Err(CgroupLineError::InvalidHierarchyID(_))
        ));
        assert!(matches!(
            parse_cgroup_line("1:cpu"),
            Err(CgroupLineError::InvalidFormat(_))
        ));
        assert_eq!(parse_cgroup_line("1:cpu:/a:b").unwrap().cgroup_path, "/a:b");
    }

    #[test]
    fn test_find_named_controller() {
        let path = find_cgroup_path(V1, "name=systemd", Path::new("/dummy")).unwrap();
        assert_eq!(path, "/machine.slice/machine-rkt\\x2d1234.scope/init.scope");
        let path = find_cgroup_path(V1, "cpuacct", Path::new("/dummy")).unwrap();
        assert_eq!(path, "/machine.slice");
    }

    #[test]
    fn test_find_skips_unrelated_odd_lines() {
        let content = "\
3:cpu:/machine.slice/odd:name.scope
garbage
1:name=systemd:/machine.slice/machine-rkt.scope/init.scope
";
        let path = find_cgroup_path(content, "name=systemd", Path::new("/dummy")).unwrap();
        assert_eq!(path, "/machine.slice/machine-rkt.scope/init.scope");
        let path = find_cgroup_path(content, "cpu", Path::new("/dummy")).unwrap();
        assert_eq!(path, "/machine.slice/odd:name.scope");
    }

    #[test]
    fn test_find_falls_back_to_unified() {
        let path = find_cgroup_path("0::/user.slice\n", "name=systemd", Path::new("/dummy"))
            .unwrap();
        assert_eq!(path, "/user.slice");
    }

    #[test]
    fn test_find_missing_controller() {
        let err = find_cgroup_path("3:pids:/\n", "name=systemd", Path::new("/dummy")).unwrap_err();
        match err {
            Error::ControllerNotFound { controller, path } => {
                assert_eq!(controller, "name=systemd");
                assert_eq!(path, PathBuf::from("/dummy"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolver_reads_proc() {
        let rootfs = tempfile::tempdir().unwrap();
        let proc = rootfs.path().join("proc/77");
        std::fs::create_dir_all(&proc).unwrap();
        std::fs::write(proc.join("cgroup"), V1).unwrap();

        let resolver = ProcCgroupResolver::new(rootfs.path());
        assert_eq!(
            resolver.path_for_pid(77, "memory").unwrap(),
            "/machine.slice/machine-rkt\\x2d1234.scope"
        );
        assert!(matches!(
            resolver.path_for_pid(78, "memory"),
            Err(Error::File(_))
        ));
    }
}
