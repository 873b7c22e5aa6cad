//! In-memory collaborators for unit tests.
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;

use crate::cgroup::{self, CgroupResolver};
use crate::fsutil::FileReadError;
use crate::image::{self, ImageRecord, ImageStore};
use crate::manifest::ImageManifest;
use crate::pod::{self, NetworkAttachment, PodHandle, PodId, PodStore, RuntimeState, WalkPolicy};
use crate::registration::{self, RegistrationService};

/// Pod manifest with a `redis` app (image `sha512-aaaa`) and an `etcd` app
/// (image `sha512-bb`), annotated with `owner=ops`.
pub const TWO_APP_MANIFEST: &str = r#"{
    "acKind": "PodManifest",
    "acVersion": "0.8.11",
    "apps": [
        {
            "name": "redis",
            "image": {"name": "coreos.com/redis", "id": "sha512-aaaa"},
            "annotations": [{"name": "tier", "value": "cache"}]
        },
        {
            "name": "etcd",
            "image": {"id": "sha512-bb"}
        }
    ],
    "annotations": [{"name": "owner", "value": "ops"}]
}"#;

/// A full-length image key made of `fill`.
pub fn image_key(fill: char) -> String {
    format!("sha512-{}", fill.to_string().repeat(128))
}

fn missing(name: &str) -> FileReadError {
    FileReadError::new(name, io::ErrorKind::NotFound.into())
}

#[derive(Debug, Default)]
pub struct FakeImageStore {
    records: Vec<ImageRecord>,
    manifests: HashMap<String, Vec<u8>>,
    pub fail_listing: bool,
}

impl FakeImageStore {
    pub fn with_image(mut self, fill: char, name: &str, import_time: i64, manifest: &str) -> Self {
        let key = image_key(fill);
        self.records.push(ImageRecord {
            blob_key: key.clone(),
            name: name.to_owned(),
            import_time,
            latest: true,
            size: 1000,
            tree_store_size: 24,
        });
        self.manifests.insert(key, manifest.as_bytes().to_vec());
        self
    }
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn resolve_key(&self, id: &str) -> image::Result<String> {
        let matches: Vec<&ImageRecord> = if id.starts_with("sha512-") {
            self.records
                .iter()
                .filter(|record| record.blob_key.starts_with(id))
                .collect()
        } else {
            self.records.iter().filter(|record| record.name == id).collect()
        };
        match matches.as_slice() {
            [] => Err(image::Error::NotFound(id.to_owned())),
            [record] => Ok(record.blob_key.clone()),
            _ => Err(image::Error::Ambiguous {
                id: id.to_owned(),
                count: matches.len(),
            }),
        }
    }

    async fn manifest_bytes(&self, key: &str) -> image::Result<Vec<u8>> {
        self.manifests
            .get(key)
            .cloned()
            .ok_or_else(|| missing(key).into())
    }

    async fn all_records(&self) -> image::Result<Vec<ImageRecord>> {
        if self.fail_listing {
            return Err(image::Error::Query(sqlx::Error::PoolClosed));
        }
        Ok(self.records.clone())
    }

    async fn record(&self, key: &str) -> image::Result<ImageRecord> {
        self.records
            .iter()
            .find(|record| record.blob_key == key)
            .cloned()
            .ok_or_else(|| image::Error::NotFound(key.to_owned()))
    }
}

/// Pod whose data sources are plain fields. `None` makes a source fail.
#[derive(Debug, Clone)]
pub struct FakePod {
    pub id: PodId,
    pub state: RuntimeState,
    pub manifest: Option<Vec<u8>>,
    pub created: Option<SystemTime>,
    pub started: Option<SystemTime>,
    pub gc_marked: Option<SystemTime>,
    pub pid: Option<i32>,
    pub primary_pid: Option<i32>,
    pub networks: Vec<NetworkAttachment>,
    /// Raw image manifests by app name.
    pub image_manifests: HashMap<String, String>,
    pub status_dir: Option<PathBuf>,
    status_dir_reads: Arc<AtomicUsize>,
}

impl FakePod {
    pub fn new(state: RuntimeState) -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        let n = NEXT.fetch_add(1, Ordering::SeqCst) as u128;
        Self::with_id(
            PodId::new(uuid::Uuid::from_u128(n).to_string()).unwrap(),
            state,
        )
    }

    pub fn with_id(id: PodId, state: RuntimeState) -> Self {
        Self {
            id,
            state,
            manifest: None,
            created: None,
            started: None,
            gc_marked: None,
            pid: None,
            primary_pid: None,
            networks: Vec::new(),
            image_manifests: HashMap::new(),
            status_dir: None,
            status_dir_reads: Arc::default(),
        }
    }

    pub fn status_dir_reads(&self) -> usize {
        self.status_dir_reads.load(Ordering::SeqCst)
    }
}

impl PodHandle for FakePod {
    fn id(&self) -> &PodId {
        &self.id
    }

    fn read_file(&self, name: &str) -> pod::Result<Vec<u8>> {
        match name {
            "pod" => self.manifest.clone().ok_or_else(|| missing(name).into()),
            _ => Err(missing(name).into()),
        }
    }

    fn state(&self) -> RuntimeState {
        self.state
    }

    fn creation_time(&self) -> pod::Result<Option<SystemTime>> {
        Ok(self.created)
    }

    fn start_time(&self) -> pod::Result<Option<SystemTime>> {
        Ok(self.started)
    }

    fn gc_marked_time(&self) -> pod::Result<Option<SystemTime>> {
        Ok(self.gc_marked)
    }

    fn pid(&self) -> pod::Result<i32> {
        self.pid.ok_or_else(|| missing("pid").into())
    }

    fn primary_process_pid(&self) -> pod::Result<i32> {
        self.primary_pid
            .ok_or(pod::Error::NoChildProcess { pid: self.pid.unwrap_or(-1) })
    }

    fn networks(&self) -> pod::Result<Vec<NetworkAttachment>> {
        Ok(self.networks.clone())
    }

    fn app_image_manifest(&self, app_name: &str) -> pod::Result<ImageManifest> {
        let path = format!("appsinfo/{app_name}/manifest");
        let data = self
            .image_manifests
            .get(app_name)
            .ok_or_else(|| pod::Error::from(missing(&path)))?;
        ImageManifest::parse(data.as_bytes()).map_err(|source| pod::Error::Manifest {
            path: path.into(),
            source,
        })
    }

    fn status_dir(&self) -> pod::Result<PathBuf> {
        self.status_dir_reads.fetch_add(1, Ordering::SeqCst);
        self.status_dir
            .clone()
            .ok_or_else(|| missing("stage1/rootfs/rkt/status").into())
    }
}

#[derive(Debug, Default)]
pub struct FakePodStore {
    pub pods: Vec<FakePod>,
    pub fail_walk: bool,
}

impl PodStore for FakePodStore {
    fn walk(&self, _policy: WalkPolicy) -> pod::Result<Vec<Box<dyn PodHandle>>> {
        if self.fail_walk {
            return Err(pod::Error::ReadDir {
                path: "pods".into(),
                source: io::Error::other("walk failed"),
            });
        }
        Ok(self
            .pods
            .iter()
            .map(|pod| Box::new(pod.clone()) as Box<dyn PodHandle>)
            .collect())
    }

    fn get(&self, id: &PodId) -> pod::Result<Box<dyn PodHandle>> {
        self.pods
            .iter()
            .find(|pod| pod.id == *id)
            .map(|pod| Box::new(pod.clone()) as Box<dyn PodHandle>)
            .ok_or(pod::Error::NotFound(*id))
    }
}

/// Cgroup paths by pid.
#[derive(Debug, Default)]
pub struct FakeCgroups(HashMap<i32, String>);

impl FakeCgroups {
    pub fn with(pid: i32, path: &str) -> Self {
        Self(HashMap::from([(pid, path.to_owned())]))
    }
}

impl CgroupResolver for FakeCgroups {
    fn path_for_pid(&self, pid: i32, controller: &str) -> cgroup::Result<String> {
        self.0
            .get(&pid)
            .cloned()
            .ok_or_else(|| cgroup::Error::ControllerNotFound {
                controller: controller.to_owned(),
                path: format!("proc/{pid}/cgroup").into(),
            })
    }
}

/// Registration service answering every lookup the same way.
#[derive(Debug)]
pub struct FakeRegistry(pub bool);

impl RegistrationService for FakeRegistry {
    fn lookup(&self, _name: &str) -> registration::Result<bool> {
        Ok(self.0)
    }
}
