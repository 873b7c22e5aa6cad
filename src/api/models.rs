use std::path::PathBuf;

use tokio::time::Instant;

use crate::manifest::{self, NameValue};
use crate::pod::RuntimeState;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl From<&NameValue> for KeyValue {
    fn from(value: &NameValue) -> Self {
        Self::new(&value.name, &value.value)
    }
}

pub(crate) fn to_key_values(items: &[NameValue]) -> Vec<KeyValue> {
    items.iter().map(KeyValue::from).collect()
}

/// Lifecycle state of a pod as exposed by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PodState {
    #[default]
    Undefined,
    Embryo,
    Preparing,
    AbortedPrepare,
    Prepared,
    Running,
    Deleting,
    Exited,
    Garbage,
}

impl From<RuntimeState> for PodState {
    fn from(value: RuntimeState) -> Self {
        match value {
            RuntimeState::Embryo => PodState::Embryo,
            RuntimeState::Preparing => PodState::Preparing,
            RuntimeState::AbortedPrepare => PodState::AbortedPrepare,
            RuntimeState::Prepared => PodState::Prepared,
            RuntimeState::Running => PodState::Running,
            RuntimeState::Deleting => PodState::Deleting,
            RuntimeState::Exited => PodState::Exited,
            RuntimeState::Garbage => PodState::Garbage,
            RuntimeState::ExitedDeleting | RuntimeState::ExitedGarbage => PodState::Undefined,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    #[default]
    Undefined,
    Running,
    Exited,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    #[default]
    Appc,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ImageFormat {
    #[serde(rename = "type")]
    pub kind: ImageType,
    pub version: String,
}

impl Default for ImageFormat {
    /// Docker images are converted on import, so every stored image is appc.
    fn default() -> Self {
        Self {
            kind: ImageType::Appc,
            version: manifest::APPC_VERSION.to_owned(),
        }
    }
}

/// Point-in-time view of a stored image.
///
/// Inside an [`AppView`] only the fields that could be resolved are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImageSnapshot {
    pub base_format: ImageFormat,
    pub id: String,
    pub name: String,
    pub version: String,
    /// Import time in UNIX epoch seconds.
    pub import_timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Vec<u8>>,
    pub size: i64,
    pub annotations: Vec<KeyValue>,
    pub labels: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AppView {
    pub name: String,
    pub image: ImageSnapshot,
    pub state: AppState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub annotations: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Network {
    pub name: String,
    pub ipv4: String,
}

/// Point-in-time view of a pod.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PodSnapshot {
    pub id: String,
    /// Process id of the pod, -1 if unknown.
    pub pid: i32,
    pub state: PodState,
    pub apps: Vec<AppView>,
    pub networks: Vec<Network>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Vec<u8>>,
    pub annotations: Vec<KeyValue>,
    /// Empty unless the pod is running.
    pub cgroup: String,
    /// Timestamps in UNIX epoch nanoseconds.
    pub created_at: Option<i64>,
    pub started_at: Option<i64>,
    pub gc_marked_at: Option<i64>,
}

impl PodSnapshot {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pid: -1,
            state: PodState::Undefined,
            apps: Vec::new(),
            networks: Vec::new(),
            manifest: None,
            annotations: Vec::new(),
            cgroup: String::new(),
            created_at: None,
            started_at: None,
            gc_marked_at: None,
        }
    }
}

/// Criteria a pod has to meet. Empty fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PodFilter {
    pub ids: Vec<String>,
    pub states: Vec<PodState>,
    pub app_names: Vec<String>,
    pub image_ids: Vec<String>,
    pub network_names: Vec<String>,
    pub annotations: Vec<KeyValue>,
    pub cgroups: Vec<String>,
    /// Paths the pod's cgroup has to be a prefix of.
    pub pod_sub_cgroups: Vec<String>,
}

/// Criteria an image has to meet. Empty fields and zero timestamps are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ImageFilter {
    pub ids: Vec<String>,
    pub prefixes: Vec<String>,
    pub keywords: Vec<String>,
    pub labels: Vec<KeyValue>,
    pub imported_after: i64,
    pub imported_before: i64,
    pub annotations: Vec<KeyValue>,
    pub full_names: Vec<String>,
    pub base_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Info {
    pub version: String,
    pub appc_version: String,
    pub api_version: String,
    pub data_dir: PathBuf,
    pub rootfs: PathBuf,
    pub machines_dir: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ListPodsRequest {
    /// Combined with OR; an empty list matches every pod.
    pub filters: Vec<PodFilter>,
    /// Include app states, resolved images and the raw manifest.
    pub detail: bool,
    /// Upper bound for waiting on external registration of running pods.
    pub deadline: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct InspectPodRequest {
    pub id: String,
    pub deadline: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct ListImagesRequest {
    pub filters: Vec<ImageFilter>,
    pub detail: bool,
}

#[derive(Debug, Clone)]
pub struct InspectImageRequest {
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct GetLogsRequest {
    pub pod_id: String,
    pub app_name: String,
}
