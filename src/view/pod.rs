use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

use crate::api::models::to_key_values;
use crate::api::{AppState, AppView, ImageFormat, ImageSnapshot, Network, PodSnapshot, PodState};
use crate::cgroup::CgroupResolver;
use crate::error::ResultOkLogExt;
use crate::fsutil;
use crate::image::ImageStore;
use crate::manifest::PodManifest;
use crate::pod::{self, PodHandle};
use crate::registration::{self, RegistrationService, RetryPolicy};

/// Controller whose hierarchy names the pod's cgroup.
const CGROUP_CONTROLLER: &str = "name=systemd";

/// Scope newer stage1 systemd versions move the pod's first process into.
const IMPLICIT_SCOPE_SUFFIX: &str = "/init.scope";

/// Collaborators needed to resolve the cgroup of a running pod.
pub struct PodContext<'a> {
    pub cgroups: &'a dyn CgroupResolver,
    pub registration: &'a dyn RegistrationService,
    pub retry: RetryPolicy,
    pub deadline: Option<Instant>,
}

/// Builds the basic view of a pod.
///
/// Every data source is optional: failures are logged and leave the matching
/// field empty. The manifest derived fields (`apps`, `annotations`,
/// `manifest`) are set together or not at all.
pub async fn basic_pod(pod: &dyn PodHandle, ctx: &PodContext<'_>) -> PodSnapshot {
    let id = pod.id();
    let mut snapshot = PodSnapshot::new(id.to_string());
    snapshot.state = PodState::from(pod.state());
    // An embryo has neither manifest nor processes yet.
    if snapshot.state == PodState::Embryo {
        return snapshot;
    }

    if let Some((manifest, data)) = pod_manifest(pod)
        .ok_log_with(|| format!("failed to get the pod manifest for pod `{id}`"))
    {
        snapshot.annotations = to_key_values(&manifest.annotations);
        snapshot.apps = app_list(&manifest);
        snapshot.manifest = Some(data);
    }

    if snapshot.state == PodState::Undefined {
        return snapshot;
    }

    snapshot.created_at = pod
        .creation_time()
        .ok_log_with(|| format!("failed to get the creation time for pod `{id}`"))
        .and_then(unix_nanos);
    snapshot.started_at = pod
        .start_time()
        .ok_log_with(|| format!("failed to get the start time for pod `{id}`"))
        .and_then(unix_nanos);
    snapshot.gc_marked_at = pod
        .gc_marked_time()
        .ok_log_with(|| format!("failed to get the gc marked time for pod `{id}`"))
        .and_then(unix_nanos);

    if let Some(pid) = pod
        .pid()
        .ok_log_with(|| format!("failed to get the PID for pod `{id}`"))
    {
        snapshot.pid = pid;
    }

    if snapshot.state == PodState::Running {
        snapshot.networks = pod
            .networks()
            .ok_log_with(|| format!("failed to get the networks of pod `{id}`"))
            .unwrap_or_default()
            .into_iter()
            .map(|net| Network {
                name: net.net_name,
                ipv4: net.ip,
            })
            .collect();

        // Without registration the cgroup may still change, report what is
        // there anyway.
        if let Err(err) = registration::wait_for_registration(
            ctx.registration,
            &id.machine_name(),
            ctx.retry,
            ctx.deadline,
        )
        .await
        {
            log::error!("checking for machine registration failed: {err}");
        }

        if let Some(cgroup) = pod_cgroup(pod, ctx.cgroups) {
            snapshot.cgroup = cgroup;
        }
    }

    snapshot
}

/// Adds app states, exit codes and resolved image information to `snapshot`.
///
/// Exit status files are only consulted once the pod is known to run or to
/// have run.
pub async fn fill_app_info(pod: &dyn PodHandle, snapshot: &mut PodSnapshot, images: &dyn ImageStore) {
    if matches!(snapshot.state, PodState::Undefined | PodState::Embryo) {
        return;
    }

    let (state, read_status) = if pod.is_running() {
        (AppState::Running, true)
    } else if pod.after_run() {
        (AppState::Exited, true)
    } else {
        (AppState::Undefined, false)
    };
    let status_dir = if read_status {
        pod.status_dir()
            .ok_log_with(|| "failed to get pod exit status directory".to_owned())
    } else {
        None
    };

    for app in &mut snapshot.apps {
        app.state = state;

        let image_id = match images.resolve_key(&app.image.id).await {
            Ok(key) => key,
            Err(err) => {
                log::error!("failed to resolve the image ID `{}`: {}", app.image.id, err);
                app.image.id.clone()
            }
        };
        app.image = ImageSnapshot {
            base_format: ImageFormat::default(),
            id: image_id,
            ..Default::default()
        };
        if let Some(manifest) = pod
            .app_image_manifest(&app.name)
            .ok_log_with(|| format!("failed to get image manifest for app `{}`", app.name))
        {
            app.image.version = manifest.version().to_owned();
            app.image.name = manifest.name;
        }

        if let Some(dir) = &status_dir {
            match fsutil::read_int_from_file(dir.join(&app.name)) {
                Ok(code) => app.exit_code = Some(code),
                Err(err) if err.is_not_found() => {}
                Err(err) => log::error!("failed to read status for app `{}`: {}", app.name, err),
            }
        }
    }
}

fn pod_manifest(pod: &dyn PodHandle) -> pod::Result<(PodManifest, Vec<u8>)> {
    let data = pod.read_file("pod")?;
    let manifest = PodManifest::parse(&data).map_err(|source| pod::Error::Manifest {
        path: "pod".into(),
        source,
    })?;
    Ok((manifest, data))
}

/// Apps as listed in the manifest. State, exit code and image details are
/// only known after [`fill_app_info`].
fn app_list(manifest: &PodManifest) -> Vec<AppView> {
    manifest
        .apps
        .iter()
        .map(|app| AppView {
            name: app.name.clone(),
            image: ImageSnapshot {
                base_format: ImageFormat::default(),
                id: app.image.id.clone(),
                ..Default::default()
            },
            annotations: to_key_values(&app.annotations),
            ..Default::default()
        })
        .collect()
}

fn pod_cgroup(pod: &dyn PodHandle, cgroups: &dyn CgroupResolver) -> Option<String> {
    let id = pod.id();
    let pid = pod
        .primary_process_pid()
        .ok_log_with(|| format!("failed to get the primary process PID for pod `{id}`"))?;
    let cgroup = cgroups
        .path_for_pid(pid, CGROUP_CONTROLLER)
        .ok_log_with(|| format!("failed to get the cgroup path for pod `{id}`"))?;
    Some(
        cgroup
            .strip_suffix(IMPLICIT_SCOPE_SUFFIX)
            .unwrap_or(&cgroup)
            .to_owned(),
    )
}

/// UNIX epoch nanoseconds, `None` for times not after the epoch.
fn unix_nanos(time: Option<SystemTime>) -> Option<i64> {
    let nanos = time?.duration_since(UNIX_EPOCH).ok()?.as_nanos();
    if nanos == 0 {
        return None;
    }
    i64::try_from(nanos).ok()
}
