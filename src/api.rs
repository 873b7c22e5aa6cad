//! Read-only query surface over pods, images and app logs.
//!
//! [`Service`] answers each query by assembling fresh views from the
//! runtime's stores; nothing is cached between calls. Lists favour
//! availability: a pod or image that cannot be fully read is still reported
//! (pods) or skipped (images) with the failure logged. Inspections surface
//! identifier and lookup failures to the caller.
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::cgroup::{CgroupResolver, ProcCgroupResolver};
use crate::config::Config;
use crate::error::ResultOkLogExt;
use crate::filter;
use crate::image::{self, ImageStore, SqliteImageStore};
use crate::logs::{self, FileLogSource, LogSource, LogStreamWriter};
use crate::manifest;
use crate::pod::{self, DirPodStore, PodId, PodStore, WalkPolicy};
use crate::registration::{MachinedRegistry, RegistrationService, RetryPolicy};
use crate::view::{self, PodContext};

pub mod models;

pub use models::*;

/// Version of the query API.
pub const API_VERSION: &str = "1.0.0-alpha";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Pod(#[from] pod::Error),
    #[error(transparent)]
    Image(#[from] image::Error),
    #[error(transparent)]
    Logs(#[from] logs::Error),
    #[error("`{0}` is not implemented")]
    Unimplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

pub struct Service {
    config: Config,
    pods: Arc<dyn PodStore>,
    images: Arc<dyn ImageStore>,
    cgroups: Arc<dyn CgroupResolver>,
    registration: Arc<dyn RegistrationService>,
    logs: Arc<dyn LogSource>,
    retry: RetryPolicy,
}

impl Service {
    pub fn new(
        config: Config,
        pods: Arc<dyn PodStore>,
        images: Arc<dyn ImageStore>,
        cgroups: Arc<dyn CgroupResolver>,
        registration: Arc<dyn RegistrationService>,
        logs: Arc<dyn LogSource>,
    ) -> Self {
        Self {
            config,
            pods,
            images,
            cgroups,
            registration,
            logs,
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a service over the on-disk stores named by `config`.
    ///
    /// # Errors
    ///
    /// Fails if the image database cannot be opened.
    pub async fn from_config(config: Config) -> Result<Self> {
        let pods = DirPodStore::new(&config.data_dir, config.rootfs.clone());
        let images =
            SqliteImageStore::connect(config.image_db(), config.image_manifests_dir()).await?;
        log::debug!("opened image store `{}`", config.image_db().display());
        let cgroups = ProcCgroupResolver::new(config.rootfs.clone());
        let registration = MachinedRegistry::new(config.machines_dir.clone());
        let logs = FileLogSource::new(pods.clone());

        Ok(Self::new(
            config,
            Arc::new(pods),
            Arc::new(images),
            Arc::new(cgroups),
            Arc::new(registration),
            Arc::new(logs),
        ))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn pod_context(&self, deadline: Option<Instant>) -> PodContext<'_> {
        PodContext {
            cgroups: self.cgroups.as_ref(),
            registration: self.registration.as_ref(),
            retry: self.retry,
            deadline,
        }
    }

    pub fn get_info(&self) -> Info {
        Info {
            version: env!("CARGO_PKG_VERSION").to_owned(),
            appc_version: manifest::APPC_VERSION.to_owned(),
            api_version: API_VERSION.to_owned(),
            data_dir: self.config.data_dir.clone(),
            rootfs: self.config.rootfs.clone(),
            machines_dir: self.config.machines_dir.clone(),
        }
    }

    /// Lists the pods matching any of the request's filters.
    ///
    /// # Errors
    ///
    /// Fails only if the pod store cannot be enumerated.
    pub async fn list_pods(&self, req: &ListPodsRequest) -> Result<Vec<PodSnapshot>> {
        let handles = self
            .pods
            .walk(WalkPolicy::most_dirs())
            .inspect_err(|err| log::error!("failed to list pods: {err}"))?;
        let ctx = self.pod_context(req.deadline);

        let mut pods = Vec::with_capacity(handles.len());
        for handle in handles {
            let mut pod = view::basic_pod(handle.as_ref(), &ctx).await;
            if !filter::satisfies_any_pod_filter(&pod, &req.filters) {
                continue;
            }
            if req.detail {
                view::fill_app_info(handle.as_ref(), &mut pod, self.images.as_ref()).await;
            } else {
                pod.manifest = None;
            }
            pods.push(pod);
        }
        log::debug!("listed {} pods", pods.len());
        Ok(pods)
    }

    /// Returns the detailed view of a single pod.
    ///
    /// # Errors
    ///
    /// Fails if the id is not a UUID or no pod carries it.
    pub async fn inspect_pod(&self, req: &InspectPodRequest) -> Result<PodSnapshot> {
        let id = PodId::new(&req.id)?;
        let handle = self
            .pods
            .get(&id)
            .inspect_err(|err| log::error!("failed to get pod `{id}`: {err}"))?;

        let mut pod = view::basic_pod(handle.as_ref(), &self.pod_context(req.deadline)).await;
        view::fill_app_info(handle.as_ref(), &mut pod, self.images.as_ref()).await;
        Ok(pod)
    }

    /// Lists the images matching any of the request's filters.
    ///
    /// # Errors
    ///
    /// Fails only if the image records cannot be enumerated.
    pub async fn list_images(&self, req: &ListImagesRequest) -> Result<Vec<ImageSnapshot>> {
        let records = self
            .images
            .all_records()
            .await
            .inspect_err(|err| log::error!("failed to list images: {err}"))?;

        let mut images = Vec::with_capacity(records.len());
        for record in &records {
            let Some(mut image) = view::image_from_record(self.images.as_ref(), record)
                .await
                .ok_log_with(|| format!("failed to convert image `{}`", record.blob_key))
            else {
                continue;
            };
            if !filter::satisfies_any_image_filter(&image, &req.filters) {
                continue;
            }
            if !req.detail {
                image.manifest = None;
            }
            images.push(image);
        }
        log::debug!("listed {} of {} images", images.len(), records.len());
        Ok(images)
    }

    pub async fn inspect_image(&self, req: &InspectImageRequest) -> Result<ImageSnapshot> {
        Ok(view::image_info(self.images.as_ref(), &req.id).await?)
    }

    /// Streams the persisted log of an app to `tx`, one batch of lines per
    /// chunk read.
    ///
    /// Returns once the log is exhausted or the receiver is dropped.
    ///
    /// # Errors
    ///
    /// Fails if the pod does not exist or the log cannot be opened or read.
    pub async fn get_logs(&self, req: &GetLogsRequest, tx: mpsc::Sender<Vec<String>>) -> Result<()> {
        let id = PodId::new(&req.pod_id)?;
        // The pod must exist even if the log source does not need it.
        drop(self.pods.get(&id)?);

        let reader = self.logs.open(&id, &req.app_name).await?;
        match logs::pump(reader, &LogStreamWriter::new(tx)).await {
            Ok(()) => Ok(()),
            Err(logs::Error::SubscriberGone) => {
                log::debug!("log subscriber for pod `{id}` went away");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn listen_events(&self) -> Result<()> {
        Err(Error::Unimplemented("listen_events"))
    }
}
