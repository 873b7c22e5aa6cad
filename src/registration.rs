//! Lookup of pods in the external machine registration service.
//!
//! The service registers a pod shortly after its first process is created. A
//! query about a running pod waits a bounded time for the registration, so
//! that the reported cgroup reflects the final placement of the pod.
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to look up machine `{name}`: {source}")]
    Lookup {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("machine `{0}` not registered")]
    NotFound(String),
    #[error("deadline exceeded while waiting for machine `{0}`")]
    DeadlineExceeded(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// External service pods register with once they are started.
pub trait RegistrationService: Send + Sync {
    /// Returns `true` if a machine called `name` is registered.
    fn lookup(&self, name: &str) -> Result<bool>;
}

/// [`RegistrationService`] backed by the state directory of systemd-machined,
/// which holds one file per registered machine.
#[derive(Debug, Clone)]
pub struct MachinedRegistry {
    machines_dir: PathBuf,
}

impl MachinedRegistry {
    pub fn new(machines_dir: impl Into<PathBuf>) -> Self {
        Self {
            machines_dir: machines_dir.into(),
        }
    }
}

impl RegistrationService for MachinedRegistry {
    fn lookup(&self, name: &str) -> Result<bool> {
        self.machines_dir
            .join(name)
            .try_exists()
            .map_err(|source| Error::Lookup {
                name: name.to_owned(),
                source,
            })
    }
}

/// How often and how long to poll for a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_millis(50),
        }
    }
}

/// Polls `service` until `name` is registered.
///
/// # Errors
///
/// - [`Error::NotFound`] once all attempts of `policy` are used up.
/// - [`Error::DeadlineExceeded`] if the next wait would pass `deadline`.
///
/// Lookup failures count as a miss for that attempt.
pub async fn wait_for_registration(
    service: &dyn RegistrationService,
    name: &str,
    policy: RetryPolicy,
    deadline: Option<Instant>,
) -> Result<()> {
    for attempt in 0..policy.attempts {
        match service.lookup(name) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(err) => log::debug!("registration lookup attempt {attempt} failed: {err}"),
        }

        if attempt + 1 == policy.attempts {
            break;
        }
        if let Some(deadline) = deadline {
            if Instant::now() + policy.interval > deadline {
                return Err(Error::DeadlineExceeded(name.to_owned()));
            }
        }
        tokio::time::sleep(policy.interval).await;
    }

    Err(Error::NotFound(name.to_owned()))
}
