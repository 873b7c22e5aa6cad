//! podscope: read-only inspection of the pods and images managed by the rkt
//! container runtime.
//!
//! The library assembles point-in-time views of pods (state, apps, networks,
//! cgroup, timestamps) and images from the runtime's on-disk stores and
//! exposes them through [`api::Service`]. The runtime state is never modified.
pub mod api;
pub mod cgroup;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod fsutil;
pub mod image;
pub mod logs;
pub mod manifest;
pub mod pod;
pub mod registration;
pub mod view;

#[cfg(test)]
mod testutil;

use serde::Serialize;
use tokio::sync::mpsc;

use api::Service;
use cli::{Args, Command};
use config::Config;

/// Runs a single command and prints its result as JSON.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid filter JSON on the command line.
/// - Failure to open the image database.
/// - Any failure of the requested query.
pub async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env();
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    log::debug!("configuration: {config:?}");
    let service = Service::from_config(config).await?;

    match args.command {
        Command::Info => print_json(&service.get_info())?,
        Command::ListPods { filters, detail } => {
            let req = api::ListPodsRequest {
                filters: parse_filters(&filters)?,
                detail,
                deadline: None,
            };
            print_json(&service.list_pods(&req).await?)?;
        }
        Command::InspectPod { id } => {
            let req = api::InspectPodRequest { id, deadline: None };
            print_json(&service.inspect_pod(&req).await?)?;
        }
        Command::ListImages { filters, detail } => {
            let req = api::ListImagesRequest {
                filters: parse_filters(&filters)?,
                detail,
            };
            print_json(&service.list_images(&req).await?)?;
        }
        Command::InspectImage { id } => {
            let req = api::InspectImageRequest { id };
            print_json(&service.inspect_image(&req).await?)?;
        }
        Command::Logs { pod_id, app_name } => {
            let req = api::GetLogsRequest { pod_id, app_name };
            let (tx, mut rx) = mpsc::channel::<Vec<String>>(16);
            let printer = tokio::spawn(async move {
                while let Some(lines) = rx.recv().await {
                    for line in lines {
                        println!("{line}");
                    }
                }
            });
            let result = service.get_logs(&req, tx).await;
            printer.await?;
            result?;
        }
    }

    Ok(())
}

fn parse_filters<F: serde::de::DeserializeOwned>(raw: &[String]) -> serde_json::Result<Vec<F>> {
    raw.iter().map(|filter| serde_json::from_str(filter)).collect()
}

fn print_json(value: &impl Serialize) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
