use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "podscope")]
#[command(author, version, about = "Inspect the pods and images of the rkt runtime")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Runtime data directory, overrides PODSCOPE_DATA_DIR
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print version and configuration information
    Info,

    /// List pods
    ListPods {
        /// Pod filter as JSON, e.g. '{"states": ["running"]}'. Repeat to match any
        #[arg(short, long = "filter", value_name = "JSON")]
        filters: Vec<String>,

        /// Include app states, images and the pod manifest
        #[arg(long)]
        detail: bool,
    },

    /// Show a single pod
    InspectPod {
        /// Pod UUID
        id: String,
    },

    /// List images
    ListImages {
        /// Image filter as JSON, e.g. '{"base_names": ["etcd"]}'. Repeat to match any
        #[arg(short, long = "filter", value_name = "JSON")]
        filters: Vec<String>,

        /// Include the image manifest
        #[arg(long)]
        detail: bool,
    },

    /// Show a single image
    InspectImage {
        /// Image key, key prefix or name
        id: String,
    },

    /// Print the log of an app
    Logs {
        /// Pod UUID
        pod_id: String,

        /// App name
        app_name: String,
    },
}
