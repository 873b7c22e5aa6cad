use clap::Parser;

/// Entry point of the podscope command line tool.
///
/// Logging is configured through `RUST_LOG`.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug podscope list-pods --filter '{"states": ["running"]}'
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    podscope::run(podscope::cli::Args::parse()).await
}
