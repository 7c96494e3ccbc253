use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use epm_tracker::app;
use epm_tracker::cli::parse_cli;

const LOG_ENV: &str = "EPM_TRACKER_LOG";
const DEFAULT_FILTER: &str = "epm_tracker=info";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    init_tracing();
    let (cli, sources) = parse_cli();
    match app::run(cli, sources).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
