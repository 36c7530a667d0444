use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;

use stackboot_cli::{Args, run};
use stackboot_observe::logger_dispatch;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();

    let dispatch = match logger_dispatch(&args.logger_config()) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            eprintln!("stackboot: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let outcome = run(&args, cancel).with_subscriber(dispatch).await;

    match outcome {
        Ok(_) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("stackboot: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}
