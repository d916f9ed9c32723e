//! `is` binary entry point.

use is_cli::cli::{self, AppContext, Cli};
use is_cli::config::Settings;
use is_cli::error::EXIT_CANCELED;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

const LOG_ENV: &str = "IS_CLI_LOG";

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_tracing();

    let ctx = AppContext::new(Settings::from_env());
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
            eprintln!();
            std::process::exit(EXIT_CANCELED);
        }
    });

    let code = cli::run(cli, &ctx).await;
    std::process::exit(code);
}
