//! Website Uptime Checker Binary

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uptime_checker::{Config, Result, RunOptions, UptimeRunner};

/// Check website uptime once, record the result, and alert when it is down
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Run in test mode (no emails, no logs)
    #[arg(long = "test", env = "UPTIME_TEST_MODE")]
    test: bool,

    /// Force website to be considered down (for testing alerts)
    #[arg(long = "force-down", env = "UPTIME_FORCE_DOWN")]
    force_down: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing();

    info!("Starting uptime checker v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!(
        "Checker configuration - URL: {}, Timeout: {:?}, Log: {}, Relay: {}:{}, Test mode: {}, Force down: {}",
        config.url,
        config.check_timeout,
        config.log_file.display(),
        config.smtp_host,
        config.smtp_port,
        cli.test,
        cli.force_down
    );

    let runner = UptimeRunner::new(
        config,
        RunOptions {
            test_mode: cli.test,
            force_down: cli.force_down,
        },
    )?;

    runner.run().await?;

    Ok(())
}

/// Initialize structured logging on stderr, leaving stdout for the console report
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
