//! Operator is a long lived process that automates running vegeta load tests in k8s.
#![deny(missing_docs)]
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use vegeta_common::telemetry;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Endpoint traces and metrics are exported to, nothing is exported when unset.
    #[arg(long, env = "OPERATOR_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    /// Seconds between observations of a running attack job.
    #[arg(long, env = "OPERATOR_POLL_INTERVAL_SECS", default_value_t = 10)]
    poll_interval_secs: u64,
}

/// Available Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the daemon
    Daemon,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    telemetry::init_tracing(args.otlp_endpoint.clone()).await?;
    let meter_provider = match &args.otlp_endpoint {
        Some(endpoint) => Some(telemetry::init_metrics_otlp(endpoint.clone()).await?),
        None => None,
    };
    info!(?args, "starting operator");

    match args.command {
        Command::Daemon => {
            vegeta_operator::vegeta::run(Duration::from_secs(args.poll_interval_secs)).await?;
        }
    };

    // Flush traces and metrics before shutdown
    opentelemetry::global::shutdown_tracer_provider();
    if let Some(meter_provider) = meter_provider {
        meter_provider.shutdown()?;
    }
    Ok(())
}
