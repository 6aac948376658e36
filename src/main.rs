mod cli;
mod config;
mod k8s;
mod model;
mod names;
mod reconcile;
mod report;
mod rows;
mod table;

use std::io::{self, BufWriter, IsTerminal};

use anyhow::{Context, Result};
use clap::Parser;
use cli::CliArgs;
use config::{FileDefaults, ReportConfig};
use k8s::KubeGateway;
use report::{FetchOutcome, Source};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter)?;

    let (defaults, config_path) = FileDefaults::discover()?;
    if let Some(path) = &config_path {
        debug!(path = %path.display(), "loaded config file");
    }
    let config = ReportConfig::resolve(&args, &defaults, io::stdout().is_terminal())?;

    let gateway = KubeGateway::new(args.context.clone()).await?;
    debug!(
        cluster = gateway.cluster(),
        scope = %config.scope,
        aggregation = %config.aggregation,
        "querying cluster"
    );

    let (workloads, metrics) = tokio::join!(
        gateway.fetch_workload_pods(&config.scope),
        gateway.fetch_usage_metrics(&config.scope),
    );
    let listings = report::collect_listings(vec![
        FetchOutcome::new(Source::Workloads, workloads),
        FetchOutcome::new(Source::Metrics, metrics),
    ])?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    report::write_report(&listings, &config, &mut out)
}

fn init_tracing(level_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("warn"))
        .context("failed to initialize tracing filter")?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(io::stderr)
        .try_init();

    Ok(())
}
