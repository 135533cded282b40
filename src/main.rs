/// list-gke - GKE cluster inventory
///
/// Lists the GKE clusters of a project and prints, per cluster, the node count
/// together with either the running pod count or the node pool machine types.
mod config;
mod error;
mod gke;
mod k8s;
mod report;
mod utils;

use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io::Write;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{
    AuthPluginKind, ErrorPolicy, OutputFormat, QueryKind, ReportConfig, DEFAULT_CONCURRENCY,
    ZONE_WILDCARD,
};
use crate::gke::credentials::{resolve_access_token, TokenSource};
use crate::gke::GkeClient;
use crate::k8s::AuthPlugin;

#[derive(Parser)]
#[command(name = "list-gke")]
#[command(about = "List GKE clusters with node, pod and machine type details", long_about = None)]
struct Cli {
    /// Google Cloud project ID
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    project: String,

    /// Compute zone ("-" for all zones)
    #[arg(
        long,
        value_parser = NonEmptyStringValueParser::new(),
        required_if_eq("require_zone", "true")
    )]
    zone: Option<String>,

    /// Fail instead of defaulting to all zones when --zone is absent
    #[arg(long)]
    require_zone: bool,

    /// Per-cluster query filling the last column
    #[arg(long, value_enum, default_value_t = QueryKind::Pods)]
    query: QueryKind,

    /// Behavior when a single cluster cannot be queried
    #[arg(long, value_enum, default_value_t = ErrorPolicy::Abort)]
    on_error: ErrorPolicy,

    /// Report 0 pods for clusters whose pods cannot be listed
    #[arg(long)]
    ignore_pod_errors: bool,

    /// Maximum number of clusters queried at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Token source for cluster API calls
    #[arg(long, value_enum, default_value_t = AuthPluginKind::Adc)]
    auth_plugin: AuthPluginKind,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Override the GKE API base URL
    #[arg(long)]
    api_endpoint: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn report_config(&self) -> ReportConfig {
        ReportConfig {
            project: self.project.clone(),
            zone: self
                .zone
                .clone()
                .unwrap_or_else(|| ZONE_WILDCARD.to_string()),
            query: self.query,
            on_error: self.on_error,
            ignore_pod_errors: self.ignore_pod_errors,
            concurrency: self.concurrency,
            auth_plugin: self.auth_plugin,
            output: self.output,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = cli.report_config();
    if let Err(e) = config.validate() {
        Cli::command()
            .error(ErrorKind::ValueValidation, e.to_string())
            .exit();
    }

    // Logs go to stderr, stdout carries the report
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("list_gke={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(&config, cli.api_endpoint.as_deref()).await {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: &ReportConfig, api_endpoint: Option<&str>) -> Result<()> {
    if config.all_zones() {
        info!("Listing clusters in all zones of project {}", config.project);
    } else {
        info!(
            "Listing clusters for project {} in zone {}",
            config.project, config.zone
        );
    }

    let plugin = AuthPlugin::initialize(config.auth_plugin)
        .await
        .context("Failed to initialize auth provider")?;

    let token = resolve_access_token().await?;
    info!("Using access token from {}", token.source);
    if token.source == TokenSource::Gcloud && config.auth_plugin == AuthPluginKind::Adc {
        warn!(
            "Cluster API calls use application default credentials, \
             consider --auth-plugin gcloud"
        );
    }

    let client = match api_endpoint {
        Some(url) => GkeClient::with_base_url(&token.token, url),
        None => GkeClient::new(&token.token),
    }
    .context("Could not initialize gke client")?;

    let report = report::generate(config, &client, &plugin).await?;
    let rendered = report::render::render(&report, config.output)?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .context("Failed to write report")?;
    stdout.flush().context("Failed to flush report")?;

    Ok(())
}
