/// Run configuration for list-gke
use clap::ValueEnum;

/// Zone selector meaning "all zones"
pub const ZONE_WILDCARD: &str = "-";

/// Default number of clusters queried at the same time
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Explicit configuration for one report run
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Google Cloud project identifier
    pub project: String,

    /// Compute zone, or "-" for all zones
    pub zone: String,

    /// Which per-cluster query fills the third column
    pub query: QueryKind,

    /// What happens when a single cluster cannot be queried
    pub on_error: ErrorPolicy,

    /// Report pod listing failures as a zero count instead of an error row
    pub ignore_pod_errors: bool,

    /// Upper bound on concurrent per-cluster queries
    pub concurrency: usize,

    /// Token source wired into every synthesized auth provider
    pub auth_plugin: AuthPluginKind,

    pub output: OutputFormat,
}

/// Secondary query performed for each cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryKind {
    /// Count pods across all namespaces
    Pods,
    /// List node pool machine types
    MachineTypes,
}

/// Failure policy for per-cluster queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ErrorPolicy {
    /// Any per-cluster failure aborts the whole report
    #[default]
    Abort,
    /// Failing clusters are reported as "error" rows
    BestEffort,
}

/// How auth providers obtain tokens for cluster API calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AuthPluginKind {
    /// Application default credentials
    #[default]
    Adc,
    /// `gcloud config config-helper`
    Gcloud,
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

impl ReportConfig {
    /// Create a configuration with default query settings
    pub fn new(project: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
            query: QueryKind::Pods,
            on_error: ErrorPolicy::default(),
            ignore_pod_errors: false,
            concurrency: DEFAULT_CONCURRENCY,
            auth_plugin: AuthPluginKind::default(),
            output: OutputFormat::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.project.trim().is_empty() {
            anyhow::bail!("project cannot be empty");
        }

        if self.zone.trim().is_empty() {
            anyhow::bail!("zone cannot be empty");
        }

        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }

        Ok(())
    }

    /// True when the zone selects every zone of the project
    pub fn all_zones(&self) -> bool {
        self.zone == ZONE_WILDCARD
    }
}
