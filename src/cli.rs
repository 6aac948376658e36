use clap::{Parser, ValueEnum};
use serde::Deserialize;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "kubectl-resources",
    version,
    about = "Show Kubernetes resource requests, limits, and usage."
)]
pub struct CliArgs {
    /// Namespace to query, all namespaces when unset
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Aggregation level: container, pod, namespace, node or total
    #[arg(short = 'b', long = "by")]
    pub by: Option<String>,

    /// Include node names (pod and container levels)
    #[arg(short = 'd', long)]
    pub show_nodes: bool,

    /// Show full pod and node names
    #[arg(short, long)]
    pub verbose: bool,

    /// Only show pods whose usage exceeds a request or limit
    #[arg(short = 'w', long)]
    pub only_warnings: bool,

    /// Namespaces to leave out of the report
    #[arg(short = 'x', long = "exclude-namespace", value_delimiter = ',')]
    pub exclude_namespaces: Vec<String>,

    /// When to colour usage cells
    #[arg(long, value_enum)]
    pub color: Option<ColorMode>,

    /// Kubeconfig context to use instead of the current one
    #[arg(long)]
    pub context: Option<String>,

    /// tracing filter (for example: warn,debug)
    #[arg(long, default_value = "warn")]
    pub log_filter: String,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn enabled(self, is_terminal: bool) -> bool {
        match self {
            Self::Auto => is_terminal,
            Self::Always => true,
            Self::Never => false,
        }
    }
}
