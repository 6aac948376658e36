use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::{CliArgs, ColorMode};
use crate::model::{Aggregation, NamespaceScope};

const DEFAULT_EXCLUDED_NAMESPACES: [&str; 1] = ["kube-system"];

/// Defaults read from the optional YAML config file. Command-line flags win.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileDefaults {
    #[serde(default, alias = "aggregation")]
    by: Option<String>,
    #[serde(default)]
    exclude_namespaces: Option<Vec<String>>,
    #[serde(default)]
    show_nodes: bool,
    #[serde(default)]
    verbose: bool,
    #[serde(default)]
    only_warnings: bool,
    #[serde(default)]
    color: Option<ColorMode>,
}

impl FileDefaults {
    pub fn discover() -> Result<(Self, Option<PathBuf>)> {
        let Some(path) = discover_config_path() else {
            return Ok((Self::default(), None));
        };
        let defaults = Self::load(&path)?;
        Ok((defaults, Some(path)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }

    fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}

/// Everything the report pipeline reads, resolved once at startup.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReportConfig {
    pub aggregation: Aggregation,
    pub scope: NamespaceScope,
    pub excluded_namespaces: BTreeSet<String>,
    pub show_nodes: bool,
    pub full_names: bool,
    pub colored: bool,
    pub only_warnings: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            aggregation: Aggregation::Pod,
            scope: NamespaceScope::All,
            excluded_namespaces: BTreeSet::new(),
            show_nodes: false,
            full_names: false,
            colored: false,
            only_warnings: false,
        }
    }
}

impl ReportConfig {
    pub fn resolve(args: &CliArgs, defaults: &FileDefaults, is_terminal: bool) -> Result<Self> {
        let aggregation = match args.by.as_deref().or(defaults.by.as_deref()) {
            Some(level) => level.parse::<Aggregation>()?,
            None => Aggregation::Pod,
        };

        let scope = match args.namespace.as_deref().map(str::trim) {
            Some(namespace) if !namespace.is_empty() => {
                NamespaceScope::Named(namespace.to_string())
            }
            _ => NamespaceScope::All,
        };

        let excluded_namespaces = if !args.exclude_namespaces.is_empty() {
            clean_namespaces(&args.exclude_namespaces)
        } else if let Some(excluded) = &defaults.exclude_namespaces {
            clean_namespaces(excluded)
        } else if scope == NamespaceScope::All {
            DEFAULT_EXCLUDED_NAMESPACES
                .into_iter()
                .map(str::to_string)
                .collect()
        } else {
            BTreeSet::new()
        };

        let color = args.color.or(defaults.color).unwrap_or_default();

        Ok(Self {
            aggregation,
            scope,
            excluded_namespaces,
            show_nodes: args.show_nodes || defaults.show_nodes,
            full_names: args.verbose || defaults.verbose,
            colored: color.enabled(is_terminal),
            only_warnings: args.only_warnings || defaults.only_warnings,
        })
    }
}

fn clean_namespaces(namespaces: &[String]) -> BTreeSet<String> {
    namespaces
        .iter()
        .map(|namespace| namespace.trim())
        .filter(|namespace| !namespace.is_empty())
        .map(str::to_string)
        .collect()
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KUBECTL_RESOURCES_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("kubectl-resources.yaml"),
        PathBuf::from(".kubectl-resources.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let candidate = PathBuf::from(home).join(".config/kubectl-resources/config.yaml");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    None
}
