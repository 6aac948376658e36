use std::fmt::{Display, Formatter};
use std::io::Write;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::ReportConfig;
use crate::model::{Aggregation, PodMap};
use crate::names::simplify_names;
use crate::reconcile::{ReconcileError, exclude_namespaces, reconcile, retain_warnings};
use crate::rows::{aggregate, footer, pod_to_rows, sort_rows};
use crate::table::Table;

/// Where a pod listing came from. Variant order is the reconciliation order:
/// declared requests and limits first, live usage second.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub enum Source {
    Workloads,
    Metrics,
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Workloads => write!(f, "pods"),
            Self::Metrics => write!(f, "pod metrics"),
        }
    }
}

pub struct FetchOutcome {
    source: Source,
    result: Result<PodMap>,
}

impl FetchOutcome {
    pub fn new(source: Source, result: Result<PodMap>) -> Self {
        Self { source, result }
    }
}

/// Keeps the listings that arrived, warning about the ones that did not.
/// Fails only when every source failed.
pub fn collect_listings(mut outcomes: Vec<FetchOutcome>) -> Result<Vec<PodMap>> {
    outcomes.sort_by_key(|outcome| outcome.source);

    let mut listings = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(pods) => {
                debug!(source = %outcome.source, pods = pods.len(), "fetched listing");
                listings.push(pods);
            }
            Err(error) => {
                warn!("failed to fetch {}: {error:#}", outcome.source);
                failures.push(format!("{}: {error:#}", outcome.source));
            }
        }
    }

    if listings.is_empty() && !failures.is_empty() {
        anyhow::bail!("no pod data could be fetched ({})", failures.join("; "));
    }
    Ok(listings)
}

pub fn build_table(listings: &[PodMap], config: &ReportConfig) -> Result<Table, ReconcileError> {
    let mut pods = reconcile(listings)?;
    let reconciled = pods.len();
    exclude_namespaces(&mut pods, &config.excluded_namespaces);
    if config.only_warnings {
        retain_warnings(&mut pods);
    }
    debug!(reconciled, shown = pods.len(), "reconciled pods");

    let rows = pods.values().flat_map(pod_to_rows).collect::<Vec<_>>();
    let mut grouped = aggregate(&rows, config.aggregation);
    let total = match config.aggregation {
        Aggregation::Total => None,
        _ => footer(&rows),
    };

    if !config.full_names {
        simplify_names(&mut grouped);
    }
    sort_rows(&mut grouped);

    Ok(Table::build(
        &grouped,
        total.as_ref(),
        config.aggregation,
        config.show_nodes,
    ))
}

pub fn write_report<W: Write>(listings: &[PodMap], config: &ReportConfig, out: &mut W) -> Result<()> {
    let table = build_table(listings, config).context("failed to merge pod listings")?;
    table
        .write_to(out, config.colored)
        .and_then(|()| out.flush())
        .context("failed to write report")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{FetchOutcome, Source, build_table, collect_listings, write_report};
    use crate::config::ReportConfig;
    use crate::model::{Aggregation, ContainerRecord, PodMap, PodRecord, ResourceValue, pod_map};
    use crate::table::{Cell, CellStyle};

    fn values(cells: &[Cell]) -> Vec<&str> {
        cells.iter().map(|cell| cell.value.as_str()).collect()
    }

    fn workload(namespace: &str, name: &str, node: &str, cpu: (u64, u64)) -> PodRecord {
        PodRecord::new(namespace, name)
            .with_node(node)
            .with_container(ContainerRecord::new(
                "web",
                ResourceValue::new(cpu.0, cpu.1, 0),
                ResourceValue::default(),
            ))
    }

    fn usage(namespace: &str, name: &str, cpu: u64) -> PodRecord {
        PodRecord::new(namespace, name).with_container(ContainerRecord::new(
            "web",
            ResourceValue::usage(cpu),
            ResourceValue::default(),
        ))
    }

    fn cluster() -> Vec<PodMap> {
        vec![
            pod_map([
                workload("default", "a-1", "node-1", (100, 200)),
                workload("default", "a-2", "node-2", (100, 200)),
                workload("kube-system", "dns-1", "node-1", (50, 0)),
            ]),
            pod_map([
                usage("default", "a-1", 150),
                usage("kube-system", "dns-1", 70),
            ]),
        ]
    }

    fn config(aggregation: Aggregation) -> ReportConfig {
        ReportConfig {
            aggregation,
            ..ReportConfig::default()
        }
    }

    #[test]
    fn pod_level_report_joins_spec_and_usage() {
        let listings = vec![
            pod_map([
                workload("default", "a-1", "node-1", (100, 200)),
                workload("default", "a-2", "node-1", (100, 200)),
            ]),
            pod_map([usage("default", "a-1", 150)]),
        ];

        let table = build_table(&listings, &config(Aggregation::Pod)).unwrap();
        assert_eq!(
            values(&table.header),
            vec![
                "NAMESPACE", "POD", "CPU USE", "CPU REQ", "CPU LIM", "MEM USE", "MEM REQ",
                "MEM LIM"
            ]
        );
        assert_eq!(table.body.len(), 2);

        let first = &table.body[0];
        assert_eq!(
            values(first),
            vec!["default", "a-1", "150m", "100m", "200m", "-", "-", "-"]
        );
        assert_eq!(first[2].style, CellStyle::Warning);

        let second = &table.body[1];
        assert_eq!(
            values(second),
            vec!["default", "a-2", "-", "100m", "200m", "-", "-", "-"]
        );
        assert_eq!(second[2].style, CellStyle::Plain);

        let footer = table.footer.as_ref().unwrap();
        assert_eq!(
            values(footer),
            vec!["", "", "150m", "200m", "400m", "-", "-", "-"]
        );
    }

    #[test]
    fn excluded_namespace_is_gone_at_every_level() {
        let config_for = |aggregation| ReportConfig {
            excluded_namespaces: BTreeSet::from(["kube-system".to_string()]),
            ..config(aggregation)
        };

        for aggregation in Aggregation::ALL {
            let table = build_table(&cluster(), &config_for(aggregation)).unwrap();
            for row in &table.body {
                assert!(!values(row).contains(&"kube-system"));
            }
            let total = match aggregation {
                Aggregation::Total => &table.body[0],
                _ => table.footer.as_ref().unwrap(),
            };
            let usage_column = total.len() - 6;
            assert_eq!(total[usage_column].value, "150m", "at {aggregation}");
        }
    }

    #[test]
    fn footer_matches_ungrouped_usage_at_every_level() {
        for aggregation in Aggregation::ALL {
            let table = build_table(&cluster(), &config(aggregation)).unwrap();
            let total = match aggregation {
                Aggregation::Total => {
                    assert!(table.footer.is_none());
                    assert_eq!(table.body.len(), 1);
                    &table.body[0]
                }
                _ => table.footer.as_ref().unwrap(),
            };
            let usage_column = total.len() - 6;
            assert_eq!(total[usage_column].value, "220m", "at {aggregation}");
        }
    }

    #[test]
    fn node_level_rows_are_per_node() {
        let table = build_table(&cluster(), &config(Aggregation::Node)).unwrap();
        let rows = table.body.iter().map(|row| values(row)).collect::<Vec<_>>();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][..3], ["1", "220m", "150m"]);
        assert_eq!(rows[1][..3], ["2", "-", "100m"]);
    }

    #[test]
    fn full_names_keep_nodes_intact() {
        let config = ReportConfig {
            full_names: true,
            ..config(Aggregation::Node)
        };
        let table = build_table(&cluster(), &config).unwrap();
        assert_eq!(table.body[0][0].value, "node-1");
    }

    #[test]
    fn only_warnings_drops_pods_within_bounds() {
        let config = ReportConfig {
            only_warnings: true,
            ..config(Aggregation::Pod)
        };
        let table = build_table(&cluster(), &config).unwrap();
        assert_eq!(table.body.len(), 2);
        assert_eq!(table.body[0][1].value, "a-1");
        assert_eq!(table.body[1][1].value, "dns-1");
    }

    #[test]
    fn empty_cluster_renders_header_only() {
        let table = build_table(&[PodMap::new()], &config(Aggregation::Pod)).unwrap();
        assert!(table.body.is_empty());
        assert!(table.footer.is_none());

        let table = build_table(&[], &config(Aggregation::Total)).unwrap();
        assert!(table.body.is_empty());
    }

    #[test]
    fn one_failed_source_is_tolerated() {
        let listings = collect_listings(vec![
            FetchOutcome::new(Source::Metrics, Err(anyhow::anyhow!("metrics API unavailable"))),
            FetchOutcome::new(Source::Workloads, Ok(cluster().remove(0))),
        ])
        .unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].len(), 3);
    }

    #[test]
    fn listings_come_back_in_reconciliation_order() {
        let mut sources = cluster();
        let metrics = sources.pop().unwrap();
        let workloads = sources.pop().unwrap();

        let listings = collect_listings(vec![
            FetchOutcome::new(Source::Metrics, Ok(metrics.clone())),
            FetchOutcome::new(Source::Workloads, Ok(workloads.clone())),
        ])
        .unwrap();
        assert_eq!(listings, vec![workloads, metrics]);
    }

    #[test]
    fn all_sources_failing_is_an_error() {
        let error = collect_listings(vec![
            FetchOutcome::new(Source::Workloads, Err(anyhow::anyhow!("forbidden"))),
            FetchOutcome::new(Source::Metrics, Err(anyhow::anyhow!("not found"))),
        ])
        .unwrap_err();
        let message = error.to_string();
        assert!(message.contains("pods: forbidden"));
        assert!(message.contains("pod metrics: not found"));
    }

    #[test]
    fn conflicting_listings_abort_the_report() {
        let listings = vec![
            cluster().remove(0),
            [(
                PodRecord::new("default", "a-1").key(),
                PodRecord::new("default", "other"),
            )]
            .into_iter()
            .collect::<PodMap>(),
        ];

        let mut out = Vec::new();
        let error = write_report(&listings, &config(Aggregation::Pod), &mut out).unwrap_err();
        assert!(format!("{error:#}").contains("mismatched name"));
        assert!(out.is_empty());
    }

    #[test]
    fn written_report_ends_with_footer() {
        let mut out = Vec::new();
        write_report(&cluster(), &config(Aggregation::Namespace), &mut out).unwrap();
        let output = String::from_utf8(out).unwrap();
        let lines = output.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("NAMESPACE"));
        assert!(lines[1].starts_with("default"));
        assert!(lines[2].starts_with("kube-system"));
        assert!(lines[3].trim_start().starts_with("220m"));
    }
}
