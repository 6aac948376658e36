use std::collections::{BTreeSet, HashMap};

use crate::rows::AggregateRow;

/// Shortens generated pod names (`web-7d9c8-x2k4p` becomes `web`) and trims
/// the hyphen-delimited prefix every node name shares.
pub fn simplify_names(rows: &mut [AggregateRow]) {
    let pod_names = short_pod_names(rows.iter().map(|row| row.name.as_str()));
    let node_prefix = common_node_prefix(rows.iter().map(|row| row.node.as_str()));

    for row in rows.iter_mut() {
        if let Some(short) = pod_names.get(&row.name) {
            row.name = short.clone();
        }
        if let Some(prefix) = node_prefix.as_deref()
            && let Some(trimmed) = row.node.strip_prefix(prefix)
        {
            row.node = trimmed.to_string();
        }
    }
}

fn short_pod_names<'a>(names: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    let distinct = names
        .filter(|name| !name.is_empty())
        .collect::<BTreeSet<_>>();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in &distinct {
        *counts.entry(pod_stem(name)).or_default() += 1;
    }

    distinct
        .into_iter()
        .filter_map(|name| {
            let parts = name.split('-').collect::<Vec<_>>();
            if parts.len() < 3 {
                return None;
            }
            let stem = parts[..parts.len() - 2].join("-");
            let short = if counts.get(&stem).copied().unwrap_or(0) > 1 {
                format!("{stem}-{}", parts[parts.len() - 1])
            } else {
                stem
            };
            Some((name.to_string(), short))
        })
        .collect()
}

fn pod_stem(name: &str) -> String {
    let parts = name.split('-').collect::<Vec<_>>();
    if parts.len() < 3 {
        return name.to_string();
    }
    parts[..parts.len() - 2].join("-")
}

/// Longest run of leading hyphen segments shared by every node, with the
/// trailing hyphen. Never consumes a whole node name.
fn common_node_prefix<'a>(nodes: impl Iterator<Item = &'a str>) -> Option<String> {
    let nodes = nodes
        .filter(|node| !node.is_empty())
        .collect::<BTreeSet<_>>();
    let mut split = nodes.iter().map(|node| node.split('-').collect::<Vec<_>>());
    let mut prefix = split.next()?;
    prefix.pop();

    for parts in split {
        let shared = prefix
            .iter()
            .zip(parts.iter().take(parts.len().saturating_sub(1)))
            .take_while(|(left, right)| left == right)
            .count();
        prefix.truncate(shared);
    }

    if prefix.is_empty() {
        return None;
    }
    Some(format!("{}-", prefix.join("-")))
}
