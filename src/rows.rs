use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::model::{Aggregation, PodRecord, ResourceValue};

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ResourceRow {
    pub namespace: String,
    pub name: String,
    pub node: String,
    pub container: String,
    pub cpu: ResourceValue,
    pub memory: ResourceValue,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
struct GroupKey {
    namespace: String,
    name: String,
    container: String,
    node: String,
}

impl GroupKey {
    fn for_row(row: &ResourceRow, aggregation: Aggregation) -> Self {
        let keep = |kept: bool, value: &str| {
            if kept { value.to_string() } else { String::new() }
        };
        Self {
            namespace: keep(aggregation.keeps_namespace(), &row.namespace),
            name: keep(aggregation.keeps_pod(), &row.name),
            container: keep(aggregation.keeps_container(), &row.container),
            node: keep(aggregation.keeps_node(), &row.node),
        }
    }
}

/// A group of rows sharing the identity fields kept by an aggregation level.
///
/// Values are kept per constituent row and summed on demand.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct AggregateRow {
    pub namespace: String,
    pub name: String,
    pub node: String,
    pub container: String,
    pub cpu: Vec<ResourceValue>,
    pub memory: Vec<ResourceValue>,
}

impl AggregateRow {
    fn from_key(key: GroupKey) -> Self {
        Self {
            namespace: key.namespace,
            name: key.name,
            node: key.node,
            container: key.container,
            cpu: Vec::new(),
            memory: Vec::new(),
        }
    }

    fn push(&mut self, row: &ResourceRow) {
        self.cpu.push(row.cpu);
        self.memory.push(row.memory);
    }

    pub fn total_cpu(&self) -> ResourceValue {
        self.cpu.iter().sum()
    }

    pub fn total_memory(&self) -> ResourceValue {
        self.memory.iter().sum()
    }
}

pub fn pod_to_rows(pod: &PodRecord) -> Vec<ResourceRow> {
    pod.containers
        .values()
        .map(|container| ResourceRow {
            namespace: pod.namespace.clone(),
            name: pod.name.clone(),
            node: pod.node.clone(),
            container: container.name.clone(),
            cpu: container.cpu,
            memory: container.memory,
        })
        .collect()
}

pub fn aggregate(rows: &[ResourceRow], aggregation: Aggregation) -> Vec<AggregateRow> {
    let mut groups: BTreeMap<GroupKey, AggregateRow> = BTreeMap::new();
    for row in rows {
        let key = GroupKey::for_row(row, aggregation);
        groups
            .entry(key.clone())
            .or_insert_with(|| AggregateRow::from_key(key))
            .push(row);
    }
    groups.into_values().collect()
}

/// Grand total over every row with all identity fields blank, or `None` when
/// there is nothing to total.
pub fn footer(rows: &[ResourceRow]) -> Option<AggregateRow> {
    aggregate(rows, Aggregation::Total).into_iter().next()
}

pub fn compare_rows(left: &AggregateRow, right: &AggregateRow) -> Ordering {
    left.namespace
        .cmp(&right.namespace)
        .then_with(|| left.name.cmp(&right.name))
        .then_with(|| left.container.cmp(&right.container))
        .then_with(|| left.node.cmp(&right.node))
}

pub fn sort_rows(rows: &mut [AggregateRow]) {
    rows.sort_by(compare_rows);
}
