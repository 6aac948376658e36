use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

/// Request, limit and usage for one resource dimension.
///
/// CPU is measured in millicores, memory in bytes. A zero field means the
/// value was not reported, which cannot be told apart from an explicit zero.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ResourceValue {
    pub request: u64,
    pub limit: u64,
    pub usage: u64,
}

impl ResourceValue {
    pub fn new(request: u64, limit: u64, usage: u64) -> Self {
        Self {
            request,
            limit,
            usage,
        }
    }

    pub fn usage(usage: u64) -> Self {
        Self {
            usage,
            ..Self::default()
        }
    }

    /// Combines two partial views of the same container: a non-zero incoming
    /// field overwrites, a zero incoming field keeps what is already known.
    pub fn reconcile_merge(self, incoming: Self) -> Self {
        fn pick(current: u64, incoming: u64) -> u64 {
            if incoming != 0 { incoming } else { current }
        }

        Self {
            request: pick(self.request, incoming.request),
            limit: pick(self.limit, incoming.limit),
            usage: pick(self.usage, incoming.usage),
        }
    }

    /// Field-wise sum of two distinct entities.
    pub fn aggregate_sum(self, other: Self) -> Self {
        Self {
            request: self.request.saturating_add(other.request),
            limit: self.limit.saturating_add(other.limit),
            usage: self.usage.saturating_add(other.usage),
        }
    }

    pub fn exceeds_request(&self) -> bool {
        self.request != 0 && self.usage > self.request
    }

    pub fn exceeds_limit(&self) -> bool {
        self.limit != 0 && self.usage > self.limit
    }
}

impl<'a> std::iter::Sum<&'a ResourceValue> for ResourceValue {
    fn sum<I: Iterator<Item = &'a ResourceValue>>(iter: I) -> Self {
        iter.fold(Self::default(), |total, value| total.aggregate_sum(*value))
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ContainerRecord {
    pub name: String,
    pub cpu: ResourceValue,
    pub memory: ResourceValue,
}

impl ContainerRecord {
    pub fn new(name: impl Into<String>, cpu: ResourceValue, memory: ResourceValue) -> Self {
        Self {
            name: name.into(),
            cpu,
            memory,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PodKey(String);

impl PodKey {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self(format!("{namespace}/{name}"))
    }
}

impl Display for PodKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PodRecord {
    pub name: String,
    pub namespace: String,
    pub node: String,
    pub containers: HashMap<String, ContainerRecord>,
}

impl PodRecord {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = node.into();
        self
    }

    pub fn with_container(mut self, container: ContainerRecord) -> Self {
        self.containers.insert(container.name.clone(), container);
        self
    }

    pub fn key(&self) -> PodKey {
        PodKey::new(&self.namespace, &self.name)
    }

    pub fn cpu(&self) -> ResourceValue {
        self.containers.values().map(|container| &container.cpu).sum()
    }

    pub fn memory(&self) -> ResourceValue {
        self.containers
            .values()
            .map(|container| &container.memory)
            .sum()
    }
}

pub type PodMap = HashMap<PodKey, PodRecord>;

pub fn pod_map(pods: impl IntoIterator<Item = PodRecord>) -> PodMap {
    pods.into_iter().map(|pod| (pod.key(), pod)).collect()
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Aggregation {
    Container,
    Pod,
    Namespace,
    Node,
    Total,
}

/// Identity columns a row may carry.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IdentityColumn {
    Namespace,
    Pod,
    Container,
    Node,
}

impl IdentityColumn {
    pub fn header(self) -> &'static str {
        match self {
            Self::Namespace => "NAMESPACE",
            Self::Pod => "POD",
            Self::Container => "CONTAINER",
            Self::Node => "NODE",
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct GroupFields {
    namespace: bool,
    pod: bool,
    container: bool,
    node: bool,
}

impl Aggregation {
    pub const ALL: [Self; 5] = [
        Self::Container,
        Self::Pod,
        Self::Namespace,
        Self::Node,
        Self::Total,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Pod => "pod",
            Self::Namespace => "namespace",
            Self::Node => "node",
            Self::Total => "total",
        }
    }

    fn group_fields(self) -> GroupFields {
        match self {
            Self::Container => GroupFields {
                namespace: true,
                pod: true,
                container: true,
                node: true,
            },
            Self::Pod => GroupFields {
                namespace: true,
                pod: true,
                container: false,
                node: true,
            },
            Self::Namespace => GroupFields {
                namespace: true,
                pod: false,
                container: false,
                node: false,
            },
            Self::Node => GroupFields {
                namespace: false,
                pod: false,
                container: false,
                node: true,
            },
            Self::Total => GroupFields {
                namespace: false,
                pod: false,
                container: false,
                node: false,
            },
        }
    }

    pub fn keeps_namespace(self) -> bool {
        self.group_fields().namespace
    }

    pub fn keeps_pod(self) -> bool {
        self.group_fields().pod
    }

    pub fn keeps_container(self) -> bool {
        self.group_fields().container
    }

    pub fn keeps_node(self) -> bool {
        self.group_fields().node
    }

    /// Node is shown when it is the grouping key, or on request at pod and
    /// container granularity.
    pub fn shows_node(self, show_nodes: bool) -> bool {
        match self {
            Self::Node => true,
            Self::Container | Self::Pod => show_nodes,
            Self::Namespace | Self::Total => false,
        }
    }

    pub fn identity_columns(self, show_nodes: bool) -> Vec<IdentityColumn> {
        let mut columns = match self {
            Self::Container => vec![
                IdentityColumn::Namespace,
                IdentityColumn::Pod,
                IdentityColumn::Container,
            ],
            Self::Pod => vec![IdentityColumn::Namespace, IdentityColumn::Pod],
            Self::Namespace => vec![IdentityColumn::Namespace],
            Self::Node | Self::Total => Vec::new(),
        };
        if self.shows_node(show_nodes) {
            columns.push(IdentityColumn::Node);
        }
        columns
    }
}

impl Display for Aggregation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{input:?} is not a valid aggregation type, expected one of container, pod, namespace, node, total")]
pub struct ParseAggregationError {
    pub input: String,
}

impl FromStr for Aggregation {
    type Err = ParseAggregationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let token = value.trim();
        Self::ALL
            .into_iter()
            .find(|aggregation| aggregation.name().eq_ignore_ascii_case(token))
            .ok_or_else(|| ParseAggregationError {
                input: value.to_string(),
            })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}
