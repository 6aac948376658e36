use std::collections::BTreeMap;
use std::fmt::Debug;

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{Container, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ListParams;
use kube::config::KubeConfigOptions;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, Config, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::model::{ContainerRecord, NamespaceScope, PodMap, PodRecord, ResourceValue, pod_map};

const PAGE_SIZE: u32 = 500;
const RUNNING_PODS: &str = "status.phase=Running";

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    cluster: String,
}

impl KubeGateway {
    pub async fn new(context: Option<String>) -> Result<Self> {
        let config = match context {
            Some(context) => {
                let options = KubeConfigOptions {
                    context: Some(context),
                    cluster: None,
                    user: None,
                };
                Config::from_kubeconfig(&options)
                    .await
                    .context("failed to load Kubernetes configuration for the requested context")?
            }
            None => Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?,
        };

        let cluster = config.cluster_url.to_string();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;
        Ok(Self { client, cluster })
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Running pods with the requests and limits declared on their containers.
    pub async fn fetch_workload_pods(&self, scope: &NamespaceScope) -> Result<PodMap> {
        let pods: Api<Pod> = match scope {
            NamespaceScope::All => Api::all(self.client.clone()),
            NamespaceScope::Named(namespace) => Api::namespaced(self.client.clone(), namespace),
        };

        let params = ListParams::default().limit(PAGE_SIZE).fields(RUNNING_PODS);
        let list = list_all(&pods, params)
            .await
            .context("failed to list pods")?;
        debug!(pods = list.len(), %scope, "listed workload pods");

        Ok(pod_map(list.iter().map(pod_record_from_spec)))
    }

    /// Current per-container usage from the metrics API.
    pub async fn fetch_usage_metrics(&self, scope: &NamespaceScope) -> Result<PodMap> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "pods");
        let metrics: Api<DynamicObject> = match scope {
            NamespaceScope::All => Api::all_with(self.client.clone(), &resource),
            NamespaceScope::Named(namespace) => {
                Api::namespaced_with(self.client.clone(), namespace, &resource)
            }
        };

        let list = list_all(&metrics, ListParams::default().limit(PAGE_SIZE))
            .await
            .context("failed to list pod metrics")?;
        debug!(pods = list.len(), %scope, "listed pod metrics");

        Ok(pod_map(list.iter().map(|pod_metric| {
            pod_record_from_metrics(
                &pod_metric.namespace().unwrap_or_default(),
                &pod_metric.name_any(),
                &pod_metric.data,
            )
        })))
    }
}

async fn list_all<K>(api: &Api<K>, mut params: ListParams) -> Result<Vec<K>>
where
    K: Clone + DeserializeOwned + Debug,
{
    let mut items = Vec::new();
    loop {
        let page = api.list(&params).await?;
        items.extend(page.items);
        match page.metadata.continue_ {
            Some(token) if !token.is_empty() => params = params.continue_token(&token),
            _ => break,
        }
    }
    Ok(items)
}

fn pod_record_from_spec(pod: &Pod) -> PodRecord {
    let spec = pod.spec.as_ref();
    let mut record = PodRecord::new(pod.namespace().unwrap_or_default(), pod.name_any())
        .with_node(
            spec.and_then(|spec| spec.node_name.clone())
                .unwrap_or_default(),
        );

    for container in spec.map(|spec| spec.containers.as_slice()).unwrap_or(&[]) {
        record = record.with_container(container_record_from_spec(container));
    }
    record
}

fn container_record_from_spec(container: &Container) -> ContainerRecord {
    let resources = container.resources.as_ref();
    let requests = resources.and_then(|resources| resources.requests.as_ref());
    let limits = resources.and_then(|resources| resources.limits.as_ref());

    let cpu = |bounds| {
        bound(bounds, "cpu")
            .and_then(parse_cpu_millicores)
            .unwrap_or(0)
    };
    let memory = |bounds| {
        bound(bounds, "memory")
            .and_then(parse_memory_bytes)
            .unwrap_or(0)
    };

    ContainerRecord::new(
        container.name.clone(),
        ResourceValue::new(cpu(requests), cpu(limits), 0),
        ResourceValue::new(memory(requests), memory(limits), 0),
    )
}

fn bound<'a>(bounds: Option<&'a BTreeMap<String, Quantity>>, resource: &str) -> Option<&'a str> {
    bounds
        .and_then(|bounds| bounds.get(resource))
        .map(|quantity| quantity.0.as_str())
}

fn pod_record_from_metrics(namespace: &str, name: &str, data: &Value) -> PodRecord {
    let containers = data
        .get("containers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    containers
        .iter()
        .filter_map(|container| {
            let name = container.get("name").and_then(Value::as_str)?;
            let (cpu, memory) = container
                .get("usage")
                .map(parse_usage_from_value)
                .unwrap_or((0, 0));
            Some(ContainerRecord::new(
                name,
                ResourceValue::usage(cpu),
                ResourceValue::usage(memory),
            ))
        })
        .fold(PodRecord::new(namespace, name), PodRecord::with_container)
}

fn parse_usage_from_value(value: &Value) -> (u64, u64) {
    let cpu = value
        .get("cpu")
        .and_then(Value::as_str)
        .and_then(parse_cpu_millicores)
        .unwrap_or(0);
    let memory = value
        .get("memory")
        .and_then(Value::as_str)
        .and_then(parse_memory_bytes)
        .unwrap_or(0);
    (cpu, memory)
}

fn parse_cpu_millicores(value: &str) -> Option<u64> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let (number, multiplier) = if let Some(number) = raw.strip_suffix('m') {
        (number, 1.0)
    } else if let Some(number) = raw.strip_suffix('u') {
        (number, 0.001)
    } else if let Some(number) = raw.strip_suffix('n') {
        (number, 0.000001)
    } else {
        (raw, 1000.0)
    };

    let numeric = number.parse::<f64>().ok()?;
    let millicores = (numeric * multiplier).round();
    if !millicores.is_finite() || millicores < 0.0 {
        return None;
    }
    Some(millicores as u64)
}

fn parse_memory_bytes(value: &str) -> Option<u64> {
    const UNITS: [(&str, f64); 13] = [
        ("Ei", 1_152_921_504_606_846_976.0),
        ("Pi", 1_125_899_906_842_624.0),
        ("Ti", 1_099_511_627_776.0),
        ("Gi", 1_073_741_824.0),
        ("Mi", 1_048_576.0),
        ("Ki", 1_024.0),
        ("E", 1_000_000_000_000_000_000.0),
        ("P", 1_000_000_000_000_000.0),
        ("T", 1_000_000_000_000.0),
        ("G", 1_000_000_000.0),
        ("M", 1_000_000.0),
        ("k", 1_000.0),
        ("m", 0.001),
    ];

    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, multiplier)| {
            raw.strip_suffix(*suffix)
                .map(|number| (number, *multiplier))
        })
        .unwrap_or((raw, 1.0));

    let bytes = (number.parse::<f64>().ok()? * multiplier).round();
    if !bytes.is_finite() || bytes < 0.0 {
        return None;
    }
    Some(bytes as u64)
}
