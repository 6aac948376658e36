use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::{ContainerRecord, PodKey, PodMap, PodRecord};

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ReconcileError {
    #[error("attempted to merge pod {key} with mismatched {field}: {existing:?} vs {incoming:?}")]
    Conflict {
        key: PodKey,
        field: &'static str,
        existing: String,
        incoming: String,
    },
}

/// Merges partial pod listings into one record set.
///
/// Listings are applied in the order given; for a field reported non-zero by
/// more than one listing, the later listing wins. Inputs are left untouched.
pub fn reconcile(listings: &[PodMap]) -> Result<PodMap, ReconcileError> {
    let mut merged = PodMap::new();

    for listing in listings {
        for (key, pod) in listing {
            if let Some(existing) = merged.get(key) {
                check_identity(key, "name", &existing.name, &pod.name)?;
                check_identity(key, "namespace", &existing.namespace, &pod.namespace)?;
            }
            let entry = merged
                .entry(key.clone())
                .or_insert_with(|| PodRecord::new(&pod.namespace, &pod.name));

            if !pod.node.is_empty() {
                entry.node = pod.node.clone();
            }

            for (container_name, container) in &pod.containers {
                let target = entry
                    .containers
                    .entry(container_name.clone())
                    .or_insert_with(|| ContainerRecord {
                        name: container_name.clone(),
                        ..ContainerRecord::default()
                    });
                target.cpu = target.cpu.reconcile_merge(container.cpu);
                target.memory = target.memory.reconcile_merge(container.memory);
            }
        }
    }

    Ok(merged)
}

fn check_identity(
    key: &PodKey,
    field: &'static str,
    existing: &str,
    incoming: &str,
) -> Result<(), ReconcileError> {
    if existing == incoming {
        return Ok(());
    }
    Err(ReconcileError::Conflict {
        key: key.clone(),
        field,
        existing: existing.to_string(),
        incoming: incoming.to_string(),
    })
}

pub fn exclude_namespaces(pods: &mut PodMap, excluded: &BTreeSet<String>) {
    if excluded.is_empty() {
        return;
    }
    pods.retain(|_, pod| !excluded.contains(&pod.namespace));
}

/// Keeps only pods whose CPU or memory usage is above a declared bound.
pub fn retain_warnings(pods: &mut PodMap) {
    pods.retain(|_, pod| {
        let cpu = pod.cpu();
        let memory = pod.memory();
        cpu.exceeds_request()
            || cpu.exceeds_limit()
            || memory.exceeds_request()
            || memory.exceeds_limit()
    });
}
