//! Benchmark for the placement decision path
//!
//! Both webhooks run inside the API server's admission deadline, so a
//! decision should stay in the low microseconds.

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use k8s_openapi::api::core::v1::{
    NodeSelector, NodeSelectorRequirement, NodeSelectorTerm, ObjectReference, PersistentVolume,
    PersistentVolumeSpec, VolumeNodeAffinity,
};
use pv_placement_webhook::{
    NamespaceAnnotations, NamespaceLookup, PlacementConfig, PlacementMutator, PlacementValidator,
    Result, ZONE_KEY,
};
use std::collections::BTreeMap;
use std::sync::Arc;

struct FixedNamespace(NamespaceAnnotations);

#[async_trait]
impl NamespaceLookup for FixedNamespace {
    async fn namespace_annotations(&self, _name: &str) -> Result<NamespaceAnnotations> {
        Ok(self.0.clone())
    }
}

fn unresolved_pv() -> PersistentVolume {
    PersistentVolume {
        spec: Some(PersistentVolumeSpec {
            claim_ref: Some(ObjectReference {
                namespace: Some("team-a".to_string()),
                name: Some("data".to_string()),
                ..Default::default()
            }),
            node_affinity: Some(VolumeNodeAffinity {
                required: Some(NodeSelector {
                    node_selector_terms: vec![NodeSelectorTerm {
                        match_expressions: Some(vec![NodeSelectorRequirement {
                            key: "kubernetes.io/hostname".to_string(),
                            operator: "In".to_string(),
                            values: Some(vec!["worker-1".to_string()]),
                        }]),
                        match_fields: None,
                    }],
                }),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pinned_pv() -> PersistentVolume {
    PersistentVolume {
        spec: Some(PersistentVolumeSpec {
            storage_class_name: Some("afranet-standard-block-storage".to_string()),
            node_affinity: Some(VolumeNodeAffinity {
                required: Some(NodeSelector {
                    node_selector_terms: vec![NodeSelectorTerm {
                        match_expressions: Some(vec![NodeSelectorRequirement {
                            key: ZONE_KEY.to_string(),
                            operator: "In".to_string(),
                            values: Some(vec!["afranet".to_string()]),
                        }]),
                        match_fields: None,
                    }],
                }),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn bench_mutate(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement");
    group.throughput(Throughput::Elements(1));

    let mut annotations = BTreeMap::new();
    annotations.insert(
        "openshift.io/node-selector".to_string(),
        "node-role.kubernetes.io/compute=true,topology.kubernetes.io/zone=afranet".to_string(),
    );
    let mutator = PlacementMutator::new(
        Arc::new(PlacementConfig::default()),
        Arc::new(FixedNamespace(annotations)),
    );
    let pv = unresolved_pv();

    group.bench_function("mutate_unresolved", |b| {
        b.iter(|| tokio_test::block_on(mutator.mutate(black_box(&pv))));
    });

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement");
    group.throughput(Throughput::Elements(1));

    let validator = PlacementValidator::new(Arc::new(PlacementConfig::default()));
    let pv = pinned_pv();

    group.bench_function("validate_pinned", |b| {
        b.iter(|| validator.validate(black_box(&pv)));
    });

    group.finish();
}

criterion_group!(benches, bench_mutate, bench_validate);
criterion_main!(benches);
