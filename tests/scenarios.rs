//! End-to-end placement scenarios through the public API
//!
//! Each scenario runs the mutator, applies its patch the way the API server
//! would, and hands the result to the validator.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    NodeSelector, NodeSelectorRequirement, NodeSelectorTerm, ObjectReference, PersistentVolume,
    PersistentVolumeSpec, VolumeNodeAffinity,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use pv_placement_webhook::placement::to_json_patch;
use pv_placement_webhook::{
    Error, MutationDecision, NamespaceAnnotations, NamespaceLookup, PatchOperation, PatchValue,
    PlacementConfig, PlacementMutator, PlacementValidator, Result, ValidationDecision, ZONE_KEY,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Every namespace declares the same node selector
struct SelectorNamespaces(&'static str);

#[async_trait]
impl NamespaceLookup for SelectorNamespaces {
    async fn namespace_annotations(&self, _name: &str) -> Result<NamespaceAnnotations> {
        let mut annotations = BTreeMap::new();
        annotations.insert("openshift.io/node-selector".to_string(), self.0.to_string());
        Ok(annotations)
    }
}

fn engine(selector: &'static str) -> (PlacementMutator, PlacementValidator) {
    let mut config = PlacementConfig::default();
    config.zone_to_preferred_storage_class = BTreeMap::from([(
        "afranet".to_string(),
        "afranet-standard-block-storage".to_string(),
    )]);
    let config = Arc::new(config);
    (
        PlacementMutator::new(config.clone(), Arc::new(SelectorNamespaces(selector))),
        PlacementValidator::new(config),
    )
}

fn volume(storage_class: Option<&str>, namespace: &str) -> PersistentVolume {
    PersistentVolume {
        metadata: ObjectMeta {
            name: Some("pvc-7f3e".to_string()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeSpec {
            storage_class_name: storage_class.map(str::to_string),
            claim_ref: Some(ObjectReference {
                namespace: Some(namespace.to_string()),
                name: Some("data".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn zone_term(zone: &str) -> NodeSelectorTerm {
    NodeSelectorTerm {
        match_expressions: Some(vec![NodeSelectorRequirement {
            key: ZONE_KEY.to_string(),
            operator: "In".to_string(),
            values: Some(vec![zone.to_string()]),
        }]),
        match_fields: None,
    }
}

fn apply(pv: &PersistentVolume, decision: &MutationDecision) -> PersistentVolume {
    let mut doc = serde_json::to_value(pv).unwrap();
    let patch = to_json_patch(decision.patches()).unwrap();
    json_patch::patch(&mut doc, &patch.0).unwrap();
    serde_json::from_value(doc).unwrap()
}

#[tokio::test]
async fn scenario_a_storage_class_from_namespace_zone() {
    let (mutator, validator) = engine("topology.kubernetes.io/zone=afranet");
    let pv = volume(None, "team-a");

    let decision = mutator.mutate(&pv).await.unwrap();
    assert_eq!(
        decision.patches(),
        &[
            PatchOperation::add(PatchValue::StorageClassName(
                "afranet-standard-block-storage".to_string()
            )),
            PatchOperation::add(PatchValue::NodeAffinity(VolumeNodeAffinity {
                required: Some(NodeSelector {
                    node_selector_terms: vec![zone_term("afranet")],
                }),
            })),
        ]
    );

    let patched = apply(&pv, &decision);
    assert_eq!(validator.validate(&patched).unwrap(), ValidationDecision::Allowed);
    assert_eq!(mutator.mutate(&patched).await.unwrap(), MutationDecision::Unchanged);
}

#[tokio::test]
async fn scenario_b_affinity_for_mapped_storage_class() {
    // The namespace declares no zone, so the storage class is kept
    let (mutator, validator) = engine("node-role.kubernetes.io/compute=true");
    let pv = volume(Some("irancell-standard-block-storage"), "team-b");

    let decision = mutator.mutate(&pv).await.unwrap();
    assert_eq!(
        decision.patches(),
        &[PatchOperation::add(PatchValue::NodeAffinity(VolumeNodeAffinity {
            required: Some(NodeSelector {
                node_selector_terms: vec![zone_term("irancell")],
            }),
        }))]
    );

    let patched = apply(&pv, &decision);
    assert_eq!(validator.validate(&patched).unwrap(), ValidationDecision::Allowed);
}

#[tokio::test]
async fn scenario_c_unmapped_storage_class() {
    let (mutator, validator) = engine("topology.kubernetes.io/zone=afranet");
    let pv = volume(Some("unmapped-class"), "team-a");

    assert_eq!(mutator.mutate(&pv).await.unwrap(), MutationDecision::Unchanged);
    assert!(matches!(
        validator.validate(&pv),
        Err(Error::UnknownStorageClass { .. })
    ));
}

#[tokio::test]
async fn scenario_d_system_namespace_is_left_alone() {
    let (mutator, validator) = engine("topology.kubernetes.io/zone=afranet");
    let pv = volume(None, "kube-system");

    let decision = mutator.mutate(&pv).await.unwrap();
    assert_eq!(decision, MutationDecision::Bypassed);
    assert!(decision.patches().is_empty());
    assert_eq!(validator.validate(&pv).unwrap(), ValidationDecision::Bypassed);
}

#[tokio::test]
async fn unresolved_volume_is_rejected_by_validator() {
    let (mutator, validator) = engine("topology.kubernetes.io/zone=shatel");
    let pv = volume(None, "team-c");

    assert_eq!(mutator.mutate(&pv).await.unwrap(), MutationDecision::Unchanged);
    assert!(matches!(validator.validate(&pv), Err(Error::MissingStorageClass)));
}
