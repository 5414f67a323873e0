//! Placement Mutator
//!
//! Best-effort half of the placement policy: assigns a storage class from the
//! namespace's zone preference when a PV has none (or uses the cluster
//! default), then pins the PV to the zone of its storage class.
//!
//! The mutator never rejects an unresolved PV. Whatever it cannot fix is left
//! for the [`PlacementValidator`](super::PlacementValidator) to refuse.

use super::affinity::{find_zone_affinity, zone_selector_term, ZoneAffinity};
use super::config::PlacementConfig;
use super::patch::{PatchOperation, PatchValue};
use super::system_namespace;
use super::zone::resolve_namespace_zone;
use crate::domain::ports::NamespaceLookupRef;
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::{NodeSelector, PersistentVolume, VolumeNodeAffinity};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// =============================================================================
// Mutation Decision
// =============================================================================

/// Result of running the mutator over one PV
#[derive(Debug, Clone, PartialEq)]
pub enum MutationDecision {
    /// PV belongs to a system namespace and mutation there is disabled
    Bypassed,
    /// Nothing to change
    Unchanged,
    /// Apply these operations, in order
    Patched(Vec<PatchOperation>),
}

impl MutationDecision {
    fn from_patches(patches: Vec<PatchOperation>) -> Self {
        if patches.is_empty() {
            MutationDecision::Unchanged
        } else {
            MutationDecision::Patched(patches)
        }
    }

    /// Operations to apply; empty means no change
    pub fn patches(&self) -> &[PatchOperation] {
        match self {
            MutationDecision::Patched(patches) => patches,
            MutationDecision::Bypassed | MutationDecision::Unchanged => &[],
        }
    }
}

// =============================================================================
// Placement Mutator
// =============================================================================

/// Computes storage-class and node-affinity patches for PersistentVolumes
pub struct PlacementMutator {
    config: Arc<PlacementConfig>,
    namespaces: NamespaceLookupRef,
}

impl PlacementMutator {
    /// Create a new mutator
    pub fn new(config: Arc<PlacementConfig>, namespaces: NamespaceLookupRef) -> Self {
        Self { config, namespaces }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Decide the patches for a PV.
    ///
    /// Only a malformed existing zone affinity is an error. Namespace lookup
    /// failures and zones without a preferred storage class are logged and
    /// the PV keeps its current storage class.
    pub async fn mutate(&self, pv: &PersistentVolume) -> Result<MutationDecision> {
        let pv_name = pv.metadata.name.as_deref().unwrap_or_default();

        if !self.config.mutate_in_system_namespaces {
            if let Some(namespace) = system_namespace(pv, &self.config) {
                info!(pv = %pv_name, namespace = %namespace, "PV is in a system namespace, skipping mutation");
                return Ok(MutationDecision::Bypassed);
            }
        }

        let mut patches = Vec::new();

        let current = pv
            .spec
            .as_ref()
            .and_then(|spec| spec.storage_class_name.as_deref())
            .unwrap_or_default();
        let mut storage_class = current.to_string();

        if self.config.needs_resolution(current) {
            match self.resolve_storage_class(pv).await {
                Ok(Some(preferred)) if preferred != current => {
                    debug!(pv = %pv_name, from = %current, to = %preferred, "Assigning preferred storage class");
                    let value = PatchValue::StorageClassName(preferred.clone());
                    patches.push(if current.is_empty() {
                        PatchOperation::add(value)
                    } else {
                        PatchOperation::replace(value)
                    });
                    storage_class = preferred;
                }
                Ok(_) => {}
                Err(e) if !e.is_fatal() => match &e {
                    Error::UnresolvableZoneMapping { .. } => {
                        error!(pv = %pv_name, error = %e, "Keeping storage class of the PV");
                    }
                    _ => {
                        warn!(pv = %pv_name, error = %e, "Failed to read namespace of the PV");
                    }
                },
                Err(e) => return Err(e),
            }
        }

        if storage_class.is_empty() {
            debug!(pv = %pv_name, "No storage class could be resolved, leaving PV to validation");
            return Ok(MutationDecision::from_patches(patches));
        }

        let existing = find_zone_affinity(pv)?;
        if existing == ZoneAffinity::Absent {
            if let Some(zone) = self.config.zone_for_storage_class(&storage_class) {
                debug!(pv = %pv_name, storage_class = %storage_class, zone = %zone, "Pinning PV to zone");
                patches.push(zone_affinity_patch(pv, zone));
            }
        }

        Ok(MutationDecision::from_patches(patches))
    }

    /// Preferred storage class for the namespace that claims the PV.
    ///
    /// `Ok(None)` when the PV is unclaimed or its namespace declares no zone.
    async fn resolve_storage_class(&self, pv: &PersistentVolume) -> Result<Option<String>> {
        let Some(namespace) = claim_namespace(pv) else {
            return Ok(None);
        };

        let annotations = self
            .namespaces
            .namespace_annotations(namespace)
            .await
            .map_err(|e| match e {
                lookup @ Error::NamespaceLookup { .. } => lookup,
                other => Error::NamespaceLookup {
                    namespace: namespace.to_string(),
                    reason: other.to_string(),
                },
            })?;

        let Some(zone) = resolve_namespace_zone(&annotations) else {
            return Ok(None);
        };
        debug!(namespace = %namespace, zone = %zone, "Resolved preferred zone of namespace");

        match self.config.preferred_storage_class(&zone) {
            Some(storage_class) => Ok(Some(storage_class.to_string())),
            None => Err(Error::UnresolvableZoneMapping { zone }),
        }
    }
}

fn claim_namespace(pv: &PersistentVolume) -> Option<&str> {
    pv.spec
        .as_ref()
        .and_then(|spec| spec.claim_ref.as_ref())
        .and_then(|claim| claim.namespace.as_deref())
        .filter(|ns| !ns.is_empty())
}

/// Append a zone term to the PV's required node affinity.
///
/// Existing terms are kept in order and the zone term is added after them,
/// so the scheduler sees the zone as one more alternative.
fn zone_affinity_patch(pv: &PersistentVolume, zone: &str) -> PatchOperation {
    let term = zone_selector_term(zone);
    let node_affinity = pv.spec.as_ref().and_then(|spec| spec.node_affinity.as_ref());

    match node_affinity {
        None => {
            debug!("nodeAffinity is not set");
            PatchOperation::add(PatchValue::NodeAffinity(VolumeNodeAffinity {
                required: Some(NodeSelector {
                    node_selector_terms: vec![term],
                }),
            }))
        }
        Some(VolumeNodeAffinity { required: None }) => {
            debug!("nodeAffinity.required is not set");
            PatchOperation::add(PatchValue::RequiredSelector(NodeSelector {
                node_selector_terms: vec![term],
            }))
        }
        Some(VolumeNodeAffinity {
            required: Some(required),
        }) if !required.node_selector_terms.is_empty() => {
            debug!(terms = required.node_selector_terms.len(), "Appending zone term to nodeSelectorTerms");
            let mut terms = required.node_selector_terms.clone();
            terms.push(term);
            PatchOperation::replace(PatchValue::SelectorTerms(terms))
        }
        Some(_) => {
            debug!("nodeAffinity.required.nodeSelectorTerms is empty");
            PatchOperation::add(PatchValue::SelectorTerms(vec![term]))
        }
    }
}
