//! Placement Engine
//!
//! Zone-aware placement policy for PersistentVolumes. The mutator assigns a
//! storage class and pins the volume to that class's zone; the validator
//! refuses any volume that breaks the storage-class/zone invariant.

pub mod affinity;
pub mod config;
pub mod mutator;
pub mod patch;
pub mod validator;
pub mod zone;

pub use affinity::*;
pub use config::*;
pub use mutator::*;
pub use patch::*;
pub use validator::*;
pub use zone::*;

use k8s_openapi::api::core::v1::PersistentVolume;

/// The system namespace a PV belongs to, if any.
///
/// PVs are cluster-scoped, so the namespace of the bound claim is used when
/// the object itself carries none.
pub(crate) fn system_namespace<'a>(
    pv: &'a PersistentVolume,
    config: &PlacementConfig,
) -> Option<&'a str> {
    let namespace = pv.metadata.namespace.as_deref().filter(|ns| !ns.is_empty()).or_else(|| {
        pv.spec
            .as_ref()
            .and_then(|spec| spec.claim_ref.as_ref())
            .and_then(|claim| claim.namespace.as_deref())
    })?;

    config.is_system_namespace(namespace).then_some(namespace)
}
