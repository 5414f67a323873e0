//! Placement Validator
//!
//! Authoritative half of the placement policy. Every admitted PV must name a
//! storage class with a configured zone and be pinned to exactly that zone.

use super::affinity::{find_zone_affinity, ZoneAffinity};
use super::config::PlacementConfig;
use super::system_namespace;
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::PersistentVolume;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a successful validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationDecision {
    /// PV belongs to a system namespace and validation there is disabled
    Bypassed,
    /// PV satisfies the placement invariant
    Allowed,
}

/// Checks PersistentVolumes against the storage-class/zone invariant
pub struct PlacementValidator {
    config: Arc<PlacementConfig>,
}

impl PlacementValidator {
    /// Create a new validator
    pub fn new(config: Arc<PlacementConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Validate a PV; every rejection is returned as an error
    pub fn validate(&self, pv: &PersistentVolume) -> Result<ValidationDecision> {
        let pv_name = pv.metadata.name.as_deref().unwrap_or_default();

        if !self.config.verify_in_system_namespaces {
            if let Some(namespace) = system_namespace(pv, &self.config) {
                info!(pv = %pv_name, namespace = %namespace, "PV is in a system namespace, skipping validation");
                return Ok(ValidationDecision::Bypassed);
            }
        }

        let storage_class = pv
            .spec
            .as_ref()
            .and_then(|spec| spec.storage_class_name.as_deref())
            .unwrap_or_default();
        if storage_class.is_empty() {
            return Err(Error::MissingStorageClass);
        }

        let zone = self
            .config
            .zone_for_storage_class(storage_class)
            .ok_or_else(|| Error::UnknownStorageClass {
                storage_class: storage_class.to_string(),
            })?;

        match find_zone_affinity(pv)? {
            ZoneAffinity::Absent => Err(Error::MissingZoneAffinity {
                zone: zone.to_string(),
            }),
            ZoneAffinity::Zone(found) if found != zone => Err(Error::ZoneMismatch {
                expected: zone.to_string(),
                found: found.to_string(),
            }),
            ZoneAffinity::Zone(_) => {
                debug!(pv = %pv_name, storage_class = %storage_class, zone = %zone, "PV placement is valid");
                Ok(ValidationDecision::Allowed)
            }
        }
    }
}
