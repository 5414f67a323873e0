//! Affinity Inspector
//!
//! Finds the zone a PersistentVolume is pinned to through its required node
//! affinity. Both the mutator and the validator use [`find_zone_affinity`],
//! so "already pinned" means the same thing on both sides of admission.

use super::zone::ZONE_KEY;
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::{NodeSelectorRequirement, NodeSelectorTerm, PersistentVolume};

/// Node selector operator accepted for zone pinning
pub const OPERATOR_IN: &str = "In";

/// Outcome of a successful zone affinity scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneAffinity<'a> {
    /// No requirement on the zone key exists
    Absent,
    /// The PV is pinned to exactly this zone
    Zone(&'a str),
}

impl<'a> ZoneAffinity<'a> {
    /// The pinned zone, if any
    pub fn zone(&self) -> Option<&'a str> {
        match self {
            ZoneAffinity::Absent => None,
            ZoneAffinity::Zone(zone) => Some(zone),
        }
    }
}

/// Scan the required node affinity of a PV for a zone constraint.
///
/// Terms and their match expressions are scanned in order and the first
/// expression keyed by the zone key decides: `In` with a single non-empty
/// value pins the zone, anything else is an [`Error::InvalidZoneAffinity`].
pub fn find_zone_affinity(pv: &PersistentVolume) -> Result<ZoneAffinity<'_>> {
    let required = pv
        .spec
        .as_ref()
        .and_then(|spec| spec.node_affinity.as_ref())
        .and_then(|affinity| affinity.required.as_ref());

    let Some(required) = required else {
        return Ok(ZoneAffinity::Absent);
    };

    let zone_expr = required
        .node_selector_terms
        .iter()
        .flat_map(|term| term.match_expressions.iter().flatten())
        .find(|expr| expr.key == ZONE_KEY);

    match zone_expr {
        None => Ok(ZoneAffinity::Absent),
        Some(expr) => match (expr.operator.as_str(), expr.values.as_deref()) {
            (OPERATOR_IN, Some([zone])) if !zone.is_empty() => {
                Ok(ZoneAffinity::Zone(zone.as_str()))
            }
            (operator, values) => Err(Error::InvalidZoneAffinity {
                operator: operator.to_string(),
                values: values.map_or(0, <[String]>::len),
            }),
        },
    }
}

/// Build the selector term pinning a volume to `zone`
pub fn zone_selector_term(zone: &str) -> NodeSelectorTerm {
    NodeSelectorTerm {
        match_expressions: Some(vec![NodeSelectorRequirement {
            key: ZONE_KEY.to_string(),
            operator: OPERATOR_IN.to_string(),
            values: Some(vec![zone.to_string()]),
        }]),
        match_fields: None,
    }
}
