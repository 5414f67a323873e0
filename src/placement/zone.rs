//! Zone Resolver
//!
//! Derives a namespace's preferred zone from its node-selector annotation.

use std::collections::BTreeMap;

// =============================================================================
// Well-known Keys
// =============================================================================

/// Node label carrying the zone a node belongs to
pub const ZONE_KEY: &str = "topology.kubernetes.io/zone";

/// Namespace annotation holding the default node selector of its workloads
pub const NODE_SELECTOR_ANNOTATION: &str = "openshift.io/node-selector";

// =============================================================================
// Resolution
// =============================================================================

/// Resolve the zone preference declared by a namespace.
///
/// The node-selector annotation is a comma-separated list of `key=value` or
/// `key:value` specs. The first spec keyed by [`ZONE_KEY`] with a non-empty
/// value wins. Malformed specs are skipped; no preference yields `None`.
pub fn resolve_namespace_zone(annotations: &BTreeMap<String, String>) -> Option<String> {
    let selector = annotations.get(NODE_SELECTOR_ANNOTATION)?;
    if selector.is_empty() {
        return None;
    }

    selector
        .split(',')
        .filter_map(split_selector_spec)
        .find(|(key, value)| *key == ZONE_KEY && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Split one selector spec into its key and value.
///
/// `=` is tried first; `:` is only used when the spec has no `=` at all.
fn split_selector_spec(spec: &str) -> Option<(&str, &str)> {
    let spec = spec.trim();
    let parts: Vec<&str> = if spec.contains('=') {
        spec.split('=').collect()
    } else {
        spec.split(':').collect()
    };

    match parts.as_slice() {
        [key, value] => Some((key.trim(), value.trim())),
        _ => None,
    }
}
