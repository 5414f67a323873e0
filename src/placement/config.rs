//! Placement Configuration
//!
//! Immutable mappings and flags loaded once at startup and shared read-only
//! by the mutator and the validator.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// Configuration Keys and Defaults
// =============================================================================

pub const STORAGE_CLASS_TO_ZONE_ENV: &str = "STORAGECLASSNAME_TO_ZONE_MAP";
pub const ZONE_TO_PREFERRED_STORAGE_CLASS_ENV: &str = "ZONE_TO_PREFERRED_STORAGECLASSNAME_MAP";
pub const MUTATE_IN_SYSTEM_NS_ENV: &str = "MUTATE_IN_SYSTEM_NS";
pub const VERIFY_IN_SYSTEM_NS_ENV: &str = "VERIFY_IN_SYSTEM_NS";
pub const DEFAULT_STORAGE_CLASS_ENV: &str = "DEFAULT_STORAGECLASSNAME";
pub const SYSTEM_NAMESPACES_ENV: &str = "SYSTEM_NAMESPACES";

pub const DEFAULT_STORAGE_CLASS_TO_ZONE: &str = r#"{
    "irancell-standard-block-storage": "irancell",
    "irancell-standard-sharedfs-storage": "irancell",
    "afranet-standard-block-storage": "afranet",
    "afranet-standard-sharedfs-storage": "afranet"
}"#;

pub const DEFAULT_ZONE_TO_PREFERRED_STORAGE_CLASS: &str = r#"{
    "irancell": "irancell-standard-block-storage",
    "afranet": "afranet-standard-block-storage"
}"#;

pub const DEFAULT_STORAGE_CLASS_NAME: &str = "irancell-standard-block-storage";

pub const DEFAULT_SYSTEM_NAMESPACES: &str = "kube-system,kube-public,kube-node-lease";

/// Values accepted as `true` for boolean settings (case-insensitive)
const TRUE_STRINGS: &[&str] = &["true", "yes", "1", "ok"];

/// Parse a boolean setting the way the deployment manifests spell them
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    TRUE_STRINGS.contains(&value.as_str())
}

// =============================================================================
// Mappings
// =============================================================================

/// Storage class name to the zone its volumes must live in
pub type StorageClassZoneMap = BTreeMap<String, String>;

/// Zone to the storage class preferred for volumes in that zone
pub type ZonePreferredStorageClassMap = BTreeMap<String, String>;

/// Parse a JSON object of non-empty string keys and values
pub fn parse_mapping(name: &str, definition: &str) -> Result<BTreeMap<String, String>> {
    let mapping: BTreeMap<String, String> = serde_json::from_str(definition)
        .map_err(|e| Error::Configuration(format!("Invalid {}: {}", name, e)))?;

    if let Some((key, value)) = mapping
        .iter()
        .find(|(key, value)| key.is_empty() || value.is_empty())
    {
        return Err(Error::Configuration(format!(
            "Invalid {}: empty entry {:?} -> {:?}",
            name, key, value
        )));
    }

    Ok(mapping)
}

// =============================================================================
// Placement Configuration
// =============================================================================

/// Configuration shared by both placement webhooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementConfig {
    /// Mutate PVs that belong to system namespaces
    pub mutate_in_system_namespaces: bool,
    /// Validate PVs that belong to system namespaces
    pub verify_in_system_namespaces: bool,
    /// Cluster default storage class; PVs using it are re-resolved per namespace
    pub default_storage_class_name: String,
    /// Zone obligation of each storage class
    pub storage_class_to_zone: StorageClassZoneMap,
    /// Preferred storage class of each zone
    pub zone_to_preferred_storage_class: ZonePreferredStorageClassMap,
    /// Namespaces treated as system-managed
    pub system_namespaces: BTreeSet<String>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        // The defaults are compile-time literals validated by the tests below
        Self {
            mutate_in_system_namespaces: false,
            verify_in_system_namespaces: false,
            default_storage_class_name: DEFAULT_STORAGE_CLASS_NAME.to_string(),
            storage_class_to_zone: parse_mapping(
                STORAGE_CLASS_TO_ZONE_ENV,
                DEFAULT_STORAGE_CLASS_TO_ZONE,
            )
            .unwrap_or_default(),
            zone_to_preferred_storage_class: parse_mapping(
                ZONE_TO_PREFERRED_STORAGE_CLASS_ENV,
                DEFAULT_ZONE_TO_PREFERRED_STORAGE_CLASS,
            )
            .unwrap_or_default(),
            system_namespaces: parse_namespace_list(DEFAULT_SYSTEM_NAMESPACES),
        }
    }
}

/// Raw settings as read from flags and the environment
#[derive(Debug, Clone)]
pub struct PlacementSettings {
    pub mutate_in_system_namespaces: String,
    /// Falls back to `mutate_in_system_namespaces` when unset
    pub verify_in_system_namespaces: Option<String>,
    pub default_storage_class_name: String,
    pub storage_class_to_zone: String,
    pub zone_to_preferred_storage_class: String,
    pub system_namespaces: String,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            mutate_in_system_namespaces: "no".to_string(),
            verify_in_system_namespaces: None,
            default_storage_class_name: DEFAULT_STORAGE_CLASS_NAME.to_string(),
            storage_class_to_zone: DEFAULT_STORAGE_CLASS_TO_ZONE.to_string(),
            zone_to_preferred_storage_class: DEFAULT_ZONE_TO_PREFERRED_STORAGE_CLASS.to_string(),
            system_namespaces: DEFAULT_SYSTEM_NAMESPACES.to_string(),
        }
    }
}

impl PlacementConfig {
    /// Build the configuration from raw settings
    pub fn from_settings(settings: &PlacementSettings) -> Result<Self> {
        let mutate = parse_flag(&settings.mutate_in_system_namespaces);
        let verify = settings
            .verify_in_system_namespaces
            .as_deref()
            .map_or(mutate, parse_flag);

        Ok(Self {
            mutate_in_system_namespaces: mutate,
            verify_in_system_namespaces: verify,
            default_storage_class_name: settings.default_storage_class_name.trim().to_string(),
            storage_class_to_zone: parse_mapping(
                STORAGE_CLASS_TO_ZONE_ENV,
                &settings.storage_class_to_zone,
            )?,
            zone_to_preferred_storage_class: parse_mapping(
                ZONE_TO_PREFERRED_STORAGE_CLASS_ENV,
                &settings.zone_to_preferred_storage_class,
            )?,
            system_namespaces: parse_namespace_list(&settings.system_namespaces),
        })
    }

    /// Zone a storage class is bound to, if it carries a zone obligation
    pub fn zone_for_storage_class(&self, storage_class: &str) -> Option<&str> {
        self.storage_class_to_zone
            .get(storage_class)
            .map(String::as_str)
    }

    /// Preferred storage class for volumes in a zone
    pub fn preferred_storage_class(&self, zone: &str) -> Option<&str> {
        self.zone_to_preferred_storage_class
            .get(zone)
            .map(String::as_str)
    }

    /// Whether a storage class name should be re-resolved from the namespace
    pub fn needs_resolution(&self, storage_class: &str) -> bool {
        storage_class.is_empty() || storage_class == self.default_storage_class_name
    }

    pub fn is_system_namespace(&self, namespace: &str) -> bool {
        self.system_namespaces.contains(namespace)
    }
}

fn parse_namespace_list(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
        .collect()
}
