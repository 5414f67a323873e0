//! Webhook Policies
//!
//! Descriptors of the two placement webhooks: which requests they handle,
//! the settings they read, and how the API server should call them.

use crate::placement::config::{
    DEFAULT_STORAGE_CLASS_NAME, DEFAULT_STORAGE_CLASS_TO_ZONE,
    DEFAULT_ZONE_TO_PREFERRED_STORAGE_CLASS, DEFAULT_STORAGE_CLASS_ENV, MUTATE_IN_SYSTEM_NS_ENV,
    STORAGE_CLASS_TO_ZONE_ENV, VERIFY_IN_SYSTEM_NS_ENV, ZONE_TO_PREFERRED_STORAGE_CLASS_ENV,
};
use k8s_openapi::api::admissionregistration::v1::RuleWithOperations;
use kube::core::admission::Operation;

/// Seconds the API server waits for either webhook
pub const DEFAULT_TIMEOUT_SECONDS: i32 = 10;

/// AdmissionReview versions both webhooks understand
pub const SUPPORTED_ADMISSION_VERSIONS: &[&str] = &["v1"];

// =============================================================================
// Descriptor Types
// =============================================================================

/// Admission webhook type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookKind {
    Mutating,
    Validating,
}

impl std::fmt::Display for WebhookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookKind::Mutating => write!(f, "mutating"),
            WebhookKind::Validating => write!(f, "validating"),
        }
    }
}

/// A setting a webhook reads, with its default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSetting {
    pub name: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

/// Static description of one placement webhook
#[derive(Debug, Clone)]
pub struct WebhookPolicy {
    pub name: &'static str,
    pub kind: WebhookKind,
    /// HTTP path the webhook is served on
    pub path: &'static str,
    pub rules: Vec<RuleWithOperations>,
    pub settings: Vec<WebhookSetting>,
    pub timeout_seconds: i32,
    pub admission_review_versions: Vec<String>,
    pub side_effects: &'static str,
}

/// Create and Update of PersistentVolumes, in any version and scope
fn persistent_volume_rules() -> Vec<RuleWithOperations> {
    vec![RuleWithOperations {
        api_groups: Some(vec![String::new()]),
        api_versions: Some(vec!["*".to_string()]),
        resources: Some(vec!["persistentvolumes".to_string()]),
        operations: Some(vec!["CREATE".to_string(), "UPDATE".to_string()]),
        scope: None,
    }]
}

fn operation_name(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "CREATE",
        Operation::Update => "UPDATE",
        Operation::Delete => "DELETE",
        Operation::Connect => "CONNECT",
    }
}

fn matches_pattern(patterns: &Option<Vec<String>>, value: &str) -> bool {
    patterns
        .as_ref()
        .is_some_and(|patterns| patterns.iter().any(|p| p == "*" || p == value))
}

impl WebhookPolicy {
    /// The mutating webhook assigning storage classes and zone affinity
    pub fn placement_modifier() -> Self {
        Self {
            name: "pv-placement-modifier",
            kind: WebhookKind::Mutating,
            path: "/mutate",
            rules: persistent_volume_rules(),
            settings: vec![
                WebhookSetting {
                    name: MUTATE_IN_SYSTEM_NS_ENV,
                    default: "false",
                    description: "Should we modify PVs that are defined in system namespaces?",
                },
                WebhookSetting {
                    name: STORAGE_CLASS_TO_ZONE_ENV,
                    default: DEFAULT_STORAGE_CLASS_TO_ZONE,
                    description: "Mapping that assigns a storageClassName to a zone, so we can add nodeAffinity for it",
                },
                WebhookSetting {
                    name: ZONE_TO_PREFERRED_STORAGE_CLASS_ENV,
                    default: DEFAULT_ZONE_TO_PREFERRED_STORAGE_CLASS,
                    description: "Mapping that indicates the preferred storageClassName of a zone",
                },
                WebhookSetting {
                    name: DEFAULT_STORAGE_CLASS_ENV,
                    default: DEFAULT_STORAGE_CLASS_NAME,
                    description: "Cluster default storageClassName, replaced by the namespace's preferred one",
                },
            ],
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            admission_review_versions: supported_versions(),
            side_effects: "None",
        }
    }

    /// The validating webhook enforcing the storage-class/zone invariant
    pub fn placement_validator() -> Self {
        Self {
            name: "pv-placement-validator",
            kind: WebhookKind::Validating,
            path: "/validate",
            rules: persistent_volume_rules(),
            settings: vec![
                WebhookSetting {
                    name: VERIFY_IN_SYSTEM_NS_ENV,
                    default: "false",
                    description: "Should we verify PVs that are defined in system namespaces? Falls back to MUTATE_IN_SYSTEM_NS",
                },
                WebhookSetting {
                    name: STORAGE_CLASS_TO_ZONE_ENV,
                    default: DEFAULT_STORAGE_CLASS_TO_ZONE,
                    description: "Mapping that assigns a storageClassName to a zone, so we can verify nodeAffinity for it",
                },
            ],
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            admission_review_versions: supported_versions(),
            side_effects: "None",
        }
    }

    /// Whether a request for `group`/`resource` with `operation` is covered by the rules
    pub fn matches(&self, operation: &Operation, group: &str, resource: &str) -> bool {
        let operation = operation_name(operation);
        self.rules.iter().any(|rule| {
            matches_pattern(&rule.operations, operation)
                && matches_pattern(&rule.api_groups, group)
                && matches_pattern(&rule.resources, resource)
        })
    }
}

fn supported_versions() -> Vec<String> {
    SUPPORTED_ADMISSION_VERSIONS
        .iter()
        .map(|v| v.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors() {
        let modifier = WebhookPolicy::placement_modifier();
        assert_eq!(modifier.name, "pv-placement-modifier");
        assert_eq!(modifier.kind, WebhookKind::Mutating);
        assert_eq!(modifier.settings.len(), 4);
        assert_eq!(modifier.side_effects, "None");
        assert_eq!(modifier.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);

        let validator = WebhookPolicy::placement_validator();
        assert_eq!(validator.kind, WebhookKind::Validating);
        assert_ne!(modifier.path, validator.path);
        assert_eq!(validator.admission_review_versions, vec!["v1".to_string()]);
    }

    #[test]
    fn test_rule_matching() {
        let policy = WebhookPolicy::placement_modifier();
        assert!(policy.matches(&Operation::Create, "", "persistentvolumes"));
        assert!(policy.matches(&Operation::Update, "", "persistentvolumes"));
        assert!(!policy.matches(&Operation::Delete, "", "persistentvolumes"));
        assert!(!policy.matches(&Operation::Connect, "", "persistentvolumes"));
        assert!(!policy.matches(&Operation::Create, "", "persistentvolumeclaims"));
        assert!(!policy.matches(&Operation::Create, "storage.k8s.io", "persistentvolumes"));
    }
}
