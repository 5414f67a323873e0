//! Patch Operations
//!
//! Typed description of the changes the mutator wants on a PersistentVolume.
//! Operations are emitted, never applied by the engine; the admission layer
//! renders them as an RFC 6902 JSON Patch.

use crate::error::Result;
use k8s_openapi::api::core::v1::{NodeSelector, NodeSelectorTerm, VolumeNodeAffinity};
use serde::Serialize;
use serde_json::{json, Value};

// =============================================================================
// Operation Kind
// =============================================================================

/// JSON Patch operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
}

impl std::fmt::Display for PatchOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchOp::Add => write!(f, "add"),
            PatchOp::Replace => write!(f, "replace"),
        }
    }
}

// =============================================================================
// Patch Value
// =============================================================================

/// Value written by a patch; the variant fixes the target path
#[derive(Debug, Clone, PartialEq)]
pub enum PatchValue {
    /// `/spec/storageClassName`
    StorageClassName(String),
    /// `/spec/nodeAffinity`
    NodeAffinity(VolumeNodeAffinity),
    /// `/spec/nodeAffinity/required`
    RequiredSelector(NodeSelector),
    /// `/spec/nodeAffinity/required/nodeSelectorTerms`
    SelectorTerms(Vec<NodeSelectorTerm>),
}

impl PatchValue {
    /// JSON pointer of the field this value is written to
    pub fn path(&self) -> &'static str {
        match self {
            PatchValue::StorageClassName(_) => "/spec/storageClassName",
            PatchValue::NodeAffinity(_) => "/spec/nodeAffinity",
            PatchValue::RequiredSelector(_) => "/spec/nodeAffinity/required",
            PatchValue::SelectorTerms(_) => "/spec/nodeAffinity/required/nodeSelectorTerms",
        }
    }

    fn to_json(&self) -> Result<Value> {
        let value = match self {
            PatchValue::StorageClassName(name) => Value::String(name.clone()),
            PatchValue::NodeAffinity(affinity) => serde_json::to_value(affinity)?,
            PatchValue::RequiredSelector(selector) => serde_json::to_value(selector)?,
            PatchValue::SelectorTerms(terms) => serde_json::to_value(terms)?,
        };
        Ok(value)
    }
}

// =============================================================================
// Patch Operation
// =============================================================================

/// A single add/replace operation on the admitted PersistentVolume
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub value: PatchValue,
}

impl PatchOperation {
    pub fn add(value: PatchValue) -> Self {
        Self {
            op: PatchOp::Add,
            value,
        }
    }

    pub fn replace(value: PatchValue) -> Self {
        Self {
            op: PatchOp::Replace,
            value,
        }
    }

    pub fn path(&self) -> &'static str {
        self.value.path()
    }

    /// Render as one RFC 6902 operation object
    pub fn to_json(&self) -> Result<Value> {
        Ok(json!({
            "op": self.op,
            "path": self.path(),
            "value": self.value.to_json()?,
        }))
    }
}

/// Render a sequence of operations as a JSON Patch document
pub fn to_json_patch(operations: &[PatchOperation]) -> Result<json_patch::Patch> {
    let document = operations
        .iter()
        .map(PatchOperation::to_json)
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::from_value(Value::Array(document))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::affinity::zone_selector_term;

    #[test]
    fn test_paths() {
        assert_eq!(
            PatchValue::StorageClassName("x".into()).path(),
            "/spec/storageClassName"
        );
        assert_eq!(
            PatchValue::SelectorTerms(vec![]).path(),
            "/spec/nodeAffinity/required/nodeSelectorTerms"
        );
    }

    #[test]
    fn test_storage_class_json() {
        let op = PatchOperation::add(PatchValue::StorageClassName(
            "afranet-standard-block-storage".into(),
        ));
        assert_eq!(
            op.to_json().unwrap(),
            json!({
                "op": "add",
                "path": "/spec/storageClassName",
                "value": "afranet-standard-block-storage",
            })
        );
    }

    #[test]
    fn test_node_affinity_json() {
        let op = PatchOperation::add(PatchValue::NodeAffinity(VolumeNodeAffinity {
            required: Some(NodeSelector {
                node_selector_terms: vec![zone_selector_term("afranet")],
            }),
        }));
        assert_eq!(
            op.to_json().unwrap(),
            json!({
                "op": "add",
                "path": "/spec/nodeAffinity",
                "value": {
                    "required": {
                        "nodeSelectorTerms": [{
                            "matchExpressions": [{
                                "key": "topology.kubernetes.io/zone",
                                "operator": "In",
                                "values": ["afranet"],
                            }],
                        }],
                    },
                },
            })
        );
    }

    #[test]
    fn test_json_patch_document_applies() {
        let ops = vec![
            PatchOperation::replace(PatchValue::StorageClassName("b".into())),
            PatchOperation::add(PatchValue::SelectorTerms(vec![zone_selector_term("irancell")])),
        ];
        let patch = to_json_patch(&ops).unwrap();
        assert_eq!(patch.0.len(), 2);

        let mut doc = json!({
            "spec": {
                "storageClassName": "a",
                "nodeAffinity": { "required": { "nodeSelectorTerms": [] } },
            }
        });
        json_patch::patch(&mut doc, &patch.0).unwrap();
        assert_eq!(doc["spec"]["storageClassName"], "b");
        assert_eq!(
            doc["spec"]["nodeAffinity"]["required"]["nodeSelectorTerms"][0]["matchExpressions"][0]["values"][0],
            "irancell"
        );
    }
}
