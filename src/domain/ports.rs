//! Domain Ports - Core trait definitions for the placement webhooks
//!
//! These traits define the boundaries between the placement engine and the
//! cluster it observes. Adapters implement these traits to provide concrete
//! functionality; tests provide in-memory doubles.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Namespace Lookup Port
// =============================================================================

/// Annotations of a Namespace object, keyed by annotation name
pub type NamespaceAnnotations = BTreeMap<String, String>;

/// Port for reading Namespace objects from the cluster
#[async_trait]
pub trait NamespaceLookup: Send + Sync {
    /// Fetch the annotations of the namespace with the given name.
    ///
    /// A namespace without annotations yields an empty map.
    async fn namespace_annotations(&self, name: &str) -> Result<NamespaceAnnotations>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type NamespaceLookupRef = Arc<dyn NamespaceLookup>;

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory lookups shared by the engine and handler tests

    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Lookup backed by a fixed set of namespaces
    #[derive(Default)]
    pub struct StaticNamespaces {
        namespaces: BTreeMap<String, NamespaceAnnotations>,
        calls: AtomicUsize,
    }

    impl StaticNamespaces {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_annotation(mut self, namespace: &str, key: &str, value: &str) -> Self {
            self.namespaces
                .entry(namespace.to_string())
                .or_default()
                .insert(key.to_string(), value.to_string());
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NamespaceLookup for StaticNamespaces {
        async fn namespace_annotations(&self, name: &str) -> Result<NamespaceAnnotations> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.namespaces
                .get(name)
                .cloned()
                .ok_or_else(|| Error::NamespaceLookup {
                    namespace: name.to_string(),
                    reason: "namespace not found".to_string(),
                })
        }
    }

    /// Lookup that always fails, standing in for an unreachable API server
    pub struct UnreachableApi;

    #[async_trait]
    impl NamespaceLookup for UnreachableApi {
        async fn namespace_annotations(&self, name: &str) -> Result<NamespaceAnnotations> {
            Err(Error::NamespaceLookup {
                namespace: name.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }
}
