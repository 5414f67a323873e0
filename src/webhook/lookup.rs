//! Kubernetes Namespace Lookup
//!
//! Reads Namespace objects through the cluster API for the mutator.

use crate::domain::ports::{NamespaceAnnotations, NamespaceLookup};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client};
use tracing::debug;

/// [`NamespaceLookup`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeNamespaceLookup {
    client: Client,
}

impl KubeNamespaceLookup {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NamespaceLookup for KubeNamespaceLookup {
    async fn namespace_annotations(&self, name: &str) -> Result<NamespaceAnnotations> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let namespace = namespaces
            .get(name)
            .await
            .map_err(|e| Error::NamespaceLookup {
                namespace: name.to_string(),
                reason: e.to_string(),
            })?;

        let annotations = namespace.metadata.annotations.unwrap_or_default();
        debug!(namespace = %name, annotations = annotations.len(), "Fetched namespace");
        Ok(annotations)
    }
}
