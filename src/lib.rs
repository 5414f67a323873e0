//! PV Placement Webhook - Zone-aware PersistentVolume admission
//!
//! A pair of Kubernetes admission webhooks keeping PersistentVolumes inside
//! the zone their storage class belongs to.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                        Admission Webhook Server                             │
//! │        POST /mutate (pv-placement-modifier)   POST /validate (...-validator) │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────┐      ┌─────────────────────────────────┐   │
//! │  │     Placement Mutator       │      │      Placement Validator        │   │
//! │  │  storage class + affinity   │      │  storage class ⇒ zone invariant │   │
//! │  └──────┬───────────────┬──────┘      └────────────────┬────────────────┘   │
//! │         │               │                              │                    │
//! │  ┌──────┴──────┐  ┌─────┴─────────────────────────────┴──┐                 │
//! │  │    Zone     │  │          Affinity Inspector          │                 │
//! │  │  Resolver   │  └──────────────────────────────────────┘                 │
//! │  └──────┬──────┘                                                            │
//! │         │ NamespaceLookup (Kubernetes API)                                  │
//! ├─────────┴───────────────────────────────────────────────────────────────────┤
//! │                 Placement Config (immutable, loaded at startup)             │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`placement`]: The placement engine (resolver, inspector, mutator, validator, config)
//! - [`webhook`]: Admission handlers, policy descriptors and the HTTP server
//! - [`domain`]: Port traits towards the cluster
//! - [`metrics`]: Admission outcome counters
//! - [`error`]: Error types and handling

pub mod domain;
pub mod error;
pub mod metrics;
pub mod placement;
pub mod webhook;

// Re-export commonly used types
pub use domain::ports::{NamespaceAnnotations, NamespaceLookup, NamespaceLookupRef};

pub use error::{Error, Result};

pub use metrics::{AdmissionMetrics, AdmissionOutcome};

pub use placement::{
    find_zone_affinity, resolve_namespace_zone, MutationDecision, PatchOperation, PatchValue,
    PlacementConfig, PlacementMutator, PlacementSettings, PlacementValidator, ValidationDecision,
    ZoneAffinity, ZONE_KEY,
};

pub use webhook::{
    KubeNamespaceLookup, ServerConfig, WebhookKind, WebhookPolicy, WebhookState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
