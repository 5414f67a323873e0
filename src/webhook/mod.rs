//! Webhook Module
//!
//! Exposes the placement engine as a mutating and a validating admission
//! webhook for PersistentVolumes.

pub mod handler;
pub mod lookup;
pub mod policy;
pub mod server;

pub use handler::*;
pub use lookup::*;
pub use policy::*;
pub use server::*;

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
