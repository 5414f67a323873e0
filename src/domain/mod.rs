//! Domain layer
//!
//! Ports the placement engine calls out through. Adapters for the cluster API
//! live in `webhook`, in-memory ones next to the traits for tests.

pub mod ports;

pub use ports::*;
