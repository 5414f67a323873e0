//! Error types for the PV placement webhooks
//!
//! Provides structured error types for the placement engine, the admission
//! runtime adapter, and configuration loading. Validation rejections are
//! errors too: the admission layer turns them into denied responses.

use thiserror::Error;

/// Unified error type for the webhooks
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Failed to read namespace {namespace}: {reason}")]
    NamespaceLookup { namespace: String, reason: String },

    // =========================================================================
    // Admission Errors
    // =========================================================================
    #[error("Could not decode PersistentVolume from admission request: {0}")]
    DecodeFailure(String),

    // =========================================================================
    // Placement Errors
    // =========================================================================
    #[error("Invalid zone affinity: operator {operator} with {values} value(s), expected In with exactly one non-empty value")]
    InvalidZoneAffinity { operator: String, values: usize },

    #[error("No preferred storageClassName configured for zone {zone}")]
    UnresolvableZoneMapping { zone: String },

    // =========================================================================
    // Validation Rejections
    // =========================================================================
    #[error("Using default storageClass is not allowed, please select a specific storageClass for the PV")]
    MissingStorageClass,

    #[error("Invalid storageClassName {storage_class}: no zone is configured for it")]
    UnknownStorageClass { storage_class: String },

    #[error("Missing nodeAffinity for zone {zone}")]
    MissingZoneAffinity { zone: String },

    #[error("Invalid nodeAffinity: storageClass requires zone {expected}, PV is pinned to {found}")]
    ZoneMismatch { expected: String, found: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable reason code reported in admission denials
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Internal(_) => "InternalError",
            Error::Configuration(_) => "ConfigurationError",
            Error::Kube(_) => "KubernetesError",
            Error::NamespaceLookup { .. } => "NamespaceLookupFailure",
            Error::DecodeFailure(_) => "DecodeFailure",
            Error::InvalidZoneAffinity { .. } => "InvalidZoneAffinity",
            Error::UnresolvableZoneMapping { .. } => "UnresolvableZoneMapping",
            Error::MissingStorageClass => "MissingStorageClass",
            Error::UnknownStorageClass { .. } => "UnknownStorageClass",
            Error::MissingZoneAffinity { .. } => "MissingZoneAffinity",
            Error::ZoneMismatch { .. } => "ZoneMismatch",
            Error::JsonParse(_) => "JsonParseError",
            Error::Io(_) => "IoError",
        }
    }

    /// Check if this error is one of the validator's verdicts
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::MissingStorageClass
                | Error::UnknownStorageClass { .. }
                | Error::MissingZoneAffinity { .. }
                | Error::ZoneMismatch { .. }
                | Error::InvalidZoneAffinity { .. }
        )
    }

    /// Check if this error aborts the current admission decision.
    ///
    /// Lookup failures and missing zone mappings are logged and the decision
    /// proceeds with best-effort defaults.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::NamespaceLookup { .. } | Error::UnresolvableZoneMapping { .. }
        )
    }
}

/// Result type alias for the webhooks
pub type Result<T> = std::result::Result<T, Error>;
