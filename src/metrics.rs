//! Admission Metrics
//!
//! Prometheus counters for admission outcomes, kept in a registry owned by
//! the webhook server and rendered at `/metrics`.

use crate::error::{Error, Result};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Outcome of one admission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Skipped because the PV is in a system namespace
    Bypassed,
    /// Allowed without changes
    Allowed,
    /// Allowed with a JSON patch
    Patched,
    /// Denied by policy
    Rejected,
    /// The review could not be processed
    Failed,
}

impl AdmissionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionOutcome::Bypassed => "bypassed",
            AdmissionOutcome::Allowed => "allowed",
            AdmissionOutcome::Patched => "patched",
            AdmissionOutcome::Rejected => "rejected",
            AdmissionOutcome::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AdmissionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters for both placement webhooks
pub struct AdmissionMetrics {
    registry: Registry,
    admissions: IntCounterVec,
    patch_operations: IntCounterVec,
}

impl AdmissionMetrics {
    /// Create the counters in a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let admissions = IntCounterVec::new(
            Opts::new(
                "pv_placement_admissions_total",
                "Admission requests handled, by policy and outcome",
            ),
            &["policy", "outcome"],
        )
        .map_err(metrics_error)?;

        let patch_operations = IntCounterVec::new(
            Opts::new(
                "pv_placement_patch_operations_total",
                "JSON patch operations emitted, by policy",
            ),
            &["policy"],
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(admissions.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(patch_operations.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            admissions,
            patch_operations,
        })
    }

    pub fn record(&self, policy: &str, outcome: AdmissionOutcome) {
        self.admissions
            .with_label_values(&[policy, outcome.as_str()])
            .inc();
    }

    pub fn record_patches(&self, policy: &str, count: usize) {
        self.patch_operations
            .with_label_values(&[policy])
            .inc_by(count as u64);
    }

    /// Count of admissions recorded for a policy and outcome
    pub fn admissions(&self, policy: &str, outcome: AdmissionOutcome) -> u64 {
        self.admissions
            .with_label_values(&[policy, outcome.as_str()])
            .get()
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<(String, String)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        let body = String::from_utf8(buffer)
            .map_err(|e| Error::Internal(format!("Metrics are not UTF-8: {}", e)))?;
        Ok((encoder.format_type().to_string(), body))
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("Metrics error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_render() {
        let metrics = AdmissionMetrics::new().unwrap();
        metrics.record("pv-placement-modifier", AdmissionOutcome::Patched);
        metrics.record("pv-placement-modifier", AdmissionOutcome::Patched);
        metrics.record("pv-placement-validator", AdmissionOutcome::Rejected);
        metrics.record_patches("pv-placement-modifier", 2);

        assert_eq!(
            metrics.admissions("pv-placement-modifier", AdmissionOutcome::Patched),
            2
        );
        assert_eq!(
            metrics.admissions("pv-placement-validator", AdmissionOutcome::Allowed),
            0
        );

        let (content_type, body) = metrics.render().unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains("pv_placement_admissions_total"));
        assert!(body.contains("pv_placement_patch_operations_total{policy=\"pv-placement-modifier\"} 2"));
    }
}
