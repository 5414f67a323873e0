//! Admission Handlers
//!
//! Turns AdmissionReviews into placement decisions and back. The PV is
//! decoded here, so the placement engine only ever sees typed objects.

use super::policy::WebhookPolicy;
use crate::error::{Error, Result};
use crate::metrics::{AdmissionMetrics, AdmissionOutcome};
use crate::placement::{
    to_json_patch, MutationDecision, PlacementMutator, PlacementValidator, ValidationDecision,
};
use axum::http::StatusCode;
use k8s_openapi::api::core::v1::PersistentVolume;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::core::DynamicObject;
use tracing::{debug, error, info, warn};

/// Review as received from and returned to the API server
pub type Review = AdmissionReview<DynamicObject>;

/// Shared state for the admission endpoints
pub struct WebhookState {
    pub modifier: WebhookPolicy,
    pub validator_policy: WebhookPolicy,
    pub mutator: PlacementMutator,
    pub validator: PlacementValidator,
    pub metrics: AdmissionMetrics,
}

impl WebhookState {
    pub fn new(
        mutator: PlacementMutator,
        validator: PlacementValidator,
        metrics: AdmissionMetrics,
    ) -> Self {
        Self {
            modifier: WebhookPolicy::placement_modifier(),
            validator_policy: WebhookPolicy::placement_validator(),
            mutator,
            validator,
            metrics,
        }
    }
}

/// Decode the PersistentVolume carried by an admission request
pub fn decode_persistent_volume(request: &AdmissionRequest<DynamicObject>) -> Result<PersistentVolume> {
    let object = request
        .object
        .as_ref()
        .ok_or_else(|| Error::DecodeFailure("request carries no object".to_string()))?;

    let value = serde_json::to_value(object).map_err(|e| Error::DecodeFailure(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| Error::DecodeFailure(e.to_string()))
}

/// Create a denial response with the reason code embedded in the message
fn deny(request: &AdmissionRequest<DynamicObject>, err: &Error) -> Review {
    AdmissionResponse::from(request)
        .deny(format!("[{}] {}", err.reason(), err))
        .into_review()
}

/// Policy verdicts count as rejections, everything else as a failed review
fn denial_outcome(err: &Error) -> AdmissionOutcome {
    if err.is_rejection() {
        AdmissionOutcome::Rejected
    } else {
        AdmissionOutcome::Failed
    }
}

fn allow(request: &AdmissionRequest<DynamicObject>) -> Review {
    AdmissionResponse::from(request).into_review()
}

/// Extract the request, answering malformed reviews directly
fn admission_request(
    review: Review,
    policy: &WebhookPolicy,
    metrics: &AdmissionMetrics,
) -> std::result::Result<AdmissionRequest<DynamicObject>, (StatusCode, Review)> {
    review.try_into().map_err(|e| {
        error!(policy = policy.name, error = %e, "Failed to extract admission request");
        metrics.record(policy.name, AdmissionOutcome::Failed);
        (
            StatusCode::BAD_REQUEST,
            AdmissionResponse::invalid(format!("Invalid AdmissionReview: {}", e)).into_review(),
        )
    })
}

/// Whether the policy's rules cover this request
fn in_scope(policy: &WebhookPolicy, request: &AdmissionRequest<DynamicObject>) -> bool {
    policy.matches(
        &request.operation,
        &request.resource.group,
        &request.resource.resource,
    )
}

/// Handle a review for the mutating webhook
pub async fn review_mutation(state: &WebhookState, review: Review) -> (StatusCode, Review) {
    let policy = &state.modifier;
    let request = match admission_request(review, policy, &state.metrics) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let uid = &request.uid;
    debug!(uid = %uid, operation = ?request.operation, name = %request.name, "Processing mutation request");

    if !in_scope(policy, &request) {
        debug!(uid = %uid, "Request outside webhook rules, allowing unchanged");
        state.metrics.record(policy.name, AdmissionOutcome::Allowed);
        return (StatusCode::OK, allow(&request));
    }

    let decision = match decode_persistent_volume(&request) {
        Ok(pv) => state.mutator.mutate(&pv).await,
        Err(e) => Err(e),
    };

    let review = match decision {
        Ok(MutationDecision::Patched(patches)) => {
            let response = to_json_patch(&patches).and_then(|patch| {
                AdmissionResponse::from(&request)
                    .with_patch(patch)
                    .map_err(|e| Error::Internal(format!("Failed to serialize JSON patch: {}", e)))
            });
            match response {
                Ok(response) => {
                    info!(uid = %uid, patches = patches.len(), "Admission request patched");
                    state.metrics.record(policy.name, AdmissionOutcome::Patched);
                    state.metrics.record_patches(policy.name, patches.len());
                    response.into_review()
                }
                Err(e) => {
                    error!(uid = %uid, error = %e, "Admission request failed");
                    state.metrics.record(policy.name, AdmissionOutcome::Failed);
                    deny(&request, &e)
                }
            }
        }
        Ok(MutationDecision::Bypassed) => {
            state.metrics.record(policy.name, AdmissionOutcome::Bypassed);
            allow(&request)
        }
        Ok(MutationDecision::Unchanged) => {
            debug!(uid = %uid, "Admission request allowed unchanged");
            state.metrics.record(policy.name, AdmissionOutcome::Allowed);
            allow(&request)
        }
        Err(e) => {
            warn!(uid = %uid, reason = e.reason(), error = %e, "Admission request denied");
            state.metrics.record(policy.name, denial_outcome(&e));
            deny(&request, &e)
        }
    };

    (StatusCode::OK, review)
}

/// Handle a review for the validating webhook
pub fn review_validation(state: &WebhookState, review: Review) -> (StatusCode, Review) {
    let policy = &state.validator_policy;
    let request = match admission_request(review, policy, &state.metrics) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let uid = &request.uid;
    debug!(uid = %uid, operation = ?request.operation, name = %request.name, "Processing validation request");

    if !in_scope(policy, &request) {
        debug!(uid = %uid, "Request outside webhook rules, allowing");
        state.metrics.record(policy.name, AdmissionOutcome::Allowed);
        return (StatusCode::OK, allow(&request));
    }

    let verdict = decode_persistent_volume(&request).and_then(|pv| state.validator.validate(&pv));

    let review = match verdict {
        Ok(ValidationDecision::Allowed) => {
            info!(uid = %uid, "Admission request allowed");
            state.metrics.record(policy.name, AdmissionOutcome::Allowed);
            allow(&request)
        }
        Ok(ValidationDecision::Bypassed) => {
            state.metrics.record(policy.name, AdmissionOutcome::Bypassed);
            allow(&request)
        }
        Err(e) => {
            warn!(uid = %uid, reason = e.reason(), error = %e, "Admission request denied");
            state.metrics.record(policy.name, denial_outcome(&e));
            deny(&request, &e)
        }
    };

    (StatusCode::OK, review)
}
