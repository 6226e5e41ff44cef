//! # Reconciliation Error Types
//!
//! Typed error handling for the coursepay reconciliation engine.
//! All ledger operations return `Result<T, ReconError>`.

use thiserror::Error;

/// Core error type for all reconciliation operations
#[derive(Debug, Error)]
pub enum ReconError {
    /// Malformed or missing request fields
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Order, payment, gateway or product absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Re-verifying a non-pending payment, or a racing transition lost
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Submitted price disagrees with the catalog price
    #[error("Price mismatch: submitted {submitted:.2}, expected {expected:.2}")]
    PriceMismatch { submitted: f64, expected: f64 },

    /// Caller is not authenticated
    #[error("Unauthorized")]
    Unauthorized,

    /// Caller is authenticated but not allowed
    #[error("Forbidden")]
    Forbidden,

    /// Webhook signature check failed. Logged, never detailed to the
    /// caller; the webhook response must not leak which check failed.
    #[error("Webhook signature rejected")]
    SignatureInvalid,

    /// Gateway configuration errors (inactive, missing merchant fields)
    #[error("Gateway configuration error: {0}")]
    Configuration(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReconError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ReconError::Validation(_) => 400,
            ReconError::NotFound(_) => 404,
            ReconError::Conflict(_) => 409,
            ReconError::PriceMismatch { .. } => 400,
            ReconError::Unauthorized => 401,
            ReconError::Forbidden => 403,
            ReconError::SignatureInvalid => 401,
            ReconError::Configuration(_) => 500,
            ReconError::WebhookParse(_) => 400,
            ReconError::Internal(_) => 500,
        }
    }

    /// Errors the webhook path must swallow: they are logged internally
    /// and the gateway still receives a success acknowledgement.
    pub fn is_webhook_silent(&self) -> bool {
        matches!(
            self,
            ReconError::SignatureInvalid
                | ReconError::WebhookParse(_)
                | ReconError::NotFound(_)
                | ReconError::Configuration(_)
        )
    }
}

/// Result type alias for reconciliation operations
pub type ReconResult<T> = Result<T, ReconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ReconError::Validation("bad".into()).status_code(), 400);
        assert_eq!(ReconError::NotFound("order".into()).status_code(), 404);
        assert_eq!(ReconError::Conflict("already".into()).status_code(), 409);
        assert_eq!(
            ReconError::PriceMismatch {
                submitted: 498.0,
                expected: 499.0
            }
            .status_code(),
            400
        );
        assert_eq!(ReconError::SignatureInvalid.status_code(), 401);
        assert_eq!(ReconError::Configuration("no vpa".into()).status_code(), 500);
    }

    #[test]
    fn test_webhook_silent_errors() {
        assert!(ReconError::SignatureInvalid.is_webhook_silent());
        assert!(ReconError::NotFound("txn".into()).is_webhook_silent());
        assert!(!ReconError::Conflict("already".into()).is_webhook_silent());
        assert!(!ReconError::Internal("boom".into()).is_webhook_silent());
    }

    #[test]
    fn test_price_mismatch_message() {
        let err = ReconError::PriceMismatch {
            submitted: 450.0,
            expected: 499.0,
        };
        assert_eq!(
            err.to_string(),
            "Price mismatch: submitted 450.00, expected 499.00"
        );
    }
}
