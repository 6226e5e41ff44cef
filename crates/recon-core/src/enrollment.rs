//! # Enrollment Types
//!
//! A durable grant linking a user to a product. One logical table per
//! product kind sits behind a single store keyed by
//! `(user_id, kind, product_id)`.

use crate::product::ProductRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a granted enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

impl Default for EnrollmentStatus {
    fn default() -> Self {
        EnrollmentStatus::Active
    }
}

/// A user's entitlement to one product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    /// Unique enrollment id (generated)
    pub id: String,

    /// Enrolled user
    pub user_id: String,

    /// The granted product
    pub product: ProductRef,

    /// Lifecycle status, defaults to active on grant
    pub status: EnrollmentStatus,

    /// Payment that funded this grant, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,

    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    /// Create an active enrollment funded by a payment
    pub fn granted(
        user_id: impl Into<String>,
        product: ProductRef,
        payment_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            product,
            status: EnrollmentStatus::Active,
            payment_id,
            enrolled_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ProductKind;

    #[test]
    fn test_granted_enrollment_is_active() {
        let enrollment = Enrollment::granted(
            "user-1",
            ProductRef::new(ProductKind::Webinar, "cardio-live"),
            Some("pay-1".to_string()),
        );
        assert_eq!(enrollment.status, EnrollmentStatus::Active);
        assert_eq!(enrollment.payment_id.as_deref(), Some("pay-1"));
    }
}
