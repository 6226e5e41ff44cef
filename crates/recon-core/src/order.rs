//! # Order and Payment Types
//!
//! The ledger records: an `Order` is purchase intent for exactly one
//! product, a `Payment` is one attempt to satisfy it. An order may
//! accumulate several payment attempts; whichever resolves first wins.
//!
//! State transitions are expressed as a pure `(status, event) -> status`
//! function so the race rules are testable without any store attached.

use crate::money::Price;
use crate::product::ProductRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status shared by orders and payments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnStatus {
    /// Awaiting confirmation from a gateway or an admin
    Pending,
    /// Confirmed; entitlement has been (or is being) granted
    Successful,
    /// Rejected by the gateway or an admin
    Failed,
    /// Reserved for the refund extension; no event reaches it yet
    Refunded,
}

impl TxnStatus {
    /// Terminal statuses accept no further transitions. This is the
    /// idempotency gate both verification paths rely on.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxnStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxnStatus::Pending => "pending",
            TxnStatus::Successful => "successful",
            TxnStatus::Failed => "failed",
            TxnStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events that can resolve a pending payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementEvent {
    /// Gateway webhook reported success
    GatewaySuccess,
    /// Gateway webhook reported failure
    GatewayFailure,
    /// Admin approved a manual settlement
    AdminApprove,
    /// Admin rejected a manual settlement
    AdminReject,
}

impl SettlementEvent {
    /// The terminal status this event drives a pending record to
    pub fn outcome(&self) -> TxnStatus {
        match self {
            SettlementEvent::GatewaySuccess | SettlementEvent::AdminApprove => {
                TxnStatus::Successful
            }
            SettlementEvent::GatewayFailure | SettlementEvent::AdminReject => TxnStatus::Failed,
        }
    }
}

/// Pure transition function for the payment state machine.
///
/// Returns `None` when the current status is terminal: a repeated or
/// racing event has no further effect, by design. Refund transitions
/// are deliberately absent; see the crate docs.
pub fn next_status(current: TxnStatus, event: SettlementEvent) -> Option<TxnStatus> {
    if current.is_terminal() {
        return None;
    }
    Some(event.outcome())
}

/// Record of purchase intent for exactly one product.
///
/// Created once per (user, product) while pending; mutated only by the
/// verification paths; never deleted, it is the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order id (generated)
    pub id: String,

    /// Purchasing user
    pub user_id: String,

    /// Exactly one product reference
    pub product: ProductRef,

    /// Amount owed, from the catalog
    pub amount: Price,

    /// Current status
    pub status: TxnStatus,

    /// Gateway the latest attempt went through
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_name: Option<String>,

    /// Merchant transaction id of the latest attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    /// Customer contact fields (for confirmation email)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a new pending order
    pub fn new(user_id: impl Into<String>, product: ProductRef, amount: Price) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            product,
            amount,
            status: TxnStatus::Pending,
            gateway_name: None,
            transaction_id: None,
            customer_email: None,
            customer_name: None,
            customer_phone: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set customer contact fields
    pub fn with_contact(
        mut self,
        email: Option<String>,
        name: Option<String>,
        phone: Option<String>,
    ) -> Self {
        self.customer_email = email;
        self.customer_name = name;
        self.customer_phone = phone;
        self
    }
}

/// One attempt to satisfy an order.
///
/// Retries create new `Payment` rows rather than mutating a prior one:
/// each attempt is independently verifiable and each can resolve the
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique payment id (generated)
    pub id: String,

    /// The order this attempt targets
    pub order_id: String,

    /// Purchasing user (denormalized from the order)
    pub user_id: String,

    /// Product reference (denormalized from the order)
    pub product: ProductRef,

    /// Amount of this attempt
    pub amount: Price,

    /// Gateway handling this attempt
    pub gateway_name: String,

    /// Merchant transaction id, globally unique across attempts
    pub transaction_id: String,

    /// Gateway-side transaction id, filled on verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_transaction_id: Option<String>,

    /// Current status
    pub status: TxnStatus,

    /// Admin who manually verified, when the manual path resolved it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Create a fresh pending attempt against an order
    pub fn new_attempt(
        order: &Order,
        gateway_name: impl Into<String>,
        transaction_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            user_id: order.user_id.clone(),
            product: order.product.clone(),
            amount: order.amount,
            gateway_name: gateway_name.into(),
            transaction_id: transaction_id.into(),
            gateway_transaction_id: None,
            status: TxnStatus::Pending,
            verified_by: None,
            verified_at: None,
            admin_notes: None,
            created_at: Utc::now(),
        }
    }
}

/// Mint a globally unique merchant transaction id
pub fn new_transaction_id() -> String {
    format!("TXN-{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use crate::product::ProductKind;

    fn order() -> Order {
        Order::new(
            "user-1",
            ProductRef::new(ProductKind::Course, "anatomy-101"),
            Price::new(499.0, Currency::INR),
        )
    }

    #[test]
    fn test_pending_accepts_every_event() {
        assert_eq!(
            next_status(TxnStatus::Pending, SettlementEvent::GatewaySuccess),
            Some(TxnStatus::Successful)
        );
        assert_eq!(
            next_status(TxnStatus::Pending, SettlementEvent::GatewayFailure),
            Some(TxnStatus::Failed)
        );
        assert_eq!(
            next_status(TxnStatus::Pending, SettlementEvent::AdminApprove),
            Some(TxnStatus::Successful)
        );
        assert_eq!(
            next_status(TxnStatus::Pending, SettlementEvent::AdminReject),
            Some(TxnStatus::Failed)
        );
    }

    #[test]
    fn test_terminal_states_absorb_every_event() {
        for terminal in [
            TxnStatus::Successful,
            TxnStatus::Failed,
            TxnStatus::Refunded,
        ] {
            for event in [
                SettlementEvent::GatewaySuccess,
                SettlementEvent::GatewayFailure,
                SettlementEvent::AdminApprove,
                SettlementEvent::AdminReject,
            ] {
                assert_eq!(next_status(terminal, event), None);
            }
        }
    }

    #[test]
    fn test_new_order_is_pending() {
        let order = order();
        assert_eq!(order.status, TxnStatus::Pending);
        assert!(order.transaction_id.is_none());
    }

    #[test]
    fn test_attempt_denormalizes_order_fields() {
        let order = order();
        let payment = Payment::new_attempt(&order, "upi", new_transaction_id());
        assert_eq!(payment.order_id, order.id);
        assert_eq!(payment.user_id, order.user_id);
        assert_eq!(payment.product, order.product);
        assert_eq!(payment.status, TxnStatus::Pending);
        assert!(payment.transaction_id.starts_with("TXN-"));
    }

    #[test]
    fn test_transaction_ids_are_unique() {
        let a = new_transaction_id();
        let b = new_transaction_id();
        assert_ne!(a, b);
    }
}
