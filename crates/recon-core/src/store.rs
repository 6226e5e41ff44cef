//! # In-Memory Stores
//!
//! Orders, payments, enrollments and gateway settings, each behind a
//! single mutex. Every cross-record invariant (at most one successful
//! settlement per order, at most one enrollment per (user, product),
//! at most one default gateway) is enforced inside one lock
//! acquisition, never by check-then-act across calls. The webhook path
//! and the admin path race concurrently against the same rows; the
//! loser of a settlement race observes [`SettleOutcome::AlreadySettled`]
//! and must treat it as "already processed", not as an error.

use crate::enrollment::Enrollment;
use crate::error::{ReconError, ReconResult};
use crate::gateway::{GatewaySetting, GatewaySettingView, NewGatewaySetting};
use crate::order::{next_status, Order, Payment, SettlementEvent, TxnStatus};
use crate::product::{ProductKind, ProductRef};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

/// Outcome of the atomic pending→terminal gate
#[derive(Debug, Clone)]
pub enum SettleOutcome {
    /// This caller won the race; settled copies of both rows
    Won { order: Order, payment: Payment },
    /// Someone else resolved the payment (or a sibling attempt resolved
    /// the order) first. Carries the status that won.
    AlreadySettled(TxnStatus),
}

impl SettleOutcome {
    pub fn won(&self) -> bool {
        matches!(self, SettleOutcome::Won { .. })
    }
}

/// Audit fields recorded alongside a settlement
#[derive(Debug, Clone, Default)]
pub struct SettlementAudit {
    /// Admin id, for the manual path
    pub verified_by: Option<String>,
    pub admin_notes: Option<String>,
    /// Gateway-side transaction id, when reported
    pub gateway_transaction_id: Option<String>,
}

/// Which payments an admin listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentFilter {
    Pending,
    All,
}

#[derive(Default)]
struct LedgerInner {
    orders: HashMap<String, Order>,
    payments: HashMap<String, Payment>,
}

/// The order + payment ledger.
///
/// Orders are never deleted; they are the audit trail.
#[derive(Default)]
pub struct LedgerStore {
    inner: Mutex<LedgerInner>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an order, or return the existing pending one for the same
    /// (user, product) unchanged; `create_order` is idempotent while
    /// the order is unresolved.
    ///
    /// Returns the order and whether it was freshly created.
    pub fn create_order(&self, order: Order) -> (Order, bool) {
        let mut inner = self.inner.lock().expect("ledger lock poisoned");
        if let Some(existing) = inner
            .orders
            .values()
            .find(|o| {
                o.user_id == order.user_id
                    && o.product == order.product
                    && o.status == TxnStatus::Pending
            })
            .cloned()
        {
            return (existing, false);
        }
        inner.orders.insert(order.id.clone(), order.clone());
        (order, true)
    }

    pub fn get_order(&self, order_id: &str) -> Option<Order> {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        inner.orders.get(order_id).cloned()
    }

    pub fn get_payment(&self, payment_id: &str) -> Option<Payment> {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        inner.payments.get(payment_id).cloned()
    }

    /// Look up a payment by merchant transaction id and gateway.
    /// Absent means the webhook references state we never created.
    pub fn payment_by_transaction(
        &self,
        transaction_id: &str,
        gateway_name: &str,
    ) -> Option<Payment> {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        inner
            .payments
            .values()
            .find(|p| p.transaction_id == transaction_id && p.gateway_name == gateway_name)
            .cloned()
    }

    /// Record a fresh payment attempt and stamp the order with the
    /// attempt's gateway and transaction id.
    ///
    /// Fails `Conflict` when the order is no longer pending: resolved
    /// orders accept no new attempts.
    pub fn record_attempt(&self, payment: Payment) -> ReconResult<Payment> {
        let mut inner = self.inner.lock().expect("ledger lock poisoned");
        let order = inner
            .orders
            .get_mut(&payment.order_id)
            .ok_or_else(|| ReconError::NotFound(format!("Order not found: {}", payment.order_id)))?;
        if order.status != TxnStatus::Pending {
            return Err(ReconError::Conflict(format!(
                "Order already {}",
                order.status
            )));
        }
        order.gateway_name = Some(payment.gateway_name.clone());
        order.transaction_id = Some(payment.transaction_id.clone());
        order.updated_at = Utc::now();
        inner.payments.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }

    /// The single atomic pending→terminal transition for a payment and
    /// its order, the in-memory analogue of
    /// `UPDATE ... SET status=$1 WHERE id=$2 AND status='pending'`.
    ///
    /// Under one lock: a non-pending payment, or a terminal order (a
    /// sibling attempt won), yields `AlreadySettled`; otherwise both
    /// rows transition together.
    pub fn settle(
        &self,
        payment_id: &str,
        event: SettlementEvent,
        audit: SettlementAudit,
    ) -> ReconResult<SettleOutcome> {
        let mut inner = self.inner.lock().expect("ledger lock poisoned");

        let payment_status = inner
            .payments
            .get(payment_id)
            .map(|p| (p.status, p.order_id.clone()))
            .ok_or_else(|| ReconError::NotFound(format!("Payment not found: {}", payment_id)))?;
        let (current, order_id) = payment_status;

        let Some(outcome) = next_status(current, event) else {
            return Ok(SettleOutcome::AlreadySettled(current));
        };

        let order = inner
            .orders
            .get(&order_id)
            .ok_or_else(|| ReconError::NotFound(format!("Order not found: {}", order_id)))?;
        if order.status.is_terminal() {
            return Ok(SettleOutcome::AlreadySettled(order.status));
        }

        let now = Utc::now();
        {
            let payment = inner
                .payments
                .get_mut(payment_id)
                .expect("payment vanished under lock");
            payment.status = outcome;
            // verified_by/verified_at travel together; webhook wins
            // carry neither
            if audit.verified_by.is_some() {
                payment.verified_by = audit.verified_by;
                payment.verified_at = Some(now);
            }
            payment.admin_notes = audit.admin_notes;
            if audit.gateway_transaction_id.is_some() {
                payment.gateway_transaction_id = audit.gateway_transaction_id;
            }
        }
        {
            let order = inner
                .orders
                .get_mut(&order_id)
                .expect("order vanished under lock");
            order.status = outcome;
            order.updated_at = now;
        }

        let payment = inner.payments.get(payment_id).cloned().expect("settled payment");
        let order = inner.orders.get(&order_id).cloned().expect("settled order");
        Ok(SettleOutcome::Won { order, payment })
    }

    /// Paginated payment listing, newest first
    pub fn list_payments(&self, filter: PaymentFilter, limit: usize, offset: usize) -> Vec<Payment> {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        let mut payments: Vec<Payment> = inner
            .payments
            .values()
            .filter(|p| match filter {
                PaymentFilter::Pending => p.status == TxnStatus::Pending,
                PaymentFilter::All => true,
            })
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        payments.into_iter().skip(offset).take(limit).collect()
    }
}

/// Entitlement grants, keyed by `(user_id, kind, product_id)`.
///
/// `find_or_create` is a true no-op when the row exists, which makes it
/// safe for both verification paths to invoke it for the same order.
#[derive(Default)]
pub struct EnrollmentStore {
    inner: Mutex<HashMap<(String, ProductKind, String), Enrollment>>,
}

impl EnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find-or-create the enrollment for (user, product), defaulting to
    /// active and linking the funding payment. Returns the row and
    /// whether it was created by this call.
    pub fn find_or_create(
        &self,
        user_id: &str,
        product: &ProductRef,
        payment_id: Option<String>,
    ) -> (Enrollment, bool) {
        let mut inner = self.inner.lock().expect("enrollment lock poisoned");
        let key = (
            user_id.to_string(),
            product.kind,
            product.id.clone(),
        );
        match inner.entry(key) {
            std::collections::hash_map::Entry::Occupied(entry) => (entry.get().clone(), false),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let enrollment =
                    Enrollment::granted(user_id, product.clone(), payment_id);
                entry.insert(enrollment.clone());
                (enrollment, true)
            }
        }
    }

    pub fn get(&self, user_id: &str, product: &ProductRef) -> Option<Enrollment> {
        let inner = self.inner.lock().expect("enrollment lock poisoned");
        inner
            .get(&(user_id.to_string(), product.kind, product.id.clone()))
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().expect("enrollment lock poisoned").len()
    }
}

/// Gateway settings with the single-default invariant.
///
/// When an upsert carries `is_default = true`, every other row's flag is
/// flipped off inside the same lock, so there is no window with two
/// defaults.
#[derive(Default)]
pub struct GatewayRegistry {
    inner: Mutex<HashMap<String, GatewaySetting>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update a gateway setting. Raw credentials are hashed on
    /// the way in; the returned view carries no secrets.
    pub fn upsert(&self, new: NewGatewaySetting) -> ReconResult<GatewaySettingView> {
        if new.gateway_name.trim().is_empty() {
            return Err(ReconError::Validation(
                "gateway_name must not be empty".to_string(),
            ));
        }

        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let make_default = new.is_default;
        let name = new.gateway_name.clone();
        let mut setting = new.into_setting();

        if let Some(existing) = inner.get(&name) {
            setting.id = existing.id.clone();
            setting.created_at = existing.created_at;
        }
        setting.updated_at = Utc::now();

        if make_default {
            for other in inner.values_mut() {
                if other.gateway_name != name {
                    other.is_default = false;
                }
            }
        }

        let view = setting.public_view();
        inner.insert(name, setting);
        Ok(view)
    }

    /// The default active gateway, falling back to any active one.
    /// Secrets stripped.
    pub fn get_active(&self) -> Option<GatewaySettingView> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner
            .values()
            .find(|g| g.is_default && g.is_active)
            .or_else(|| inner.values().find(|g| g.is_active))
            .map(|g| g.public_view())
    }

    /// A named gateway, secrets stripped
    pub fn get(&self, gateway_name: &str) -> Option<GatewaySettingView> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.get(gateway_name).map(|g| g.public_view())
    }

    /// Full setting including the webhook salt. Consumed only by the
    /// webhook verification path; never exposed at the network boundary.
    pub fn get_for_backend_use(&self, gateway_name: &str) -> Option<GatewaySetting> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.get(gateway_name).cloned()
    }

    /// All settings, secrets stripped
    pub fn list(&self) -> Vec<GatewaySettingView> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        let mut views: Vec<_> = inner.values().map(|g| g.public_view()).collect();
        views.sort_by(|a, b| a.gateway_name.cmp(&b.gateway_name));
        views
    }

    /// Count of rows with `is_default = true` (invariant: at most one)
    pub fn default_count(&self) -> usize {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.values().filter(|g| g.is_default).count()
    }
}
