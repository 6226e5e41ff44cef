//! # Reconciliation Service
//!
//! Orchestrates the purchase flow end to end: order creation against
//! the authoritative catalog price, payment initiation with a UPI
//! target, and the two racing confirmation paths (the gateway webhook
//! and the manual admin decision) both funneling through the ledger's
//! atomic settle gate before any side effect runs.
//!
//! Side effects (entitlement grant, email) happen strictly after the
//! ledger commit. Their failures are logged and never roll the ledger
//! back.

use recon_core::{
    confirmation_email, rejection_email, Catalog, EnrollmentStore, GatewayRegistry, GatewayStatus,
    LedgerStore, Notifier, Order, Payment, ProductRef, ReconError, ReconResult,
    SettleOutcome, SettlementAudit, SettlementEvent, TxnStatus, VerifierSelector,
};
use recon_upi::{build_payment_target, PaymentTarget};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Tolerance between a client-submitted price and the catalog price
const PRICE_TOLERANCE: f64 = 0.01;

/// Input for order creation
#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub user_id: String,
    pub course_id: Option<String>,
    pub test_series_id: Option<String>,
    pub qbank_id: Option<String>,
    pub webinar_id: Option<String>,
    pub price: f64,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
}

/// Result of initiating a payment attempt
#[derive(Debug, Clone)]
pub struct PaymentInitiation {
    pub payment: Payment,
    pub target: PaymentTarget,
}

/// What a webhook delivery did to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// This delivery won the settle gate
    Settled(TxnStatus),
    /// The payment (or its order) was already terminal: duplicate
    /// delivery or a lost race; a no-op by design
    Duplicate,
    /// Gateway reported pending/ambiguous; no ledger change
    NoChange,
}

/// The reconciliation engine's single entry point for both
/// verification paths.
pub struct ReconService {
    catalog: Arc<Catalog>,
    ledger: Arc<LedgerStore>,
    enrollments: Arc<EnrollmentStore>,
    gateways: Arc<GatewayRegistry>,
    verifiers: VerifierSelector,
    notifier: Arc<dyn Notifier>,
}

impl ReconService {
    pub fn new(
        catalog: Arc<Catalog>,
        ledger: Arc<LedgerStore>,
        enrollments: Arc<EnrollmentStore>,
        gateways: Arc<GatewayRegistry>,
        verifiers: VerifierSelector,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            enrollments,
            gateways,
            verifiers,
            notifier,
        }
    }

    /// Record purchase intent. Idempotent while a pending order exists
    /// for the same (user, product); the submitted price is validated
    /// against the catalog and never trusted.
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub fn create_order(&self, input: CreateOrderInput) -> ReconResult<(Order, bool)> {
        if input.user_id.trim().is_empty() {
            return Err(ReconError::Validation("user_id is required".to_string()));
        }

        let product = ProductRef::from_parts(
            input.course_id,
            input.test_series_id,
            input.qbank_id,
            input.webinar_id,
        )?;

        let price = self.catalog.price_of(&product)?;
        if !price.matches(input.price, PRICE_TOLERANCE) {
            return Err(ReconError::PriceMismatch {
                submitted: input.price,
                expected: price.as_decimal(),
            });
        }

        let order = Order::new(input.user_id, product, price).with_contact(
            input.customer_email,
            input.customer_name,
            input.customer_phone,
        );

        let (order, created) = self.ledger.create_order(order);
        if created {
            info!(order_id = %order.id, product = %order.product, "order created");
        } else {
            info!(order_id = %order.id, "pending order reused");
        }
        Ok((order, created))
    }

    /// Create a fresh payment attempt against a pending order and
    /// render its UPI payment target. Retries produce new attempts,
    /// never mutations of a prior one.
    #[instrument(skip(self))]
    pub fn initiate_payment(
        &self,
        order_id: &str,
        gateway_name: Option<&str>,
    ) -> ReconResult<PaymentInitiation> {
        let order = self
            .ledger
            .get_order(order_id)
            .ok_or_else(|| ReconError::NotFound(format!("Order not found: {}", order_id)))?;
        if order.status != TxnStatus::Pending {
            return Err(ReconError::Conflict(format!(
                "Order already {}",
                order.status
            )));
        }

        let gateway = match gateway_name {
            Some(name) => self
                .gateways
                .get(name)
                .ok_or_else(|| ReconError::NotFound(format!("Gateway not found: {}", name)))?,
            None => self.gateways.get_active().ok_or_else(|| {
                ReconError::Configuration("No active payment gateway configured".to_string())
            })?,
        };
        if !gateway.is_active {
            return Err(ReconError::Configuration(format!(
                "Gateway {} is not active",
                gateway.gateway_name
            )));
        }
        if gateway.merchant_upi_id.trim().is_empty() || gateway.merchant_name.trim().is_empty() {
            return Err(ReconError::Configuration(format!(
                "Gateway {} is missing merchant fields",
                gateway.gateway_name
            )));
        }
        // No conversion layer exists; a cross-currency attempt would
        // render an intent link for the wrong amount
        if gateway.currency != order.amount.currency {
            return Err(ReconError::Configuration(format!(
                "Gateway {} settles in {}, order is in {}",
                gateway.gateway_name, gateway.currency, order.amount.currency
            )));
        }

        let transaction_id = recon_core::new_transaction_id();
        let memo = self
            .catalog
            .get(order.product.kind, &order.product.id)
            .map(|item| item.title.clone())
            .unwrap_or_else(|| order.product.id.clone());

        let target = build_payment_target(
            &gateway.merchant_upi_id,
            &gateway.merchant_name,
            &order.amount,
            &transaction_id,
            &memo,
        )?;

        let payment = self.ledger.record_attempt(Payment::new_attempt(
            &order,
            gateway.gateway_name.clone(),
            transaction_id,
        ))?;

        info!(
            order_id = %order.id,
            payment_id = %payment.id,
            txn = %payment.transaction_id,
            gateway = %payment.gateway_name,
            "payment attempt initiated"
        );
        Ok(PaymentInitiation { payment, target })
    }

    /// Apply a gateway callback, strictly ordered: gateway lookup,
    /// signature check on raw bytes, payload parse, ledger lookup,
    /// idempotency gate, atomic settle, then side effects.
    ///
    /// Errors returned here are for the caller's log; the HTTP layer
    /// always acknowledges the gateway regardless.
    #[instrument(skip(self, body, signature))]
    pub async fn handle_webhook(
        &self,
        gateway_name: &str,
        path: &str,
        body: &[u8],
        signature: Option<&str>,
    ) -> ReconResult<WebhookOutcome> {
        // 1. Unknown gateway: reject, no state change
        let setting = self
            .gateways
            .get_for_backend_use(gateway_name)
            .ok_or_else(|| ReconError::NotFound(format!("Unknown gateway: {}", gateway_name)))?;

        // 2-3. Signature over raw bytes, then payload parse, both inside
        // the per-gateway strategy
        let signature = signature.ok_or(ReconError::SignatureInvalid)?;
        let verifier = self.verifiers.get(gateway_name).ok_or_else(|| {
            ReconError::Configuration(format!("No verifier registered for {}", gateway_name))
        })?;
        let notification = verifier.verify(body, path, signature, &setting).await?;

        // 4. Absent transaction: reject, never speculatively create state
        let payment = self
            .ledger
            .payment_by_transaction(&notification.merchant_transaction_id, gateway_name)
            .ok_or_else(|| {
                ReconError::NotFound(format!(
                    "No payment for transaction {}",
                    notification.merchant_transaction_id
                ))
            })?;

        // 5. Idempotency gate: terminal order means duplicate delivery
        let order = self
            .ledger
            .get_order(&payment.order_id)
            .ok_or_else(|| ReconError::Internal("payment without order".to_string()))?;
        if order.status.is_terminal() {
            info!(order_id = %order.id, "duplicate webhook delivery acknowledged");
            return Ok(WebhookOutcome::Duplicate);
        }

        // 6. Map the gateway status and settle atomically
        let event = match notification.status {
            GatewayStatus::Success => SettlementEvent::GatewaySuccess,
            GatewayStatus::Failure => SettlementEvent::GatewayFailure,
            GatewayStatus::Pending => return Ok(WebhookOutcome::NoChange),
        };

        let audit = SettlementAudit {
            gateway_transaction_id: notification.gateway_transaction_id,
            ..SettlementAudit::default()
        };
        match self.ledger.settle(&payment.id, event, audit)? {
            SettleOutcome::Won { order, payment } => {
                info!(
                    order_id = %order.id,
                    status = %order.status,
                    "webhook settled order"
                );
                self.finish_settlement(&order, &payment).await;
                Ok(WebhookOutcome::Settled(order.status))
            }
            SettleOutcome::AlreadySettled(status) => {
                info!(payment_id = %payment.id, %status, "webhook lost settle race");
                Ok(WebhookOutcome::Duplicate)
            }
        }
    }

    /// Manual verification path for settlements the gateway cannot
    /// confirm. The same idempotency gate as the webhook path, seen
    /// from the admin side: a payment that is no longer pending yields
    /// `Conflict("already <status>")`.
    #[instrument(skip(self, notes))]
    pub async fn admin_verify(
        &self,
        payment_id: &str,
        admin_id: &str,
        decision: TxnStatus,
        notes: Option<String>,
        gateway_transaction_id: Option<String>,
    ) -> ReconResult<Payment> {
        let event = match decision {
            TxnStatus::Successful => SettlementEvent::AdminApprove,
            TxnStatus::Failed => SettlementEvent::AdminReject,
            other => {
                return Err(ReconError::Validation(format!(
                    "Decision must be successful or failed, got {}",
                    other
                )))
            }
        };

        let audit = SettlementAudit {
            verified_by: Some(admin_id.to_string()),
            admin_notes: notes,
            gateway_transaction_id,
        };
        match self.ledger.settle(payment_id, event, audit)? {
            SettleOutcome::Won { order, payment } => {
                info!(
                    payment_id = %payment.id,
                    admin = %admin_id,
                    status = %payment.status,
                    "admin settled payment"
                );
                self.finish_settlement(&order, &payment).await;
                Ok(payment)
            }
            SettleOutcome::AlreadySettled(status) => {
                Err(ReconError::Conflict(format!("already {}", status)))
            }
        }
    }

    /// Post-commit side effects: entitlement grant (on success) and
    /// email. Both are best-effort; the settled ledger state stands
    /// whatever happens here.
    async fn finish_settlement(&self, order: &Order, payment: &Payment) {
        if order.status == TxnStatus::Successful {
            let (_, created) = self.enrollments.find_or_create(
                &order.user_id,
                &order.product,
                Some(payment.id.clone()),
            );
            if created {
                info!(
                    user_id = %order.user_id,
                    product = %order.product,
                    "entitlement granted"
                );
            }
        }

        let Some(email) = order.customer_email.as_deref() else {
            warn!(order_id = %order.id, "no customer email on order, skipping notification");
            return;
        };
        let (subject, html) = match order.status {
            TxnStatus::Successful => confirmation_email(order),
            _ => rejection_email(order),
        };
        if let Err(e) = self.notifier.send(email, &subject, &html).await {
            error!(order_id = %order.id, "notification failed: {}", e);
        }
    }

    /// Direct ledger access for the admin read endpoints
    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }
}
