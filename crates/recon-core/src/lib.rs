//! # recon-core
//!
//! Core types and stores for the coursepay payment-to-access
//! reconciliation engine.
//!
//! This crate provides:
//! - `Order` / `Payment` records and the pure settlement state machine
//! - `LedgerStore` with the atomic pending→terminal gate both
//!   verification paths (gateway webhook, manual admin decision) race
//!   through
//! - `EnrollmentStore` for idempotent entitlement grants
//! - `GatewayRegistry` with the single-default invariant and one-way
//!   hashed credentials
//! - `WebhookVerifier` trait for pluggable per-gateway signature recipes
//! - `Notifier` for confirmation/rejection email
//! - `ReconError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use recon_core::{LedgerStore, Order, Payment, SettlementEvent, SettlementAudit};
//!
//! let ledger = LedgerStore::new();
//! let (order, _) = ledger.create_order(order);
//! let payment = ledger.record_attempt(Payment::new_attempt(&order, "upi", txn_id))?;
//!
//! // Webhook and admin race; exactly one wins the settle gate
//! let outcome = ledger.settle(&payment.id, SettlementEvent::GatewaySuccess, SettlementAudit::default())?;
//! ```

pub mod enrollment;
pub mod error;
pub mod gateway;
pub mod money;
pub mod notify;
pub mod order;
pub mod product;
pub mod store;

// Re-exports for convenience
pub use enrollment::{Enrollment, EnrollmentStatus};
pub use error::{ReconError, ReconResult};
pub use gateway::{
    hash_secret, BoxedWebhookVerifier, GatewayNotification, GatewaySetting, GatewaySettingView,
    GatewayStatus, NewGatewaySetting, VerifierSelector, WebhookVerifier,
};
pub use money::{Currency, Price};
pub use notify::{confirmation_email, rejection_email, LoggingNotifier, MemoryNotifier, Notifier};
pub use order::{
    new_transaction_id, next_status, Order, Payment, SettlementEvent, TxnStatus,
};
pub use product::{Catalog, CatalogItem, ProductKind, ProductRef};
pub use store::{
    EnrollmentStore, GatewayRegistry, LedgerStore, PaymentFilter, SettleOutcome, SettlementAudit,
};
