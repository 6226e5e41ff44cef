//! # recon-api
//!
//! HTTP API for the coursepay reconciliation engine: order creation,
//! UPI payment initiation, the gateway webhook endpoint, and the admin
//! verification surface.

pub mod auth;
pub mod handlers;
pub mod notifier;
pub mod routes;
pub mod service;
pub mod state;

pub use routes::create_router;
pub use service::{CreateOrderInput, PaymentInitiation, ReconService, WebhookOutcome};
pub use state::{AppConfig, AppState};
