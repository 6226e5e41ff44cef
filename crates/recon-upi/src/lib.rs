//! # recon-upi
//!
//! UPI gateway strategy for the coursepay reconciliation engine.
//!
//! This crate provides:
//! - `build_payment_target`: `upi://pay` intent link plus a QR PNG
//!   data URL for a payment attempt
//! - `UpiCollectVerifier`: the `X-VERIFY` webhook verification
//!   strategy, registered with the core `VerifierSelector`
//! - `compute_signature`: the signature recipe, exposed for tests and
//!   gateway simulators

pub mod intent;
pub mod verify;

pub use intent::{build_intent_link, build_payment_target, render_qr_data_url, PaymentTarget};
pub use verify::{compute_signature, UpiCollectVerifier};
