//! # Gateway Configuration and Verification Strategy
//!
//! Gateway settings carry merchant identity plus the material needed to
//! authenticate inbound webhooks. Credentials are one-way hashed before
//! storage; the webhook salt is the one field kept verbatim, because a
//! signature cannot be recomputed from a hash. It is never serialized
//! and only reachable through [`crate::store::GatewayRegistry::get_for_backend_use`].
//!
//! Verification itself is a per-gateway strategy behind the
//! [`WebhookVerifier`] trait, so each gateway brings its own signature
//! recipe and payload envelope.

use crate::error::ReconResult;
use crate::money::Currency;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// One-way hash applied to gateway credentials before storage
pub fn hash_secret(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Stored configuration for one payment gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySetting {
    /// Unique id (generated)
    pub id: String,

    /// Unique gateway name (routing key for webhooks)
    pub gateway_name: String,

    /// Merchant UPI handle (e.g., "merchant@upi")
    pub merchant_upi_id: String,

    /// Payee display name
    pub merchant_name: String,

    /// Credentials, sha256-hashed at rest. No accessor returns the raw values.
    pub api_key_hash: String,
    pub api_secret_hash: String,

    /// Webhook signing salt, kept verbatim for signature recomputation.
    /// Never serialized; stripped from every public view.
    #[serde(skip_serializing, default)]
    pub webhook_salt: String,

    /// Salt index appended to the signature header
    #[serde(default = "default_salt_index")]
    pub salt_index: u8,

    /// Settlement currency
    #[serde(default)]
    pub currency: Currency,

    /// Whether this gateway accepts new attempts
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// At most one setting may be default; enforced by the registry
    #[serde(default)]
    pub is_default: bool,

    /// Callback URL registered with the gateway, informational
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_salt_index() -> u8 {
    1
}

fn default_true() -> bool {
    true
}

impl GatewaySetting {
    /// Whether the merchant fields required to build a payment target
    /// are present
    pub fn has_merchant_fields(&self) -> bool {
        !self.merchant_upi_id.trim().is_empty() && !self.merchant_name.trim().is_empty()
    }

    /// Public view with every secret-bearing field stripped
    pub fn public_view(&self) -> GatewaySettingView {
        GatewaySettingView {
            id: self.id.clone(),
            gateway_name: self.gateway_name.clone(),
            merchant_upi_id: self.merchant_upi_id.clone(),
            merchant_name: self.merchant_name.clone(),
            currency: self.currency,
            is_active: self.is_active,
            is_default: self.is_default,
            webhook_url: self.webhook_url.clone(),
        }
    }
}

/// Input for creating or updating a gateway setting.
/// Carries raw credentials; they are hashed on the way in.
#[derive(Debug, Clone, Deserialize)]
pub struct NewGatewaySetting {
    pub gateway_name: String,
    pub merchant_upi_id: String,
    pub merchant_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Webhook signing salt shared with the gateway dashboard
    pub webhook_salt: String,
    #[serde(default = "default_salt_index")]
    pub salt_index: u8,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl NewGatewaySetting {
    /// Materialize a stored setting, hashing credentials
    pub fn into_setting(self) -> GatewaySetting {
        let now = Utc::now();
        GatewaySetting {
            id: Uuid::new_v4().to_string(),
            gateway_name: self.gateway_name,
            merchant_upi_id: self.merchant_upi_id,
            merchant_name: self.merchant_name,
            api_key_hash: hash_secret(&self.api_key),
            api_secret_hash: hash_secret(&self.api_secret),
            webhook_salt: self.webhook_salt,
            salt_index: self.salt_index,
            currency: self.currency,
            is_active: self.is_active,
            is_default: self.is_default,
            webhook_url: self.webhook_url,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Gateway setting with secrets stripped, safe for any caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettingView {
    pub id: String,
    pub gateway_name: String,
    pub merchant_upi_id: String,
    pub merchant_name: String,
    pub currency: Currency,
    pub is_active: bool,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// Status a gateway reports for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStatus {
    Success,
    Failure,
    /// Ambiguous or still in flight; no ledger change
    Pending,
}

/// A verified, parsed gateway callback
#[derive(Debug, Clone)]
pub struct GatewayNotification {
    /// Our `Payment.transaction_id`
    pub merchant_transaction_id: String,

    /// The gateway's own transaction id, when reported
    pub gateway_transaction_id: Option<String>,

    /// Mapped status
    pub status: GatewayStatus,
}

/// Per-gateway webhook verification strategy.
///
/// Implementations recompute the expected signature from the raw body,
/// the endpoint path and the gateway's salt, strictly before any
/// payload decoding, then parse the envelope into a
/// [`GatewayNotification`].
#[async_trait]
pub trait WebhookVerifier: Send + Sync {
    /// Gateway name this strategy serves (routing key)
    fn gateway_name(&self) -> &'static str;

    /// Verify the signature over the raw body and parse the payload.
    ///
    /// Returns `SignatureInvalid` on any mismatch, with no detail
    /// beyond that.
    async fn verify(
        &self,
        body: &[u8],
        path: &str,
        signature: &str,
        setting: &GatewaySetting,
    ) -> ReconResult<GatewayNotification>;
}

/// Boxed verifier for dynamic dispatch
pub type BoxedWebhookVerifier = Arc<dyn WebhookVerifier>;

/// Selector mapping gateway names to verification strategies
#[derive(Clone, Default)]
pub struct VerifierSelector {
    verifiers: HashMap<String, BoxedWebhookVerifier>,
}

impl VerifierSelector {
    pub fn new() -> Self {
        Self {
            verifiers: HashMap::new(),
        }
    }

    /// Register a verification strategy
    pub fn register(&mut self, verifier: BoxedWebhookVerifier) {
        let name = verifier.gateway_name().to_string();
        self.verifiers.insert(name, verifier);
    }

    /// Register with builder pattern
    pub fn with_verifier(mut self, verifier: BoxedWebhookVerifier) -> Self {
        self.register(verifier);
        self
    }

    /// Get the strategy for a gateway name
    pub fn get(&self, gateway_name: &str) -> Option<&BoxedWebhookVerifier> {
        self.verifiers.get(gateway_name)
    }

    /// List registered gateway names
    pub fn gateways(&self) -> Vec<&str> {
        self.verifiers.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_setting() -> NewGatewaySetting {
        NewGatewaySetting {
            gateway_name: "upi".to_string(),
            merchant_upi_id: "merchant@upi".to_string(),
            merchant_name: "CoursePay".to_string(),
            api_key: "key-123".to_string(),
            api_secret: "secret-456".to_string(),
            webhook_salt: "salt-789".to_string(),
            salt_index: 1,
            currency: Currency::INR,
            is_active: true,
            is_default: true,
            webhook_url: None,
        }
    }

    #[test]
    fn test_credentials_are_hashed_at_rest() {
        let setting = new_setting().into_setting();
        assert_ne!(setting.api_key_hash, "key-123");
        assert_ne!(setting.api_secret_hash, "secret-456");
        assert_eq!(setting.api_key_hash, hash_secret("key-123"));
        // The salt must survive verbatim for signature recomputation
        assert_eq!(setting.webhook_salt, "salt-789");
    }

    #[test]
    fn test_public_view_strips_secrets() {
        let setting = new_setting().into_setting();
        let view = setting.public_view();
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("api_key_hash").is_none());
        assert!(json.get("api_secret_hash").is_none());
        assert!(json.get("webhook_salt").is_none());
        assert_eq!(json["gateway_name"], "upi");
    }

    #[test]
    fn test_setting_serialization_never_leaks_salt() {
        let setting = new_setting().into_setting();
        let json = serde_json::to_value(&setting).unwrap();
        assert!(json.get("webhook_salt").is_none());
    }

    #[test]
    fn test_merchant_field_check() {
        let mut setting = new_setting().into_setting();
        assert!(setting.has_merchant_fields());
        setting.merchant_upi_id = "  ".to_string();
        assert!(!setting.has_merchant_fields());
    }
}
