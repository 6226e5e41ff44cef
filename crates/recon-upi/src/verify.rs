//! # X-VERIFY Webhook Verification
//!
//! The UPI collect flow confirms payments through a server-to-server
//! callback carrying an `X-VERIFY` signature header:
//!
//! ```text
//! X-VERIFY = hex(sha256(raw_body || path || salt)) + "###" + salt_index
//! ```
//!
//! The digest is recomputed from the raw request bytes before any
//! payload decoding, and compared in constant time. On mismatch the
//! caller learns nothing beyond a rejection.
//!
//! The body is an envelope `{"response": "<base64 status JSON>"}`; the
//! decoded JSON carries the gateway status code and the merchant/gateway
//! transaction ids.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use recon_core::{
    GatewayNotification, GatewaySetting, GatewayStatus, ReconError, ReconResult, WebhookVerifier,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Compute the expected `X-VERIFY` value for a callback.
///
/// Exposed so tests and gateway simulators can produce valid
/// signatures.
pub fn compute_signature(body: &[u8], path: &str, salt: &str, salt_index: u8) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hasher.update(path.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{}###{}", hex::encode(hasher.finalize()), salt_index)
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Callback body envelope
#[derive(Debug, Deserialize)]
struct CallbackEnvelope {
    /// Base64-encoded status JSON
    response: String,
}

/// Decoded status payload
#[derive(Debug, Deserialize)]
struct CallbackStatus {
    #[serde(default)]
    #[allow(dead_code)]
    success: bool,
    code: String,
    data: CallbackData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallbackData {
    /// Our `Payment.transaction_id`
    merchant_transaction_id: String,
    /// The gateway's own transaction id
    #[serde(default)]
    transaction_id: Option<String>,
}

/// Map a gateway status code onto the ledger's view of it
fn map_status_code(code: &str) -> GatewayStatus {
    match code {
        "PAYMENT_SUCCESS" => GatewayStatus::Success,
        "PAYMENT_ERROR" | "PAYMENT_DECLINED" | "TIMED_OUT" => GatewayStatus::Failure,
        // PAYMENT_PENDING and anything unrecognized: no ledger change
        _ => GatewayStatus::Pending,
    }
}

/// Webhook verification strategy for the UPI collect gateway
pub struct UpiCollectVerifier;

impl UpiCollectVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UpiCollectVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookVerifier for UpiCollectVerifier {
    fn gateway_name(&self) -> &'static str {
        "upi"
    }

    async fn verify(
        &self,
        body: &[u8],
        path: &str,
        signature: &str,
        setting: &GatewaySetting,
    ) -> ReconResult<GatewayNotification> {
        // Signature first, on raw bytes only. A forged callback must be
        // rejected before its payload is even parsed.
        let expected = compute_signature(body, path, &setting.webhook_salt, setting.salt_index);
        if !constant_time_compare(signature, &expected) {
            warn!(gateway = %setting.gateway_name, "X-VERIFY mismatch");
            return Err(ReconError::SignatureInvalid);
        }

        let envelope: CallbackEnvelope = serde_json::from_slice(body)
            .map_err(|e| ReconError::WebhookParse(format!("invalid envelope: {}", e)))?;

        let decoded = general_purpose::STANDARD
            .decode(&envelope.response)
            .map_err(|e| ReconError::WebhookParse(format!("invalid base64 response: {}", e)))?;

        let status: CallbackStatus = serde_json::from_slice(&decoded)
            .map_err(|e| ReconError::WebhookParse(format!("invalid status payload: {}", e)))?;

        debug!(
            code = %status.code,
            txn = %status.data.merchant_transaction_id,
            "verified UPI callback"
        );

        Ok(GatewayNotification {
            merchant_transaction_id: status.data.merchant_transaction_id,
            gateway_transaction_id: status.data.transaction_id,
            status: map_status_code(&status.code),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use recon_core::Currency;
    use serde_json::json;

    const PATH: &str = "/webhooks/payment-status/upi";
    const SALT: &str = "test-salt";

    fn setting() -> GatewaySetting {
        let now = Utc::now();
        GatewaySetting {
            id: "gw-1".to_string(),
            gateway_name: "upi".to_string(),
            merchant_upi_id: "merchant@upi".to_string(),
            merchant_name: "CoursePay".to_string(),
            api_key_hash: String::new(),
            api_secret_hash: String::new(),
            webhook_salt: SALT.to_string(),
            salt_index: 1,
            currency: Currency::INR,
            is_active: true,
            is_default: true,
            webhook_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a validly-enveloped callback body for a status code
    fn callback_body(code: &str, merchant_txn: &str, gateway_txn: &str) -> Vec<u8> {
        let status = json!({
            "success": code == "PAYMENT_SUCCESS",
            "code": code,
            "data": {
                "merchantTransactionId": merchant_txn,
                "transactionId": gateway_txn,
            }
        });
        let encoded = general_purpose::STANDARD.encode(status.to_string());
        json!({ "response": encoded }).to_string().into_bytes()
    }

    #[tokio::test]
    async fn test_valid_signature_and_parse() {
        let body = callback_body("PAYMENT_SUCCESS", "TXN-1", "UPI123");
        let sig = compute_signature(&body, PATH, SALT, 1);

        let verifier = UpiCollectVerifier::new();
        let notification = verifier.verify(&body, PATH, &sig, &setting()).await.unwrap();

        assert_eq!(notification.merchant_transaction_id, "TXN-1");
        assert_eq!(notification.gateway_transaction_id.as_deref(), Some("UPI123"));
        assert_eq!(notification.status, GatewayStatus::Success);
    }

    #[tokio::test]
    async fn test_tampered_body_is_rejected() {
        let body = callback_body("PAYMENT_SUCCESS", "TXN-1", "UPI123");
        let sig = compute_signature(&body, PATH, SALT, 1);

        let tampered = callback_body("PAYMENT_SUCCESS", "TXN-2", "UPI123");
        let verifier = UpiCollectVerifier::new();
        let result = verifier.verify(&tampered, PATH, &sig, &setting()).await;
        assert!(matches!(result, Err(ReconError::SignatureInvalid)));
    }

    #[tokio::test]
    async fn test_wrong_salt_is_rejected() {
        let body = callback_body("PAYMENT_SUCCESS", "TXN-1", "UPI123");
        let sig = compute_signature(&body, PATH, "attacker-salt", 1);

        let verifier = UpiCollectVerifier::new();
        let result = verifier.verify(&body, PATH, &sig, &setting()).await;
        assert!(matches!(result, Err(ReconError::SignatureInvalid)));
    }

    #[tokio::test]
    async fn test_wrong_path_is_rejected() {
        let body = callback_body("PAYMENT_SUCCESS", "TXN-1", "UPI123");
        let sig = compute_signature(&body, "/webhooks/payment-status/other", SALT, 1);

        let verifier = UpiCollectVerifier::new();
        let result = verifier.verify(&body, PATH, &sig, &setting()).await;
        assert!(matches!(result, Err(ReconError::SignatureInvalid)));
    }

    #[tokio::test]
    async fn test_status_code_mapping() {
        let verifier = UpiCollectVerifier::new();
        for (code, expected) in [
            ("PAYMENT_SUCCESS", GatewayStatus::Success),
            ("PAYMENT_ERROR", GatewayStatus::Failure),
            ("PAYMENT_DECLINED", GatewayStatus::Failure),
            ("TIMED_OUT", GatewayStatus::Failure),
            ("PAYMENT_PENDING", GatewayStatus::Pending),
            ("SOMETHING_NEW", GatewayStatus::Pending),
        ] {
            let body = callback_body(code, "TXN-1", "UPI123");
            let sig = compute_signature(&body, PATH, SALT, 1);
            let notification = verifier.verify(&body, PATH, &sig, &setting()).await.unwrap();
            assert_eq!(notification.status, expected, "code {}", code);
        }
    }

    #[tokio::test]
    async fn test_valid_signature_bad_envelope_is_parse_error() {
        let body = b"not json at all".to_vec();
        let sig = compute_signature(&body, PATH, SALT, 1);

        let verifier = UpiCollectVerifier::new();
        let result = verifier.verify(&body, PATH, &sig, &setting()).await;
        assert!(matches!(result, Err(ReconError::WebhookParse(_))));
    }
}
