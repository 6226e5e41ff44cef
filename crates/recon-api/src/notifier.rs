//! # HTTP Notifier Relay
//!
//! Forwards confirmation/rejection email to an external notification
//! service over HTTP. Delivery is best-effort: the caller logs failures
//! and never unwinds committed ledger state over them.

use async_trait::async_trait;
use recon_core::{Notifier, ReconError, ReconResult};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct MailPayload<'a> {
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Notifier that POSTs `{to, subject, html}` to a relay URL
pub struct HttpNotifier {
    client: Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, to: &str, subject: &str, html: &str) -> ReconResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&MailPayload { to, subject, html })
            .send()
            .await
            .map_err(|e| ReconError::Internal(format!("notify relay unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReconError::Internal(format!(
                "notify relay returned {}",
                status
            )));
        }

        debug!("Relayed email: to={}, subject={}", to, subject);
        Ok(())
    }
}
