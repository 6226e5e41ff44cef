//! # Notifier Contract
//!
//! Email delivery is an external collaborator behind one `send`
//! contract. Delivery failures after a settlement has committed are
//! logged and never roll the ledger back.

use crate::error::ReconResult;
use crate::order::Order;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

/// Outbound notification contract
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> ReconResult<()>;
}

/// Default notifier: logs instead of delivering
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> ReconResult<()> {
        info!("Email (logged, not delivered): to={}, subject={}", to, subject);
        Ok(())
    }
}

/// A sent mail captured by [`MemoryNotifier`]
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Test double recording every send
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<SentMail>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("notifier lock poisoned").clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, to: &str, subject: &str, html: &str) -> ReconResult<()> {
        self.sent.lock().expect("notifier lock poisoned").push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// Confirmation email for a successfully settled order
pub fn confirmation_email(order: &Order) -> (String, String) {
    let subject = "Payment confirmed: access granted".to_string();
    let html = format!(
        "<p>Hi {},</p>\
         <p>Your payment of {} for <b>{}</b> was confirmed. \
         You now have full access.</p>\
         <p>Order reference: {}</p>",
        order.customer_name.as_deref().unwrap_or("there"),
        order.amount.display(),
        order.product,
        order.id,
    );
    (subject, html)
}

/// Rejection email for a failed settlement
pub fn rejection_email(order: &Order) -> (String, String) {
    let subject = "Payment could not be verified".to_string();
    let html = format!(
        "<p>Hi {},</p>\
         <p>We could not verify your payment of {} for <b>{}</b>. \
         No access was granted and no amount is owed. If you were \
         charged, the amount will be reversed by your bank.</p>\
         <p>Order reference: {}</p>",
        order.customer_name.as_deref().unwrap_or("there"),
        order.amount.display(),
        order.product,
        order.id,
    );
    (subject, html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Currency, Price};
    use crate::product::{ProductKind, ProductRef};

    fn order() -> Order {
        Order::new(
            "user-1",
            ProductRef::new(ProductKind::Course, "anatomy-101"),
            Price::new(499.0, Currency::INR),
        )
        .with_contact(
            Some("student@example.com".to_string()),
            Some("Asha".to_string()),
            None,
        )
    }

    #[tokio::test]
    async fn test_memory_notifier_records_sends() {
        let notifier = MemoryNotifier::new();
        notifier.send("a@b.c", "hello", "<p>hi</p>").await.unwrap();
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@b.c");
    }

    #[test]
    fn test_confirmation_email_mentions_order() {
        let order = order();
        let (subject, html) = confirmation_email(&order);
        assert!(subject.contains("confirmed"));
        assert!(html.contains(&order.id));
        assert!(html.contains("Asha"));
        assert!(html.contains("INR 499.00"));
    }

    #[test]
    fn test_rejection_email_mentions_order() {
        let order = order();
        let (subject, html) = rejection_email(&order);
        assert!(subject.contains("could not"));
        assert!(html.contains(&order.id));
    }
}
