//! # UPI Payment Targets
//!
//! Builds the `upi://pay` intent link for a payment attempt and renders
//! it as a scannable QR code, returned as a PNG data URL.

use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, Luma};
use qrcode::QrCode;
use recon_core::{Price, ReconError, ReconResult};
use std::io::Cursor;

/// A rendered payment target: the deep link and its QR form
#[derive(Debug, Clone)]
pub struct PaymentTarget {
    /// `upi://pay?...` deep link
    pub deep_link: String,
    /// `data:image/png;base64,...` QR rendering of the deep link
    pub qr_data_url: String,
}

/// Build the UPI intent link.
///
/// Format: `upi://pay?pa=<vpa>&pn=<payee>&am=<2dp>&cu=<CUR>&tn=<memo>&tr=<txn>`.
/// Payee name and memo are percent-encoded; the amount is always two
/// decimals, as UPI apps expect.
pub fn build_intent_link(
    merchant_upi_id: &str,
    merchant_name: &str,
    amount: &Price,
    transaction_id: &str,
    memo: &str,
) -> String {
    format!(
        "upi://pay?pa={}&pn={}&am={}&cu={}&tn={}&tr={}",
        merchant_upi_id,
        urlencoding::encode(merchant_name),
        amount.to_upi_amount(),
        amount.currency,
        urlencoding::encode(memo),
        transaction_id,
    )
}

/// Render a link as a QR PNG data URL
pub fn render_qr_data_url(link: &str) -> ReconResult<String> {
    let code = QrCode::new(link)
        .map_err(|e| ReconError::Internal(format!("QR encoding failed: {}", e)))?;
    let qr_image = code.render::<Luma<u8>>().build();

    let dynamic = DynamicImage::ImageLuma8(qr_image);
    let mut buffer = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut buffer, image::ImageOutputFormat::Png)
        .map_err(|e| ReconError::Internal(format!("QR PNG rendering failed: {}", e)))?;

    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(buffer.get_ref())
    ))
}

/// Build the full payment target for an attempt
pub fn build_payment_target(
    merchant_upi_id: &str,
    merchant_name: &str,
    amount: &Price,
    transaction_id: &str,
    memo: &str,
) -> ReconResult<PaymentTarget> {
    let deep_link = build_intent_link(merchant_upi_id, merchant_name, amount, transaction_id, memo);
    let qr_data_url = render_qr_data_url(&deep_link)?;
    Ok(PaymentTarget {
        deep_link,
        qr_data_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_core::Currency;

    #[test]
    fn test_intent_link_format() {
        let link = build_intent_link(
            "merchant@upi",
            "Course Pay",
            &Price::new(499.0, Currency::INR),
            "TXN-abc123",
            "Anatomy 101",
        );
        assert!(link.starts_with("upi://pay?pa=merchant@upi"));
        assert!(link.contains("&pn=Course%20Pay"));
        assert!(link.contains("&am=499.00"));
        assert!(link.contains("&cu=INR"));
        assert!(link.contains("&tn=Anatomy%20101"));
        assert!(link.ends_with("&tr=TXN-abc123"));
    }

    #[test]
    fn test_amount_always_two_decimals() {
        let link = build_intent_link(
            "m@upi",
            "M",
            &Price::new(499.5, Currency::INR),
            "TXN-1",
            "x",
        );
        assert!(link.contains("&am=499.50"));
    }

    #[test]
    fn test_qr_data_url_prefix() {
        let url = render_qr_data_url("upi://pay?pa=m@upi&am=1.00").unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        // The base64 payload decodes to a PNG header
        let payload = url.trim_start_matches("data:image/png;base64,");
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
