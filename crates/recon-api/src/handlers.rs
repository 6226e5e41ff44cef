//! # HTTP Handlers
//!
//! Request/response shapes and handler functions for the payment,
//! webhook and admin surfaces. Handlers stay thin: decode, call the
//! service, encode. The webhook handler is the one exception to normal
//! error mapping: it acknowledges the gateway with 200 regardless of
//! what verification found, and failures surface only in the logs.

use crate::auth::ADMIN_ID_HEADER;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use recon_core::{
    GatewaySettingView, NewGatewaySetting, Order, Payment, PaymentFilter, ReconError, TxnStatus,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

pub const X_VERIFY_HEADER: &str = "X-VERIFY";

/// Standard error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn to_api_error(err: ReconError) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let error = match &err {
        ReconError::Validation(_) => "Validation",
        ReconError::NotFound(_) => "NotFound",
        ReconError::Conflict(_) => "Conflict",
        ReconError::PriceMismatch { .. } => "PriceMismatch",
        ReconError::Unauthorized => "Unauthorized",
        ReconError::Forbidden => "Forbidden",
        ReconError::SignatureInvalid => "SignatureInvalid",
        ReconError::Configuration(_) => "Configuration",
        ReconError::WebhookParse(_) => "WebhookParse",
        ReconError::Internal(_) => "Internal",
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: err.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "coursepay",
    })
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub course_id: Option<String>,
    pub test_series_id: Option<String>,
    pub qbank_id: Option<String>,
    pub webinar_id: Option<String>,
    /// Client-side price, validated against the catalog
    pub price: f64,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order: Order,
    /// False when an existing pending order was reused
    pub created: bool,
}

#[instrument(skip(state, request), fields(user_id = %request.user_id))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let input = crate::service::CreateOrderInput {
        user_id: request.user_id,
        course_id: request.course_id,
        test_series_id: request.test_series_id,
        qbank_id: request.qbank_id,
        webinar_id: request.webinar_id,
        price: request.price,
        customer_email: request.customer_email,
        customer_name: request.customer_name,
        customer_phone: request.customer_phone,
    };
    let (order, created) = state.service.create_order(input).map_err(to_api_error)?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(CreateOrderResponse { order, created })))
}

#[derive(Debug, Deserialize)]
pub struct ProcessTransactionRequest {
    pub order_id: String,
    /// Omit to use the default gateway
    pub gateway_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessTransactionResponse {
    pub payment: Payment,
    /// `upi://pay` intent link for app handoff
    pub deep_link: String,
    /// QR code of the same link as a PNG data URL
    pub qr_data_url: String,
}

#[instrument(skip(state))]
pub async fn process_transaction(
    State(state): State<AppState>,
    Json(request): Json<ProcessTransactionRequest>,
) -> Result<Json<ProcessTransactionResponse>, ApiError> {
    let initiation = state
        .service
        .initiate_payment(&request.order_id, request.gateway_name.as_deref())
        .map_err(to_api_error)?;
    Ok(Json(ProcessTransactionResponse {
        payment: initiation.payment,
        deep_link: initiation.target.deep_link,
        qr_data_url: initiation.target.qr_data_url,
    }))
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
}

/// Gateway callback endpoint.
///
/// Always acknowledges with 200: gateways retry on anything else, and
/// the response must not reveal whether a forged delivery was detected.
/// The real outcome lives in the ledger and the logs.
#[instrument(skip(state, headers, body))]
pub async fn payment_status_webhook(
    State(state): State<AppState>,
    Path(gateway_name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookAck> {
    let path = format!("/webhooks/payment-status/{}", gateway_name);
    let signature = headers
        .get(X_VERIFY_HEADER)
        .and_then(|v| v.to_str().ok());

    match state
        .service
        .handle_webhook(&gateway_name, &path, &body, signature)
        .await
    {
        Ok(outcome) => {
            info!(gateway = %gateway_name, ?outcome, "webhook processed");
        }
        Err(e) if e.is_webhook_silent() => {
            warn!(gateway = %gateway_name, "webhook rejected: {}", e);
        }
        Err(e) => {
            error!(gateway = %gateway_name, "webhook processing failed: {}", e);
        }
    }

    Json(WebhookAck {
        success: true,
        message: "acknowledged".to_string(),
    })
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub payment_id: String,
    /// "successful" or "failed"
    pub status: TxnStatus,
    pub admin_notes: Option<String>,
    pub gateway_transaction_id: Option<String>,
}

#[instrument(skip(state, headers, request), fields(payment_id = %request.payment_id))]
pub async fn verify_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<Payment>, ApiError> {
    let admin_id = headers
        .get(ADMIN_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("admin");

    let payment = state
        .service
        .admin_verify(
            &request.payment_id,
            admin_id,
            request.status,
            request.admin_notes,
            request.gateway_transaction_id,
        )
        .await
        .map_err(to_api_error)?;
    Ok(Json(payment))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PageQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(50)
    }

    fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentListResponse {
    pub payments: Vec<Payment>,
    pub limit: usize,
    pub offset: usize,
}

#[instrument(skip(state))]
pub async fn list_pending_payments(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Json<PaymentListResponse> {
    let payments = state
        .ledger
        .list_payments(PaymentFilter::Pending, page.limit(), page.offset());
    Json(PaymentListResponse {
        payments,
        limit: page.limit(),
        offset: page.offset(),
    })
}

#[instrument(skip(state))]
pub async fn list_all_payments(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Json<PaymentListResponse> {
    let payments = state
        .ledger
        .list_payments(PaymentFilter::All, page.limit(), page.offset());
    Json(PaymentListResponse {
        payments,
        limit: page.limit(),
        offset: page.offset(),
    })
}

#[instrument(skip(state))]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    state
        .ledger
        .get_payment(&payment_id)
        .map(Json)
        .ok_or_else(|| {
            to_api_error(ReconError::NotFound(format!(
                "Payment not found: {}",
                payment_id
            )))
        })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayListResponse {
    pub gateways: Vec<GatewaySettingView>,
}

#[instrument(skip(state))]
pub async fn list_gateways(State(state): State<AppState>) -> Json<GatewayListResponse> {
    Json(GatewayListResponse {
        gateways: state.gateways.list(),
    })
}

#[instrument(skip(state, request), fields(gateway = %request.gateway_name))]
pub async fn upsert_gateway(
    State(state): State<AppState>,
    Json(request): Json<NewGatewaySetting>,
) -> Result<(StatusCode, Json<GatewaySettingView>), ApiError> {
    let view = state.gateways.upsert(request).map_err(to_api_error)?;
    info!(gateway = %view.gateway_name, is_default = view.is_default, "gateway setting upserted");
    Ok((StatusCode::CREATED, Json(view)))
}
