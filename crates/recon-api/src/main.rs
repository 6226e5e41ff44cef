//! # CoursePay
//!
//! Payment-to-access reconciliation engine for course enrollments.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export ADMIN_API_TOKEN=...
//! export NOTIFY_URL=https://notify.internal/send   # optional
//!
//! # Run the server
//! coursepay
//! ```

use recon_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr();
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Catalog items: {}", state.catalog.items.len());
    info!("Gateways configured: {}", state.gateways.list().len());

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("🚀 CoursePay starting on http://{}", addr);

    if !is_prod {
        info!("📝 Health: http://{}/health", addr);
        info!("💳 Create order: POST http://{}/payments/create-order", addr);
        info!(
            "🔔 Webhook: POST http://{}/webhooks/payment-status/{{gateway}}",
            addr
        );
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  💠 CoursePay 💠
  ━━━━━━━━━━━━━━━━━━━━━━━
  Payment reconciliation engine
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
