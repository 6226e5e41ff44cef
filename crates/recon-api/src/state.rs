//! # Application State and Configuration
//!
//! Server configuration from environment variables, plus the shared
//! state handed to every handler: catalog, stores, the reconciliation
//! service and the notifier behind it.

use crate::notifier::HttpNotifier;
use crate::service::ReconService;
use anyhow::{Context, Result};
use recon_core::{
    Catalog, EnrollmentStore, GatewayRegistry, LedgerStore, LoggingNotifier, NewGatewaySetting,
    Notifier, VerifierSelector,
};
use recon_upi::UpiCollectVerifier;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration (from environment)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    /// Shared token admin callers present in `X-Admin-Token`
    pub admin_token: String,
    /// Optional relay URL for outbound email
    pub notify_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let admin_token =
            std::env::var("ADMIN_API_TOKEN").context("ADMIN_API_TOKEN must be set")?;
        let notify_url = std::env::var("NOTIFY_URL").ok();

        Ok(Self {
            host,
            port,
            environment,
            admin_token,
            notify_url,
        })
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Gateway seed file shape (`config/gateways.toml`)
#[derive(Debug, Deserialize)]
struct GatewaySeedFile {
    #[serde(default)]
    gateways: Vec<NewGatewaySetting>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<Catalog>,
    pub ledger: Arc<LedgerStore>,
    pub enrollments: Arc<EnrollmentStore>,
    pub gateways: Arc<GatewayRegistry>,
    pub service: Arc<ReconService>,
}

impl AppState {
    /// Build state from environment and the config files on disk
    pub fn new() -> Result<Self> {
        let config = AppConfig::from_env()?;
        let catalog = load_catalog()?;
        let gateways = Arc::new(GatewayRegistry::new());
        seed_gateways(&gateways)?;

        let notifier: Arc<dyn Notifier> = match &config.notify_url {
            Some(url) => {
                info!("Email relay configured: {}", url);
                Arc::new(HttpNotifier::new(url.clone()))
            }
            None => {
                warn!("NOTIFY_URL not set, email will be logged only");
                Arc::new(LoggingNotifier)
            }
        };

        Ok(Self::assemble(config, catalog, gateways, notifier))
    }

    /// Wire the stores and service together. Tests call this directly
    /// with their own catalog, registry and notifier.
    pub fn assemble(
        config: AppConfig,
        catalog: Catalog,
        gateways: Arc<GatewayRegistry>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let ledger = Arc::new(LedgerStore::new());
        let enrollments = Arc::new(EnrollmentStore::new());
        let verifiers = VerifierSelector::new().with_verifier(Arc::new(UpiCollectVerifier::new()));

        let service = Arc::new(ReconService::new(
            Arc::clone(&catalog),
            Arc::clone(&ledger),
            Arc::clone(&enrollments),
            Arc::clone(&gateways),
            verifiers,
            notifier,
        ));

        Self {
            config: Arc::new(config),
            catalog,
            ledger,
            enrollments,
            gateways,
            service,
        }
    }
}

/// Load the product catalog, trying a few likely locations
fn load_catalog() -> Result<Catalog> {
    let paths = [
        "config/catalog.toml",
        "../config/catalog.toml",
        "../../config/catalog.toml",
    ];

    for path in &paths {
        if let Ok(contents) = std::fs::read_to_string(path) {
            let catalog = Catalog::from_toml(&contents)
                .with_context(|| format!("Failed to parse catalog from {}", path))?;
            info!("Loaded {} catalog items from {}", catalog.items.len(), path);
            return Ok(catalog);
        }
    }

    warn!("No catalog.toml found, starting with an empty catalog");
    Ok(Catalog::new())
}

/// Seed the gateway registry from `config/gateways.toml` when present.
/// Gateways added later through the admin API take the same path.
fn seed_gateways(registry: &GatewayRegistry) -> Result<()> {
    let paths = [
        "config/gateways.toml",
        "../config/gateways.toml",
        "../../config/gateways.toml",
    ];

    for path in &paths {
        if let Ok(contents) = std::fs::read_to_string(path) {
            let seed: GatewaySeedFile = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse gateways from {}", path))?;
            let count = seed.gateways.len();
            for gateway in seed.gateways {
                registry
                    .upsert(gateway)
                    .map_err(|e| anyhow::anyhow!("Invalid gateway seed: {}", e))?;
            }
            info!("Seeded {} gateway settings from {}", count, path);
            return Ok(());
        }
    }

    warn!("No gateways.toml found, registry starts empty");
    Ok(())
}
