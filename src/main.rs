//! PV Placement Webhook
//!
//! Serves the zone-aware PersistentVolume placement webhooks.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pv_placement_webhook::placement::config::{
    DEFAULT_STORAGE_CLASS_NAME, DEFAULT_STORAGE_CLASS_TO_ZONE,
    DEFAULT_SYSTEM_NAMESPACES, DEFAULT_ZONE_TO_PREFERRED_STORAGE_CLASS,
};
use pv_placement_webhook::webhook::server::{
    run_health_server, run_webhook_server, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH,
};
use pv_placement_webhook::{
    AdmissionMetrics, Error, KubeNamespaceLookup, PlacementConfig, PlacementMutator,
    PlacementSettings, PlacementValidator, Result, ServerConfig, WebhookPolicy,
    WebhookState,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// PV Placement Webhook - zone-aware PersistentVolume admission
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Admission webhook bind address
    #[arg(long, env = "WEBHOOK_ADDR", default_value = "0.0.0.0:9443")]
    webhook_addr: String,

    /// Health and metrics bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: String,

    /// TLS certificate (PEM)
    #[arg(long, env = "TLS_CERT_PATH", default_value = WEBHOOK_CERT_PATH)]
    tls_cert_path: PathBuf,

    /// TLS private key (PEM)
    #[arg(long, env = "TLS_KEY_PATH", default_value = WEBHOOK_KEY_PATH)]
    tls_key_path: PathBuf,

    /// Modify PVs defined in system namespaces (true/yes/1/ok)
    #[arg(long, env = "MUTATE_IN_SYSTEM_NS", default_value = "no")]
    mutate_in_system_ns: String,

    /// Verify PVs defined in system namespaces; defaults to the mutate setting
    #[arg(long, env = "VERIFY_IN_SYSTEM_NS")]
    verify_in_system_ns: Option<String>,

    /// Cluster default storageClassName, replaced by the namespace's preferred one
    #[arg(long, env = "DEFAULT_STORAGECLASSNAME", default_value = DEFAULT_STORAGE_CLASS_NAME)]
    default_storage_class: String,

    /// JSON object mapping storageClassName to zone
    #[arg(long, env = "STORAGECLASSNAME_TO_ZONE_MAP", default_value = DEFAULT_STORAGE_CLASS_TO_ZONE)]
    storage_class_to_zone: String,

    /// JSON object mapping zone to its preferred storageClassName
    #[arg(long, env = "ZONE_TO_PREFERRED_STORAGECLASSNAME_MAP", default_value = DEFAULT_ZONE_TO_PREFERRED_STORAGE_CLASS)]
    zone_to_preferred_storage_class: String,

    /// Comma-separated namespaces treated as system namespaces
    #[arg(long, env = "SYSTEM_NAMESPACES", default_value = DEFAULT_SYSTEM_NAMESPACES)]
    system_namespaces: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn placement_settings(&self) -> PlacementSettings {
        PlacementSettings {
            mutate_in_system_namespaces: self.mutate_in_system_ns.clone(),
            verify_in_system_namespaces: self.verify_in_system_ns.clone(),
            default_storage_class_name: self.default_storage_class.clone(),
            storage_class_to_zone: self.storage_class_to_zone.clone(),
            zone_to_preferred_storage_class: self.zone_to_preferred_storage_class.clone(),
            system_namespaces: self.system_namespaces.clone(),
        }
    }

    fn server_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            webhook_addr: parse_addr("webhook", &self.webhook_addr)?,
            health_addr: parse_addr("health", &self.health_addr)?,
            tls_cert_path: self.tls_cert_path.clone(),
            tls_key_path: self.tls_key_path.clone(),
        })
    }
}

fn parse_addr(name: &str, addr: &str) -> Result<SocketAddr> {
    addr.parse()
        .map_err(|e| Error::Configuration(format!("Invalid {} address {}: {}", name, addr, e)))
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    info!("Starting PV Placement Webhook");
    info!("  Version: {}", pv_placement_webhook::VERSION);
    info!("  Webhook: {}", args.webhook_addr);
    info!("  Health: {}", args.health_addr);

    let config = Arc::new(PlacementConfig::from_settings(&args.placement_settings())?);
    info!(
        storage_classes = config.storage_class_to_zone.len(),
        zones = config.zone_to_preferred_storage_class.len(),
        default_storage_class = %config.default_storage_class_name,
        mutate_in_system_namespaces = config.mutate_in_system_namespaces,
        verify_in_system_namespaces = config.verify_in_system_namespaces,
        "Placement configuration loaded"
    );
    let server_config = args.server_config()?;

    let client = kube::Client::try_default().await?;
    let lookup = Arc::new(KubeNamespaceLookup::new(client));

    let state = Arc::new(WebhookState::new(
        PlacementMutator::new(config.clone(), lookup),
        PlacementValidator::new(config),
        AdmissionMetrics::new()?,
    ));

    for policy in [&state.modifier, &state.validator_policy] {
        log_policy(policy);
    }

    // Start health server
    let health_config = server_config.clone();
    let health_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = run_health_server(&health_config, health_state).await {
            error!("Health server error: {}", e);
        }
    });

    tokio::select! {
        result = run_webhook_server(&server_config, state) => result?,
        _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
    }

    info!("Webhook shutdown complete");
    Ok(())
}

/// Log how the API server is expected to call a webhook
fn log_policy(policy: &WebhookPolicy) {
    info!(
        policy = policy.name,
        kind = %policy.kind,
        path = policy.path,
        timeout_seconds = policy.timeout_seconds,
        admission_review_versions = ?policy.admission_review_versions,
        side_effects = policy.side_effects,
        "Serving webhook"
    );
    for setting in &policy.settings {
        info!(
            policy = policy.name,
            setting = setting.name,
            default = setting.default,
            "{}",
            setting.description
        );
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},hyper=warn,kube=info,tower=warn,rustls=warn",
            level
        ))
    });

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
