use std::{sync::Arc, time::Duration};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::{
    adapters::{InventorySource, OrderManagementAdapter, SourceRegistry, WarehouseAdapter},
    api::handler::AppState,
    config::Config,
    error::AppResult,
    inventory::SourceId,
    notifications::{EmailNotifier, Notifier},
    reconciliation::ReconciliationEngine,
    reports::{InMemoryReportStore, PgReportStore, ReportStore},
    scheduler::ComparisonScheduler,
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    // Report store
    let store: Arc<dyn ReportStore> = match &config.database_url {
        Some(database_url) => {
            let pool = initialize_database(database_url).await?;
            Arc::new(PgReportStore::new(pool))
        }
        None => {
            warn!("⚠️  DATABASE_URL not set - reports are kept in memory and lost on restart");
            Arc::new(InMemoryReportStore::new())
        }
    };
    info!("✅ Report store initialized ({})", store.kind());

    // Inventory sources
    let order_management: Arc<dyn InventorySource> =
        Arc::new(OrderManagementAdapter::from_config(&config.oms, &config.fetch)?);
    let warehouse: Arc<dyn InventorySource> =
        Arc::new(WarehouseAdapter::from_config(&config.wms, &config.fetch)?);

    let mut registry = SourceRegistry::new();
    registry.register(order_management.clone());
    registry.register(warehouse.clone());

    for id in SourceId::all() {
        if registry.is_configured(id) {
            info!("✅ {} source configured", id.display_name());
        } else {
            warn!("⚠️  {} credentials missing - comparisons will fail until set", id.display_name());
        }
    }

    // Notifications
    let notifier: Arc<dyn Notifier> = Arc::new(EmailNotifier::new(&config.notification));
    if notifier.is_configured() {
        info!(
            "✅ E-mail notifications enabled for {} recipients",
            config.notification.recipients.len()
        );
    } else {
        warn!("⚠️  E-mail notifications disabled (RESEND_API_KEY or EMAIL_RECIPIENTS missing)");
    }

    if !config.ignored_skus.is_empty() {
        info!("🙈 Ignoring {} SKUs in comparisons", config.ignored_skus.len());
    }

    let engine = Arc::new(
        ReconciliationEngine::new(order_management, warehouse, store.clone())
            .with_notifier(notifier.clone())
            .with_ignored_skus(config.ignored_skus.iter().cloned()),
    );

    if config.schedule.enabled {
        ComparisonScheduler::new(config.schedule.clone(), engine.clone()).start();
        info!(
            "✅ Daily comparison scheduled at {:02}:00 UTC",
            config.schedule.hour_utc
        );
    }

    Ok(AppState {
        engine,
        registry: Arc::new(registry),
        store,
        notifier,
    })
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    info!("✓ Database pool configured: 10 max connections");

    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
