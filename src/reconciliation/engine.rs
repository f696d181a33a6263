use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::adapters::InventorySource;
use crate::error::{AppError, AppResult};
use crate::notifications::Notifier;
use crate::reconciliation::diff::compute_discrepancies;
use crate::reconciliation::models::{NewReport, Report};
use crate::reconciliation::run_slot::RunSlot;
use crate::reports::ReportStore;

/// Discrepancies included in a notification
pub const NOTIFICATION_LIMIT: usize = 20;

/// Runs one comparison end to end: fetch both sources, diff, persist, notify
pub struct ReconciliationEngine {
    source_a: Arc<dyn InventorySource>,
    source_b: Arc<dyn InventorySource>,
    store: Arc<dyn ReportStore>,
    notifier: Option<Arc<dyn Notifier>>,
    ignored_skus: HashSet<String>,
    run_slot: RunSlot,
}

impl ReconciliationEngine {
    pub fn new(
        source_a: Arc<dyn InventorySource>,
        source_b: Arc<dyn InventorySource>,
        store: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            source_a,
            source_b,
            store,
            notifier: None,
            ignored_skus: HashSet::new(),
            run_slot: RunSlot::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_ignored_skus<I>(mut self, skus: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.ignored_skus = skus.into_iter().collect();
        self
    }

    pub fn is_running(&self) -> bool {
        self.run_slot.is_busy()
    }

    /// Fetch, compare and persist one report.
    ///
    /// Both sources are fetched concurrently and either failing aborts the
    /// run before anything is saved. A second call while one is in flight
    /// gets `RunInProgress`.
    pub async fn run_comparison(&self) -> AppResult<Report> {
        let _guard = self.run_slot.try_acquire()?;
        let started = Instant::now();
        info!("🔍 Starting inventory comparison");

        let (inventory_a, inventory_b) = tokio::try_join!(
            self.source_a.fetch_inventory(),
            self.source_b.fetch_inventory()
        )
        .map_err(|e| {
            error!("❌ Inventory comparison failed: {}", e);
            AppError::Fetch(e)
        })?;

        info!(
            "📊 {} items: {}, {} items: {}",
            inventory_a.source().display_name(),
            inventory_a.len(),
            inventory_b.source().display_name(),
            inventory_b.len()
        );

        let discrepancies = compute_discrepancies(&inventory_a, &inventory_b, &self.ignored_skus);
        info!("🔍 Found {} discrepancies", discrepancies.len());

        let new_report = NewReport::new(discrepancies, inventory_a.len(), inventory_b.len());
        let report = self.store.save(new_report).await.map_err(|e| {
            error!("❌ Failed to save report: {}", e);
            AppError::Persistence(e.to_string())
        })?;

        self.notify(&report).await;

        info!(
            "✅ Comparison {} finished in {:.1}s",
            report.id,
            started.elapsed().as_secs_f64()
        );
        Ok(report)
    }

    async fn notify(&self, report: &Report) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if report.discrepancies.is_empty() || !notifier.is_configured() {
            return;
        }

        if let Err(e) = notifier.notify(report, report.top(NOTIFICATION_LIMIT)).await {
            warn!("⚠️ Failed to send report notification: {}", e);
        }
    }
}
