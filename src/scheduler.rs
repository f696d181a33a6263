// Daily comparison scheduler
//
// Runs one reconciliation per day at a fixed UTC hour. A run that finds
// another comparison in flight is skipped, not queued.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ScheduleConfig;
use crate::error::AppError;
use crate::reconciliation::ReconciliationEngine;

pub struct ComparisonScheduler {
    config: ScheduleConfig,
    engine: Arc<ReconciliationEngine>,
}

impl ComparisonScheduler {
    pub fn new(config: ScheduleConfig, engine: Arc<ReconciliationEngine>) -> Self {
        Self { config, engine }
    }

    /// Start the scheduler in the background
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run_daily().await })
    }

    async fn run_daily(&self) {
        loop {
            let now = Utc::now();
            let Some(next_execution) = calculate_next_daily_execution(now, self.config.hour_utc) else {
                error!("❌ Invalid schedule hour {}, scheduler stopped", self.config.hour_utc);
                return;
            };

            info!(
                "⏰ Next inventory comparison scheduled for: {} UTC",
                next_execution.format("%Y-%m-%d %H:%M:%S")
            );
            if let Ok(wait) = next_execution.signed_duration_since(now).to_std() {
                tokio::time::sleep(wait).await;
            }

            info!("🔄 Starting scheduled inventory comparison");
            match self.engine.run_comparison().await {
                Ok(report) => info!(
                    "✓ Scheduled comparison completed: {} discrepancies (report {})",
                    report.total_discrepancies, report.id
                ),
                Err(AppError::RunInProgress) => {
                    warn!("⏭️ Comparison already running, skipping scheduled run")
                }
                Err(e) => error!("❌ Scheduled comparison failed: {}", e),
            }
        }
    }
}

/// Next occurrence of `hour:00:00` UTC strictly after `now`
pub fn calculate_next_daily_execution(now: DateTime<Utc>, hour: u32) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(time));

    if today > now {
        Some(today)
    } else {
        Some(today + ChronoDuration::days(1))
    }
}
