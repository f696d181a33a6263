use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::reconciliation::models::{NewReport, Report};
use crate::reports::repository::ReportStore;

/// Process-local store used when no database is configured
#[derive(Default)]
pub struct InMemoryReportStore {
    // insertion order, oldest first
    reports: RwLock<Vec<Report>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, report: NewReport) -> AppResult<Report> {
        let report = report.into_report(Uuid::new_v4());
        self.reports.write().push(report.clone());
        Ok(report)
    }

    async fn list_recent(&self, limit: i64) -> AppResult<Vec<Report>> {
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(self.reports.read().iter().rev().take(limit).cloned().collect())
    }

    async fn get_latest(&self) -> AppResult<Option<Report>> {
        Ok(self.reports.read().last().cloned())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Report>> {
        Ok(self.reports.read().iter().find(|r| r.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut reports = self.reports.write();
        let before = reports.len();
        reports.retain(|r| r.id != id);
        Ok(reports.len() < before)
    }
}
