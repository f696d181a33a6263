use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::adapters::ConnectionStatus;
use crate::inventory::SourceId;
use crate::reconciliation::models::{Discrepancy, Report};

/// Discrepancies returned inline by a manual run
pub const SUMMARY_DISCREPANCY_LIMIT: usize = 50;
pub const DEFAULT_REPORT_LIMIT: i64 = 30;

// ========== REQUEST MODELS ==========

#[derive(Debug, Deserialize, Validate)]
pub struct ReportListQuery {
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SourceConfigStatus {
    pub source: SourceId,
    pub name: String,
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ConfigStatusResponse {
    pub sources: Vec<SourceConfigStatus>,
    pub email_configured: bool,
    pub report_store: String,
    pub run_in_progress: bool,
    /// Every source and the e-mail channel are configured
    pub overall_ready: bool,
}

/// Result of a manual comparison run
#[derive(Debug, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub report_id: Uuid,
    pub total_discrepancies: i64,
    pub discrepancies: Vec<Discrepancy>,
    pub source_a_items: i64,
    pub source_b_items: i64,
    pub message: String,
}

impl From<&Report> for ComparisonSummary {
    fn from(report: &Report) -> Self {
        Self {
            report_id: report.id,
            total_discrepancies: report.total_discrepancies,
            discrepancies: report.top(SUMMARY_DISCREPANCY_LIMIT).to_vec(),
            source_a_items: report.source_a_total_items,
            source_b_items: report.source_b_total_items,
            message: format!(
                "Inventory comparison completed with {} discrepancies",
                report.total_discrepancies
            ),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionTestResponse {
    pub source: SourceId,
    pub name: String,
    pub success: bool,
    pub message: String,
}

impl ConnectionTestResponse {
    pub fn new(source: SourceId, status: ConnectionStatus) -> Self {
        Self {
            source,
            name: source.display_name().to_string(),
            success: status.success,
            message: status.message,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionTestsResponse {
    pub all_successful: bool,
    pub results: Vec<ConnectionTestResponse>,
}

/// Report metadata without the discrepancy list
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: Uuid,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub total_discrepancies: i64,
    pub source_a_total_items: i64,
    pub source_b_total_items: i64,
}

impl From<&Report> for ReportSummary {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id,
            date: report.date,
            created_at: report.created_at,
            total_discrepancies: report.total_discrepancies,
            source_a_total_items: report.source_a_total_items,
            source_b_total_items: report.source_b_total_items,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportListResponse {
    pub count: usize,
    pub reports: Vec<ReportSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteReportResponse {
    pub id: Uuid,
    pub deleted: bool,
}
