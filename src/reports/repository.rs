use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::error::AppResult;
use crate::reconciliation::models::{Discrepancy, NewReport, Report};

/// Durable home of reconciliation reports
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Short name shown in status output
    fn kind(&self) -> &'static str;

    /// Persist a finished run and return it with its assigned id
    async fn save(&self, report: NewReport) -> AppResult<Report>;

    /// Newest first
    async fn list_recent(&self, limit: i64) -> AppResult<Vec<Report>>;

    async fn get_latest(&self) -> AppResult<Option<Report>>;

    async fn get(&self, id: Uuid) -> AppResult<Option<Report>>;

    /// Returns whether a report was removed
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Debug, FromRow)]
struct ReportRow {
    id: Uuid,
    report_date: NaiveDate,
    created_at: DateTime<Utc>,
    total_discrepancies: i64,
    discrepancies: Json<Vec<Discrepancy>>,
    source_a_total_items: i64,
    source_b_total_items: i64,
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            date: row.report_date,
            created_at: row.created_at,
            total_discrepancies: row.total_discrepancies,
            discrepancies: row.discrepancies.0,
            source_a_total_items: row.source_a_total_items,
            source_b_total_items: row.source_b_total_items,
        }
    }
}

const REPORT_COLUMNS: &str = "id, report_date, created_at, total_discrepancies, discrepancies, \
                              source_a_total_items, source_b_total_items";

/// Postgres-backed store; discrepancies live in a JSONB column
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn save(&self, report: NewReport) -> AppResult<Report> {
        let total = report.total_discrepancies();
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            INSERT INTO inventory_reports
                (id, report_date, created_at, total_discrepancies, discrepancies,
                 source_a_total_items, source_b_total_items)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            REPORT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(report.date)
        .bind(report.created_at)
        .bind(total)
        .bind(Json(&report.discrepancies))
        .bind(report.source_a_total_items)
        .bind(report.source_b_total_items)
        .fetch_one(&self.pool)
        .await?;

        info!("💾 Report {} saved ({} discrepancies)", row.id, total);
        Ok(row.into())
    }

    async fn list_recent(&self, limit: i64) -> AppResult<Vec<Report>> {
        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            "SELECT {} FROM inventory_reports ORDER BY created_at DESC LIMIT $1",
            REPORT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Report::from).collect())
    }

    async fn get_latest(&self) -> AppResult<Option<Report>> {
        Ok(self.list_recent(1).await?.into_iter().next())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Report>> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            "SELECT {} FROM inventory_reports WHERE id = $1",
            REPORT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Report::from))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM inventory_reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
