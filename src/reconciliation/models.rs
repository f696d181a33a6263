use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One SKU whose quantity differs between the two sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub sku: String,
    pub product_name: String,
    pub source_a_quantity: i64,
    pub source_b_quantity: i64,
    /// `source_a_quantity - source_b_quantity`, never zero
    pub difference: i64,
    /// Relative to source B, one decimal place
    pub percentage_difference: Decimal,
}

impl Discrepancy {
    pub fn abs_difference(&self) -> i64 {
        self.difference.abs()
    }
}

/// Report assembled by the engine before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReport {
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub discrepancies: Vec<Discrepancy>,
    pub source_a_total_items: i64,
    pub source_b_total_items: i64,
}

impl NewReport {
    pub fn new(discrepancies: Vec<Discrepancy>, source_a_total_items: usize, source_b_total_items: usize) -> Self {
        let created_at = Utc::now();
        Self {
            date: created_at.date_naive(),
            created_at,
            discrepancies,
            source_a_total_items: source_a_total_items as i64,
            source_b_total_items: source_b_total_items as i64,
        }
    }

    pub fn total_discrepancies(&self) -> i64 {
        self.discrepancies.len() as i64
    }

    pub fn into_report(self, id: Uuid) -> Report {
        Report {
            id,
            date: self.date,
            created_at: self.created_at,
            total_discrepancies: self.total_discrepancies(),
            discrepancies: self.discrepancies,
            source_a_total_items: self.source_a_total_items,
            source_b_total_items: self.source_b_total_items,
        }
    }
}

/// Persisted outcome of one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub total_discrepancies: i64,
    /// Sorted by absolute difference, largest first
    pub discrepancies: Vec<Discrepancy>,
    pub source_a_total_items: i64,
    pub source_b_total_items: i64,
}

impl Report {
    /// Leading discrepancies in report order
    pub fn top(&self, n: usize) -> &[Discrepancy] {
        &self.discrepancies[..self.discrepancies.len().min(n)]
    }
}
