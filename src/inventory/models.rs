use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Identifies one of the external inventory systems being reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// Order-management platform (source A)
    Oms,
    /// Warehouse-management platform (source B)
    Wms,
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Oms => "oms",
            SourceId::Wms => "wms",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SourceId::Oms => "Order management",
            SourceId::Wms => "Warehouse management",
        }
    }

    pub fn all() -> Vec<SourceId> {
        vec![SourceId::Oms, SourceId::Wms]
    }

    pub fn parse(value: &str) -> Option<SourceId> {
        match value.trim().to_ascii_lowercase().as_str() {
            "oms" | "a" => Some(SourceId::Oms),
            "wms" | "b" => Some(SourceId::Wms),
            _ => None,
        }
    }
}

/// One SKU's stock as reported by a single source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub sku: String,
    /// Empty when the source carried no display name
    pub product_name: String,
    pub quantity: i64,
}

impl InventoryRecord {
    /// Build a record from raw source values.
    ///
    /// Returns `None` when the SKU is missing or blank after trimming.
    /// Negative quantities are clamped to zero.
    pub fn new(sku: Option<&str>, product_name: Option<&str>, quantity: i64) -> Option<Self> {
        let sku = sku.map(str::trim).filter(|s| !s.is_empty())?;

        let quantity = if quantity < 0 {
            warn!("⚠️ Negative quantity {} for SKU {}, clamping to 0", quantity, sku);
            0
        } else {
            quantity
        };

        Some(Self {
            sku: sku.to_string(),
            product_name: product_name.map(str::trim).unwrap_or_default().to_string(),
            quantity,
        })
    }

    pub fn name(&self) -> Option<&str> {
        if self.product_name.is_empty() {
            None
        } else {
            Some(&self.product_name)
        }
    }
}

/// Per-source mapping from SKU to record, rebuilt on every run.
///
/// Keys are exact, case-sensitive SKU strings. Records without a usable SKU
/// never enter the map; they only bump the drop counter.
#[derive(Debug, Clone)]
pub struct NormalizedInventory {
    source: SourceId,
    records: HashMap<String, InventoryRecord>,
    dropped: usize,
}

impl NormalizedInventory {
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            records: HashMap::new(),
            dropped: 0,
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Insert a record, silently replacing an earlier one with the same SKU
    pub fn insert(&mut self, record: InventoryRecord) -> Option<InventoryRecord> {
        self.records.insert(record.sku.clone(), record)
    }

    /// Normalize and insert raw values, counting a drop when the SKU is unusable
    pub fn insert_raw(
        &mut self,
        sku: Option<&str>,
        product_name: Option<&str>,
        quantity: i64,
    ) -> bool {
        match InventoryRecord::new(sku, product_name, quantity) {
            Some(record) => {
                self.insert(record);
                true
            }
            None => {
                self.record_drop();
                false
            }
        }
    }

    pub fn record_drop(&mut self) {
        self.dropped += 1;
    }

    pub fn get(&self, sku: &str) -> Option<&InventoryRecord> {
        self.records.get(sku)
    }

    pub fn quantity(&self, sku: &str) -> i64 {
        self.records.get(sku).map(|r| r.quantity).unwrap_or(0)
    }

    pub fn skus(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// True when every SKU is a short all-digit string, which usually means the
    /// source handed back internal identifiers instead of real SKUs
    pub fn looks_like_internal_ids(&self) -> bool {
        if self.records.is_empty() {
            return false;
        }

        let all_numeric = self
            .records
            .keys()
            .all(|sku| sku.chars().all(|c| c.is_ascii_digit()));
        let total_len: usize = self.records.keys().map(|sku| sku.len()).sum();
        let avg_len = total_len as f64 / self.records.len() as f64;

        all_numeric && avg_len < 6.0
    }
}

/// Read a stock count the way the remote APIs actually send it: integers,
/// floats (truncated) or numeric strings. Anything else is `None`.
pub fn quantity_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}
