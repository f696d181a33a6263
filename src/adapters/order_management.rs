use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::traits::{ConnectionStatus, InventorySource};
use crate::config::{FetchConfig, OmsConfig};
use crate::error::{AppResult, FetchError};
use crate::fetch::client::log_source_config;
use crate::fetch::{fetch_all_pages, HttpSource, Page, PaginationConfig};
use crate::inventory::{quantity_from_value, NormalizedInventory, SourceId};

const APP_REF_HEADER: &str = "brightpearl-app-ref";
const STAFF_TOKEN_HEADER: &str = "brightpearl-staff-token";
const QUOTA_HEADER: &str = "brightpearl-requests-remaining";

const CATALOG_ENDPOINT: &str = "product-service/product-search";
const AVAILABILITY_ENDPOINT: &str = "warehouse-service/product-availability";
const STOCK_TRACKED_FILTER: &str = "stockTracked eq true";

/// Tuning for the two fetch phases
#[derive(Debug, Clone)]
pub struct OmsFetchSettings {
    pub catalog: PaginationConfig,
    /// Product ids per availability request
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl From<&OmsConfig> for OmsFetchSettings {
    fn from(config: &OmsConfig) -> Self {
        Self {
            catalog: PaginationConfig {
                page_size: config.page_size,
                max_pages: config.max_pages,
                page_delay: Duration::from_millis(config.page_delay_ms),
            },
            batch_size: config.availability_batch_size,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }
}

/// Position of each field inside a product-search result row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    product_id: usize,
    product_name: usize,
    sku: usize,
    stock_tracked: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            product_id: 0,
            product_name: 1,
            sku: 2,
            stock_tracked: 8,
        }
    }
}

impl ColumnLayout {
    /// Resolve positions from `metaData.columns` when the response carries it
    fn from_metadata(meta: Option<&Value>) -> Self {
        let mut layout = Self::default();
        let Some(columns) = meta.and_then(|m| m.get("columns")).and_then(Value::as_array) else {
            return layout;
        };

        for (index, column) in columns.iter().enumerate() {
            match column.get("name").and_then(Value::as_str) {
                Some("productId") => layout.product_id = index,
                Some("productName") => layout.product_name = index,
                Some("SKU") => layout.sku = index,
                Some("stockTracked") => layout.stock_tracked = index,
                _ => {}
            }
        }
        layout
    }
}

/// Catalog row after column extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CatalogProduct {
    id: Option<String>,
    name: Option<String>,
    sku: Option<String>,
    stock_tracked: bool,
}

impl CatalogProduct {
    fn from_row(row: &Value, layout: &ColumnLayout) -> Self {
        let Some(cells) = row.as_array() else {
            return Self::default();
        };

        Self {
            id: cells.get(layout.product_id).and_then(value_to_id),
            name: cells
                .get(layout.product_name)
                .and_then(Value::as_str)
                .map(str::to_string),
            sku: cells.get(layout.sku).and_then(Value::as_str).map(str::to_string),
            stock_tracked: cells
                .get(layout.stock_tracked)
                .map(is_truthy)
                .unwrap_or(false),
        }
    }

    fn is_reconcilable(&self) -> bool {
        self.id.is_some()
            && self.stock_tracked
            && self.sku.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
    }
}

/// Source A: order-management platform with a column-array product search and
/// a separate availability endpoint reporting stock per warehouse
pub struct OrderManagementAdapter {
    http: HttpSource,
    settings: OmsFetchSettings,
    configured: bool,
}

impl OrderManagementAdapter {
    pub fn new(http: HttpSource, settings: OmsFetchSettings, configured: bool) -> Self {
        Self {
            http,
            settings,
            configured,
        }
    }

    pub fn from_config(config: &OmsConfig, fetch: &FetchConfig) -> AppResult<Self> {
        let account = config.account.clone().unwrap_or_default();
        let base_url = format!("{}/{}", config.base_url.trim_end_matches('/'), account);

        log_source_config(
            SourceId::Oms,
            &base_url,
            &[
                ("Account", config.account.is_some()),
                ("App Ref", config.app_ref.is_some()),
                ("Staff Token", config.staff_token.is_some()),
            ],
        );

        let http = HttpSource::new(
            SourceId::Oms,
            base_url,
            &[
                (APP_REF_HEADER, config.app_ref.as_deref().unwrap_or_default()),
                (STAFF_TOKEN_HEADER, config.staff_token.as_deref().unwrap_or_default()),
            ],
            fetch.retry_policy(),
            fetch.timeout(),
        )?
        .with_quota_header(QUOTA_HEADER);

        Ok(Self::new(http, OmsFetchSettings::from(config), config.is_configured()))
    }

    /// Phase one: every stock-tracked product in the catalog
    async fn fetch_catalog(&self) -> Result<Vec<CatalogProduct>, FetchError> {
        let http = &self.http;
        fetch_all_pages("order-management products", &self.settings.catalog, |request| {
            let query = vec![
                ("pageSize", request.limit.to_string()),
                ("firstResult", (request.offset + 1).to_string()),
                ("filter", STOCK_TRACKED_FILTER.to_string()),
            ];
            async move {
                let body = http.get_json(CATALOG_ENDPOINT, &query).await?;
                parse_catalog_page(http, unwrap_response(body))
            }
        })
        .await
    }

    /// Phase two: available stock per product id, summed over warehouses.
    ///
    /// A failing batch is logged and skipped so the rest of the run can
    /// complete; its products end up with no entry here.
    async fn fetch_availability(&self, product_ids: &[String]) -> HashMap<String, i64> {
        let mut levels = HashMap::new();
        let batch_size = self.settings.batch_size.max(1);
        let total_batches = product_ids.len().div_ceil(batch_size);
        let mut failed_batches = 0;

        for (index, batch) in product_ids.chunks(batch_size).enumerate() {
            let batch_number = index + 1;
            info!(
                "📦 Fetching availability batch {}/{} ({} products)",
                batch_number,
                total_batches,
                batch.len()
            );

            let endpoint = format!("{}/{}", AVAILABILITY_ENDPOINT, batch.join(","));
            match self.http.get_json(&endpoint, &[]).await {
                Ok(body) => {
                    for (product_id, available) in parse_availability(&unwrap_response(body)) {
                        levels.insert(product_id, available);
                    }
                }
                Err(e) => {
                    failed_batches += 1;
                    warn!("⚠️ Failed to fetch availability for batch {}: {}", batch_number, e);
                }
            }

            if batch_number < total_batches && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }
        }

        info!(
            "✅ Availability resolved for {} products ({} failed batches)",
            levels.len(),
            failed_batches
        );
        levels
    }
}

#[async_trait]
impl InventorySource for OrderManagementAdapter {
    fn id(&self) -> SourceId {
        SourceId::Oms
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn test_connection(&self) -> ConnectionStatus {
        if !self.configured {
            return ConnectionStatus::failed("Order-management credentials are not configured");
        }

        match self
            .http
            .get_json(CATALOG_ENDPOINT, &[("pageSize", "1".to_string())])
            .await
        {
            Ok(body) => {
                let body = unwrap_response(body);
                if body.get("results").is_some() || body.get("metaData").is_some() {
                    let available = body
                        .pointer("/metaData/resultsAvailable")
                        .and_then(Value::as_i64)
                        .unwrap_or(0);
                    ConnectionStatus::ok(format!(
                        "Order-management connection successful! Found {} products available.",
                        available
                    ))
                } else {
                    ConnectionStatus::failed("Connected but received unexpected response format")
                }
            }
            Err(e) => {
                warn!("❌ Order-management connection test failed: {}", e);
                ConnectionStatus::from_error(&e)
            }
        }
    }

    async fn fetch_inventory(&self) -> Result<NormalizedInventory, FetchError> {
        if !self.configured {
            return Err(FetchError::MissingCredentials {
                source_id: SourceId::Oms,
            });
        }

        info!("🚀 Starting order-management inventory fetch...");
        let products = self.fetch_catalog().await?;
        let mut inventory = NormalizedInventory::new(SourceId::Oms);

        let (reconcilable, skipped): (Vec<_>, Vec<_>) =
            products.into_iter().partition(CatalogProduct::is_reconcilable);
        for _ in &skipped {
            inventory.record_drop();
        }
        info!(
            "✅ {} order-management products with SKUs, {} skipped",
            reconcilable.len(),
            skipped.len()
        );

        if reconcilable.is_empty() {
            warn!("⚠️ No products found in order management");
            return Ok(inventory);
        }

        let ids: Vec<String> = reconcilable.iter().filter_map(|p| p.id.clone()).collect();
        let levels = self.fetch_availability(&ids).await;

        for product in &reconcilable {
            let quantity = product
                .id
                .as_ref()
                .and_then(|id| levels.get(id))
                .copied()
                .unwrap_or(0);
            inventory.insert_raw(product.sku.as_deref(), product.name.as_deref(), quantity);
        }

        if inventory.looks_like_internal_ids() {
            warn!("🚨 Order-management SKUs are all short numbers - they may be product ids, not SKUs");
        }

        info!("✅ Processed {} order-management inventory items", inventory.len());
        Ok(inventory)
    }
}

/// Responses are usually wrapped as `{"response": ...}`
fn unwrap_response(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("response") => {
            map.remove("response").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn parse_catalog_page(http: &HttpSource, body: Value) -> Result<Page<CatalogProduct>, FetchError> {
    let layout = ColumnLayout::from_metadata(body.get("metaData"));
    let more_available = body
        .pointer("/metaData/morePagesAvailable")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let rows = match body.get("results") {
        None | Some(Value::Null) => return Ok(Page::new(Vec::new(), false)),
        Some(Value::Array(rows)) => rows,
        Some(_) => return Err(http.parse_error(CATALOG_ENDPOINT, "results is not an array")),
    };

    let products = rows
        .iter()
        .map(|row| CatalogProduct::from_row(row, &layout))
        .collect();
    Ok(Page::new(products, more_available))
}

/// Map of product id to total available stock.
///
/// Accepts `{ "results": { id: locations } }` or the id map directly, where
/// `locations` is either `{ "warehouses": { wh: stock } }` or `{ wh: stock }`
/// and each `stock` may carry `availableStock`.
fn parse_availability(body: &Value) -> Vec<(String, i64)> {
    let products = body.get("results").unwrap_or(body);
    let Some(products) = products.as_object() else {
        return Vec::new();
    };

    products
        .iter()
        .map(|(product_id, locations)| {
            let locations = locations.get("warehouses").unwrap_or(locations);
            let total = locations
                .as_object()
                .map(|by_location| {
                    by_location
                        .values()
                        .filter_map(|stock| stock.get("availableStock"))
                        .filter_map(quantity_from_value)
                        .sum()
                })
                .unwrap_or(0);
            (product_id.clone(), total)
        })
        .collect()
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Backoff, RetryPolicy};
    use serde_json::json;
    use wiremock::matchers::{header, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    fn row(id: i64, name: &str, sku: Option<&str>, tracked: bool) -> Value {
        json!([id, name, sku, null, null, null, null, null, tracked])
    }

    fn adapter(server: &MockServer, page_size: usize, batch_size: usize) -> OrderManagementAdapter {
        let http = HttpSource::new(
            SourceId::Oms,
            format!("{}/acct", server.uri()),
            &[(APP_REF_HEADER, "ref"), (STAFF_TOKEN_HEADER, "token")],
            RetryPolicy::new(2, Backoff::None),
            Duration::from_secs(5),
        )
        .unwrap();

        OrderManagementAdapter::new(
            http,
            OmsFetchSettings {
                catalog: PaginationConfig {
                    page_size,
                    max_pages: 10,
                    page_delay: Duration::ZERO,
                },
                batch_size,
                batch_delay: Duration::ZERO,
            },
            true,
        )
    }

    /// Sums two warehouses per product; requests naming `fail_id` get a 503
    struct AvailabilityResponder {
        fail_id: Option<&'static str>,
    }

    impl Respond for AvailabilityResponder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let ids: Vec<String> = request
                .url
                .path()
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .split(',')
                .map(str::to_string)
                .collect();

            if let Some(fail_id) = self.fail_id {
                if ids.iter().any(|id| id == fail_id) {
                    return ResponseTemplate::new(503);
                }
            }

            let mut results = serde_json::Map::new();
            for id in ids {
                results.insert(
                    id,
                    json!({ "2": { "availableStock": 3 }, "7": { "availableStock": 4 } }),
                );
            }
            ResponseTemplate::new(200).set_body_json(json!({ "response": { "results": results } }))
        }
    }

    #[tokio::test]
    async fn test_two_phase_fetch_filters_and_sums() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/acct/product-service/product-search"))
            .and(header(APP_REF_HEADER, "ref"))
            .and(header(STAFF_TOKEN_HEADER, "token"))
            .and(query_param("firstResult", "1"))
            .and(query_param("pageSize", "2"))
            .and(query_param("filter", STOCK_TRACKED_FILTER))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {
                    "results": [row(1, "Bath Towel", Some(" BT-1 "), true), row(2, "No Sku", None, true)],
                    "metaData": { "morePagesAvailable": true }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/acct/product-service/product-search"))
            .and(query_param("firstResult", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {
                    "results": [row(3, "Service Fee", Some("FEE"), false), row(4, "Rack", Some("RK-9"), true)],
                    "metaData": { "morePagesAvailable": false }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/acct/warehouse-service/product-availability/.+$"))
            .respond_with(AvailabilityResponder { fail_id: None })
            .expect(1)
            .mount(&server)
            .await;

        let inventory = adapter(&server, 2, 50).fetch_inventory().await.unwrap();

        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.dropped(), 2);
        assert_eq!(inventory.quantity("BT-1"), 7);
        assert_eq!(inventory.quantity("RK-9"), 7);
        assert_eq!(inventory.get("BT-1").unwrap().product_name, "Bath Towel");
        assert!(inventory.get("FEE").is_none());
    }

    #[tokio::test]
    async fn test_failed_availability_batch_defaults_to_zero() {
        let server = MockServer::start().await;

        let rows: Vec<Value> = (1..=200)
            .map(|id| row(id, "Towel", Some(format!("SKU-{}", id).as_str()), true))
            .collect();
        Mock::given(method("GET"))
            .and(path("/acct/product-service/product-search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": { "results": rows, "metaData": { "morePagesAvailable": false } }
            })))
            .mount(&server)
            .await;

        // second batch (ids 51..=100) keeps failing, three attempts
        Mock::given(method("GET"))
            .and(path_regex(r"^/acct/warehouse-service/product-availability/.+$"))
            .respond_with(AvailabilityResponder { fail_id: Some("75") })
            .expect(6)
            .mount(&server)
            .await;

        let inventory = adapter(&server, 500, 50).fetch_inventory().await.unwrap();

        assert_eq!(inventory.len(), 200);
        for id in 51..=100 {
            assert_eq!(inventory.quantity(&format!("SKU-{}", id)), 0);
        }
        assert_eq!(inventory.quantity("SKU-1"), 7);
        assert_eq!(inventory.quantity("SKU-101"), 7);
        assert_eq!(inventory.quantity("SKU-200"), 7);
    }

    #[tokio::test]
    async fn test_catalog_auth_failure_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .expect(1)
            .mount(&server)
            .await;

        let err = adapter(&server, 500, 50).fetch_inventory().await.unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_empty_catalog_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acct/product-service/product-search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": { "results": [], "metaData": { "morePagesAvailable": false } }
            })))
            .mount(&server)
            .await;

        let inventory = adapter(&server, 500, 50).fetch_inventory().await.unwrap();
        assert!(inventory.is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_adapter_refuses_to_fetch() {
        let server = MockServer::start().await;
        let mut adapter = adapter(&server, 500, 50);
        adapter.configured = false;

        let err = adapter.fetch_inventory().await.unwrap_err();
        assert_eq!(err, FetchError::MissingCredentials { source_id: SourceId::Oms });
        assert!(!adapter.test_connection().await.success);
    }

    #[tokio::test]
    async fn test_connection_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acct/product-service/product-search"))
            .and(query_param("pageSize", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": { "results": [], "metaData": { "resultsAvailable": 1234 } }
            })))
            .mount(&server)
            .await;

        let status = adapter(&server, 500, 50).test_connection().await;
        assert!(status.success);
        assert!(status.message.contains("1234"));
    }

    #[test]
    fn test_column_layout_from_metadata() {
        let meta = json!({
            "columns": [
                { "name": "SKU" },
                { "name": "productId" },
                { "name": "stockTracked" },
                { "name": "productName" }
            ]
        });
        let layout = ColumnLayout::from_metadata(Some(&meta));
        assert_eq!(
            layout,
            ColumnLayout { product_id: 1, product_name: 3, sku: 0, stock_tracked: 2 }
        );
        assert_eq!(ColumnLayout::from_metadata(None), ColumnLayout::default());
    }

    #[test]
    fn test_parse_availability_shapes() {
        let nested = json!({
            "1001": { "total": { "availableStock": 99 }, "warehouses": {
                "2": { "availableStock": 5 }, "3": { "availableStock": 2 }, "4": {}
            } }
        });
        assert_eq!(parse_availability(&nested), vec![("1001".to_string(), 7)]);

        let flat = json!({ "results": { "1002": { "2": { "availableStock": 1 } } } });
        assert_eq!(parse_availability(&flat), vec![("1002".to_string(), 1)]);

        assert!(parse_availability(&json!([])).is_empty());
    }

    #[test]
    fn test_parse_availability_accepts_float_and_string_stock() {
        let body = json!({ "1003": { "warehouses": {
            "2": { "availableStock": 5.0 }, "3": { "availableStock": "4" }
        } } });
        assert_eq!(parse_availability(&body), vec![("1003".to_string(), 9)]);
    }
}
