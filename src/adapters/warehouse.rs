use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::traits::{ConnectionStatus, InventorySource};
use crate::config::{FetchConfig, WmsConfig};
use crate::error::{AppResult, FetchError};
use crate::fetch::client::log_source_config;
use crate::fetch::{fetch_all_pages, HttpSource, Page, PaginationConfig};
use crate::inventory::{quantity_from_value, NormalizedInventory, SourceId};

const API_KEY_HEADER: &str = "api-key";
const ITEM_SEARCH_ENDPOINT: &str = "item/search";
const WAREHOUSE_SEARCH_ENDPOINT: &str = "warehouse/search";

/// Item as returned by the warehouse item search. Fields stay loosely typed
/// so a number-typed SKU or a string quantity doesn't lose the row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WarehouseItem {
    #[serde(default)]
    sku: Option<Value>,
    #[serde(default)]
    item_description: Option<Value>,
    #[serde(default)]
    item_short_description: Option<Value>,
    #[serde(default)]
    available_quantity: Option<Value>,
    #[serde(default)]
    quantity_on_hand: Option<Value>,
}

impl WarehouseItem {
    fn sku(&self) -> Option<String> {
        match self.sku.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// `availableQuantity` unless it is missing or zero, then `quantityOnHand`
    fn quantity(&self) -> i64 {
        self.available_quantity
            .as_ref()
            .and_then(quantity_from_value)
            .filter(|q| *q != 0)
            .or_else(|| self.quantity_on_hand.as_ref().and_then(quantity_from_value))
            .unwrap_or(0)
    }

    fn name(&self) -> Option<&str> {
        self.item_description
            .as_ref()
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.item_short_description.as_ref().and_then(Value::as_str))
    }
}

/// Source B: warehouse-management system with offset pagination that only
/// signals the end with a short page
pub struct WarehouseAdapter {
    http: HttpSource,
    pagination: PaginationConfig,
    lob_id: String,
    configured: bool,
}

impl WarehouseAdapter {
    pub fn new(
        http: HttpSource,
        pagination: PaginationConfig,
        lob_id: impl Into<String>,
        configured: bool,
    ) -> Self {
        Self {
            http,
            pagination,
            lob_id: lob_id.into(),
            configured,
        }
    }

    pub fn from_config(config: &WmsConfig, fetch: &FetchConfig) -> AppResult<Self> {
        let base_url = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.api_version
        );

        log_source_config(SourceId::Wms, &base_url, &[("API Key", config.api_key.is_some())]);
        info!("   Line of business: {}", config.lob_id);

        let http = HttpSource::new(
            SourceId::Wms,
            base_url,
            &[(API_KEY_HEADER, config.api_key.as_deref().unwrap_or_default())],
            fetch.retry_policy(),
            fetch.timeout(),
        )?;

        let pagination = PaginationConfig {
            page_size: config.page_size,
            max_pages: config.max_pages,
            page_delay: Duration::from_millis(config.page_delay_ms),
        };

        Ok(Self::new(http, pagination, config.lob_id.clone(), config.is_configured()))
    }

    async fn fetch_items(&self) -> Result<Vec<WarehouseItem>, FetchError> {
        let http = &self.http;
        let filter = format!("lobId eq {}", self.lob_id);

        fetch_all_pages("warehouse items", &self.pagination, |request| {
            let query = vec![
                ("limit", request.limit.to_string()),
                ("offset", request.offset.to_string()),
                ("filter", filter.clone()),
            ];
            async move {
                let body = http.get_json(ITEM_SEARCH_ENDPOINT, &query).await?;
                let Value::Array(rows) = body else {
                    return Err(http.parse_error(ITEM_SEARCH_ENDPOINT, "expected an array of items"));
                };

                let items = rows
                    .into_iter()
                    .map(serde_json::from_value::<WarehouseItem>)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        http.parse_error(ITEM_SEARCH_ENDPOINT, format!("invalid item row: {}", e))
                    })?;
                Ok(Page::from_full_page_rule(items, request.limit))
            }
        })
        .await
    }
}

#[async_trait]
impl InventorySource for WarehouseAdapter {
    fn id(&self) -> SourceId {
        SourceId::Wms
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn test_connection(&self) -> ConnectionStatus {
        if !self.configured {
            return ConnectionStatus::failed("Warehouse API key is not configured");
        }

        match self
            .http
            .get_json(WAREHOUSE_SEARCH_ENDPOINT, &[("limit", "1".to_string())])
            .await
        {
            Ok(Value::Array(warehouses)) => ConnectionStatus::ok(format!(
                "Warehouse connection successful! Found {}.",
                if warehouses.is_empty() {
                    "empty warehouse list"
                } else {
                    "warehouses"
                }
            )),
            Ok(_) => ConnectionStatus::failed("Connected but received unexpected response format"),
            Err(e) => {
                warn!("❌ Warehouse connection test failed: {}", e);
                ConnectionStatus::from_error(&e)
            }
        }
    }

    async fn fetch_inventory(&self) -> Result<NormalizedInventory, FetchError> {
        if !self.configured {
            return Err(FetchError::MissingCredentials {
                source_id: SourceId::Wms,
            });
        }

        info!("📊 Fetching warehouse inventory...");
        let items = self.fetch_items().await?;
        info!("✅ Found {} warehouse items", items.len());

        let mut inventory = NormalizedInventory::new(SourceId::Wms);
        for item in &items {
            inventory.insert_raw(item.sku().as_deref(), item.name(), item.quantity());
        }

        if inventory.looks_like_internal_ids() {
            warn!("🚨 Warehouse SKUs are all short numbers - they may be item ids, not SKUs");
        }

        info!(
            "✅ Processed {} unique warehouse SKUs ({} skipped)",
            inventory.len(),
            inventory.dropped()
        );
        Ok(inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Backoff, RetryPolicy};
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer, page_size: usize) -> WarehouseAdapter {
        let http = HttpSource::new(
            SourceId::Wms,
            format!("{}/beta", server.uri()),
            &[(API_KEY_HEADER, "secret")],
            RetryPolicy::new(2, Backoff::None),
            Duration::from_secs(5),
        )
        .unwrap();

        WarehouseAdapter::new(
            http,
            PaginationConfig {
                page_size,
                max_pages: 20,
                page_delay: Duration::ZERO,
            },
            "7",
            true,
        )
    }

    #[tokio::test]
    async fn test_pages_until_short_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/beta/item/search"))
            .and(header(API_KEY_HEADER, "secret"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "2"))
            .and(query_param("filter", "lobId eq 7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "sku": "BT-1", "itemDescription": "Bath Towel", "availableQuantity": 4, "quantityOnHand": 9 },
                { "sku": "RK-9", "itemShortDescription": "Rack", "quantityOnHand": 3 }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/beta/item/search"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "sku": "", "itemDescription": "Blank" },
                { "sku": "NQ-1", "itemDescription": "No Quantity" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/beta/item/search"))
            .and(query_param("offset", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "sku": "LAST", "availableQuantity": -2 }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let inventory = adapter(&server, 2).fetch_inventory().await.unwrap();

        assert_eq!(inventory.len(), 4);
        assert_eq!(inventory.dropped(), 1);
        assert_eq!(inventory.quantity("BT-1"), 4);
        assert_eq!(inventory.quantity("RK-9"), 3);
        assert_eq!(inventory.quantity("NQ-1"), 0);
        assert_eq!(inventory.quantity("LAST"), 0);
        assert_eq!(inventory.get("RK-9").unwrap().product_name, "Rack");
        assert_eq!(inventory.get("LAST").unwrap().name(), None);
    }

    #[tokio::test]
    async fn test_non_array_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/beta/item/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "nope" })))
            .mount(&server)
            .await;

        let err = adapter(&server, 250).fetch_inventory().await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_forbidden_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let err = adapter(&server, 250).fetch_inventory().await.unwrap_err();
        assert!(err.is_auth_failure());
        assert_eq!(err.source_id(), SourceId::Wms);
    }

    #[tokio::test]
    async fn test_connection_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/beta/warehouse/search"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
            .mount(&server)
            .await;

        let status = adapter(&server, 250).test_connection().await;
        assert!(status.success);
        assert!(status.message.contains("warehouses"));
    }

    #[tokio::test]
    async fn test_connection_probe_rejects_unexpected_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/beta/warehouse/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&server)
            .await;

        let status = adapter(&server, 250).test_connection().await;
        assert!(!status.success);
    }

    #[test]
    fn test_item_quantity_precedence() {
        let item: WarehouseItem =
            serde_json::from_value(json!({ "sku": "A", "availableQuantity": 4, "quantityOnHand": 9 }))
                .unwrap();
        assert_eq!(item.quantity(), 4);

        // zero available falls through to on-hand
        let item: WarehouseItem =
            serde_json::from_value(json!({ "sku": "A", "availableQuantity": 0, "quantityOnHand": 5 }))
                .unwrap();
        assert_eq!(item.quantity(), 5);

        let item: WarehouseItem = serde_json::from_value(json!({ "sku": "A", "quantityOnHand": 5 })).unwrap();
        assert_eq!(item.quantity(), 5);

        let item: WarehouseItem = serde_json::from_value(json!({ "sku": "A", "availableQuantity": 0 })).unwrap();
        assert_eq!(item.quantity(), 0);
    }

    #[tokio::test]
    async fn test_loosely_typed_rows_keep_their_sku() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/beta/item/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "sku": "BT-1", "availableQuantity": 12.0 },
                { "sku": "RK-9", "quantityOnHand": "3" },
                { "sku": 4411, "availableQuantity": "n/a", "quantityOnHand": 2 }
            ])))
            .mount(&server)
            .await;

        let inventory = adapter(&server, 250).fetch_inventory().await.unwrap();

        assert_eq!(inventory.len(), 3);
        assert_eq!(inventory.dropped(), 0);
        assert_eq!(inventory.quantity("BT-1"), 12);
        assert_eq!(inventory.quantity("RK-9"), 3);
        assert_eq!(inventory.quantity("4411"), 2);
    }

    #[tokio::test]
    async fn test_non_object_row_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/beta/item/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "sku": "BT-1", "availableQuantity": 1 },
                "BT-2"
            ])))
            .mount(&server)
            .await;

        let err = adapter(&server, 250).fetch_inventory().await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }
}
