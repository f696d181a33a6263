use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::adapters::traits::{ConnectionStatus, InventorySource};
use crate::error::{AppError, AppResult};
use crate::inventory::SourceId;

pub struct SourceRegistry {
    sources: HashMap<SourceId, Arc<dyn InventorySource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    pub fn register(&mut self, source: Arc<dyn InventorySource>) {
        info!("Registering inventory source: {}", source.id());
        self.sources.insert(source.id(), source);
    }

    pub fn get(&self, id: SourceId) -> Option<Arc<dyn InventorySource>> {
        self.sources.get(&id).cloned()
    }

    pub fn require(&self, id: SourceId) -> AppResult<Arc<dyn InventorySource>> {
        self.get(id)
            .ok_or_else(|| AppError::UnknownSource(id.to_string()))
    }

    /// Registered sources in `SourceId::all()` order
    pub fn ids(&self) -> Vec<SourceId> {
        SourceId::all()
            .into_iter()
            .filter(|id| self.sources.contains_key(id))
            .collect()
    }

    pub fn is_configured(&self, id: SourceId) -> bool {
        self.sources
            .get(&id)
            .map(|s| s.is_configured())
            .unwrap_or(false)
    }

    pub async fn test_connection(&self, id: SourceId) -> AppResult<ConnectionStatus> {
        let source = self.require(id)?;
        info!("🧪 Testing {} connection...", id.display_name());
        Ok(source.test_connection().await)
    }

    /// Probe every registered source concurrently
    pub async fn test_all(&self) -> Vec<(SourceId, ConnectionStatus)> {
        let ids = self.ids();
        let probes = ids.iter().filter_map(|id| self.get(*id)).map(|source| async move {
            let status = source.test_connection().await;
            (source.id(), status)
        });
        futures::future::join_all(probes).await
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::inventory::NormalizedInventory;
    use async_trait::async_trait;

    struct StubSource {
        id: SourceId,
        healthy: bool,
    }

    #[async_trait]
    impl InventorySource for StubSource {
        fn id(&self) -> SourceId {
            self.id
        }

        fn is_configured(&self) -> bool {
            self.healthy
        }

        async fn test_connection(&self) -> ConnectionStatus {
            if self.healthy {
                ConnectionStatus::ok("fine")
            } else {
                ConnectionStatus::failed("down")
            }
        }

        async fn fetch_inventory(&self) -> Result<NormalizedInventory, FetchError> {
            Ok(NormalizedInventory::new(self.id))
        }
    }

    fn registry() -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(StubSource { id: SourceId::Wms, healthy: false }));
        registry.register(Arc::new(StubSource { id: SourceId::Oms, healthy: true }));
        registry
    }

    #[tokio::test]
    async fn test_probes_all_sources_in_order() {
        let results = registry().test_all().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, SourceId::Oms);
        assert!(results[0].1.success);
        assert_eq!(results[1].0, SourceId::Wms);
        assert!(!results[1].1.success);
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let registry = SourceRegistry::new();
        let err = registry.test_connection(SourceId::Oms).await.unwrap_err();
        assert!(matches!(err, AppError::UnknownSource(_)));
        assert!(!registry.is_configured(SourceId::Oms));
    }

    #[test]
    fn test_configured_flags() {
        let registry = registry();
        assert!(registry.is_configured(SourceId::Oms));
        assert!(!registry.is_configured(SourceId::Wms));
    }
}
