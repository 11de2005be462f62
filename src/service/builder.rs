//! Statistics service builder with pluggable gateways

use super::metrics::ServiceMetrics;
use super::StatisticsService;
use crate::cache::CacheGateway;
use crate::error::{Error, Result};
use crate::registry::EntityRegistry;
use crate::storage::StorageGateway;
use std::sync::Arc;

/// Builder for wiring the service to its storage and cache backends
pub struct StatisticsServiceBuilder {
    storage: Option<Arc<dyn StorageGateway>>,
    cache: Option<Arc<dyn CacheGateway>>,
}

impl StatisticsServiceBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            storage: None,
            cache: None,
        }
    }

    /// Set the storage gateway
    pub fn with_storage<S>(mut self, storage: S) -> Self
    where
        S: StorageGateway + 'static,
    {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Set a storage gateway that is already shared
    pub fn with_shared_storage(mut self, storage: Arc<dyn StorageGateway>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the cache gateway
    pub fn with_cache<C>(mut self, cache: C) -> Self
    where
        C: CacheGateway + 'static,
    {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Set a cache gateway that is already shared
    pub fn with_shared_cache(mut self, cache: Arc<dyn CacheGateway>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the service, loading the registry from storage
    pub async fn build(self) -> Result<StatisticsService> {
        let storage = self
            .storage
            .ok_or_else(|| Error::Configuration("No storage gateway configured".to_string()))?;

        let cache = self
            .cache
            .ok_or_else(|| Error::Configuration("No cache gateway configured".to_string()))?;

        let registry = EntityRegistry::load(storage.as_ref()).await?;

        Ok(StatisticsService {
            registry,
            storage,
            cache,
            metrics: ServiceMetrics::new(),
        })
    }
}

impl Default for StatisticsServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
