//! Ephemeral service-discovery registry (spec.md §4.4), grounded on the
//! generic `register_item`/`get_registry` pair in `src/cache.py` of
//! `examples/original_source`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::error;

use chomp_common::{Ingester, Instance, Scope};

use crate::bus::CacheBus;
use crate::error::CacheError;

/// TTL for registry entries: 24h, refreshed on every registration so a
/// crashed worker's ingesters silently age out of discovery (spec.md §4.4).
const REGISTRY_TTL: Duration = Duration::from_secs(86_400);

pub struct RegistryService {
    bus: CacheBus,
}

impl RegistryService {
    pub fn new(bus: CacheBus) -> Self {
        RegistryService { bus }
    }

    /// Stores `data` both under its own key and folded into the aggregated
    /// `registry_type` map, matching `register_item`'s dual-write.
    pub async fn register_item<T: Serialize + DeserializeOwned + Clone>(
        &self,
        registry_type: &str,
        item_key: &str,
        data: &T,
    ) -> Result<(), CacheError> {
        let item_full_key = self.bus.registry_key(registry_type, item_key);
        if let Err(e) = self.bus.cache_raw_key(&item_full_key, data, REGISTRY_TTL).await {
            error!(registry_type, item_key, error = %e, "failed to register item");
            return Err(e);
        }

        let agg_key = self.bus.registry_key(registry_type, "all");
        let mut registry: BTreeMap<String, T> = self
            .bus
            .get_cache_raw_key(&agg_key)
            .await?
            .unwrap_or_default();
        registry.insert(item_key.to_string(), data.clone());
        self.bus.cache_raw_key(&agg_key, &registry, REGISTRY_TTL).await
    }

    pub async fn get_registry<T: DeserializeOwned>(
        &self,
        registry_type: &str,
    ) -> Result<BTreeMap<String, T>, CacheError> {
        let agg_key = self.bus.registry_key(registry_type, "all");
        Ok(self.bus.get_cache_raw_key(&agg_key).await?.unwrap_or_default())
    }

    pub async fn register_ingester(&self, ingester: &Ingester, _scope: Scope) -> Result<(), CacheError> {
        self.register_item("ingesters", &ingester.name, ingester).await
    }

    pub async fn register_instance(&self, instance: &Instance) -> Result<(), CacheError> {
        self.register_item("instances", &instance.uid, instance).await
    }

    pub async fn get_registered_ingesters(&self) -> Result<BTreeMap<String, Ingester>, CacheError> {
        self.get_registry("ingesters").await
    }

    pub async fn get_registered_instances(&self) -> Result<BTreeMap<String, Instance>, CacheError> {
        self.get_registry("instances").await
    }
}
