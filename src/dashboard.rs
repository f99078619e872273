use std::collections::HashMap;

use chrono::{DateTime, Duration, Local};
use futures::future::join_all;
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::Value;

use crate::models::Payload;
use crate::services::ServiceMap;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Payload,
    pub updated: DateTime<Local>,
}

/// Last successful update of each service. Entries never expire.
#[derive(Debug, Default)]
pub struct ServiceCache {
    entries: HashMap<String, CacheEntry>,
}

impl ServiceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&CacheEntry> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: String, entry: CacheEntry) {
        self.entries.insert(name, entry);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Human-readable description of when `updated` happened, relative to `now`.
pub fn friendly_age(updated: DateTime<Local>, now: DateTime<Local>) -> String {
    let today = now.date_naive();
    let day = updated.date_naive();

    if day == today {
        updated.format("today at %H:%M:%S").to_string()
    } else if day >= today - Duration::days(1) {
        "yesterday".to_string()
    } else if day >= today - Duration::days(7) {
        updated.format("on %A").to_string()
    } else {
        day.format("%Y-%m-%d").to_string()
    }
}

/// Polls services on demand and serves their last good data.
pub struct Dashboard {
    services: ServiceMap,
    cache: ServiceCache,
}

impl Dashboard {
    pub fn new(services: ServiceMap) -> Self {
        Self::with_cache(services, ServiceCache::new())
    }

    pub fn with_cache(services: ServiceMap, cache: ServiceCache) -> Self {
        Self { services, cache }
    }

    pub fn cache(&self) -> &ServiceCache {
        &self.cache
    }

    /// Update one service and return its cached data with a `last_updated` label.
    ///
    /// Returns an empty payload when the service is unknown or has never
    /// produced data.
    pub async fn update_service(&mut self, name: &str) -> Payload {
        match self.services.get(name) {
            Some(service) => {
                let data = service.update().await;
                let service_name = service.service_name().to_string();
                self.record(name, &service_name, data, Local::now());
            }
            None if self.cache.contains(name) => {
                warn!("Service not found: {name}, serving cached data");
            }
            None => warn!("Service not found: {name}"),
        }

        self.read(name, Local::now())
    }

    /// Update every configured service, fetching concurrently.
    pub async fn update_all(&mut self) -> IndexMap<String, Payload> {
        let updates = join_all(self.services.iter().map(|(name, service)| async move {
            (
                name.clone(),
                service.service_name().to_string(),
                service.update().await,
            )
        }))
        .await;

        let now = Local::now();
        updates
            .into_iter()
            .map(|(name, service_name, data)| {
                self.record(&name, &service_name, data, now);
                let payload = self.read(&name, now);
                (name, payload)
            })
            .collect()
    }

    fn record(&mut self, name: &str, service_name: &str, mut data: Payload, now: DateTime<Local>) {
        if data.is_empty() {
            warn!("No data received for service: {name}");
            return;
        }

        data.insert(
            "service_name".to_string(),
            Value::String(service_name.to_string()),
        );
        self.cache
            .insert(name.to_string(), CacheEntry { data, updated: now });
        debug!("Cached update for service: {name}");
    }

    fn read(&self, name: &str, now: DateTime<Local>) -> Payload {
        let Some(entry) = self.cache.get(name) else {
            return Payload::new();
        };

        let mut payload = entry.data.clone();
        payload.insert(
            "last_updated".to_string(),
            Value::String(friendly_age(entry.updated, now)),
        );
        payload
    }
}
