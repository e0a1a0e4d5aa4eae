//! Per-domain memory of which strategy works.
//!
//! The store owns every [`DomainRecord`]; callers only ever get clones.
//! Updates are read-modify-write against the backing [`KeyValueStore`], so
//! each domain has its own async lock to keep two extractions finishing out
//! of order from dropping each other's entries.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{DomainRecord, StorageConfig};
use crate::storage::{KeyValueStore, LocalStorage};

/// Durable per-domain strategy history.
pub struct PatternStore {
    backend: Arc<dyn KeyValueStore>,
    max_history: usize,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PatternStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, max_history: usize) -> Self {
        Self {
            backend,
            max_history,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// File-backed store under `config.root_dir`.
    pub fn open_local(config: &StorageConfig) -> Self {
        Self::new(
            Arc::new(LocalStorage::new(&config.root_dir)),
            config.max_history,
        )
    }

    /// Storage key for a domain.
    fn key(domain: &str) -> String {
        let safe: String = domain
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("patterns/{}", safe.trim_matches('.'))
    }

    async fn domain_lock(&self, domain: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(Self::key(domain)).or_default())
    }

    async fn load(&self, key: &str) -> Result<Option<DomainRecord>> {
        let value = match self.backend.get(key).await {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(None),
            Err(AppError::Json(e)) => {
                log::warn!("Discarding unparseable pattern record {}: {}", key, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        match serde_json::from_value(value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                log::warn!("Discarding unreadable pattern record {}: {}", key, e);
                Ok(None)
            }
        }
    }

    /// Drop the domain's lock entry once no other task holds or awaits it.
    async fn release_lock(&self, domain: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&Self::key(domain));
        }
    }

    async fn update(&self, domain: &str, apply: impl FnOnce(&mut DomainRecord)) -> Result<()> {
        let lock = self.domain_lock(domain).await;
        let result = {
            let _guard = lock.lock().await;
            self.apply_locked(domain, apply).await
        };
        self.release_lock(domain, lock).await;
        result
    }

    async fn apply_locked(&self, domain: &str, apply: impl FnOnce(&mut DomainRecord)) -> Result<()> {
        let key = Self::key(domain);
        let mut record = self.load(&key).await?.unwrap_or_default();
        apply(&mut record);
        self.backend.set(&key, serde_json::to_value(&record)?).await
    }

    /// Copy of the record for `domain`, if one exists.
    pub async fn get_record(&self, domain: &str) -> Result<Option<DomainRecord>> {
        self.load(&Self::key(domain)).await
    }

    /// The most recently successful strategy for `domain`.
    pub async fn get_best_strategy(&self, domain: &str) -> Result<Option<String>> {
        Ok(self
            .get_record(domain)
            .await?
            .and_then(|r| r.last_successful_strategy))
    }

    /// Append a success and make `strategy_name` the preferred strategy.
    pub async fn record_success(
        &self,
        domain: &str,
        strategy_name: &str,
        image_count: usize,
    ) -> Result<()> {
        log::debug!(
            "Recording success for {}: {} ({} images)",
            domain,
            strategy_name,
            image_count
        );
        let max = self.max_history;
        self.update(domain, |r| r.push_success(strategy_name, image_count, max))
            .await
    }

    /// Append a failure. Never changes the preferred strategy.
    pub async fn record_failure(&self, domain: &str, reason: &str) -> Result<()> {
        log::debug!("Recording failure for {}: {}", domain, reason);
        let max = self.max_history;
        self.update(domain, |r| r.push_failure(reason, max)).await
    }

    /// Drop everything remembered about `domain`.
    pub async fn forget(&self, domain: &str) -> Result<bool> {
        let lock = self.domain_lock(domain).await;
        let result = {
            let _guard = lock.lock().await;
            self.backend.remove(&Self::key(domain)).await
        };
        self.release_lock(domain, lock).await;
        result
    }
}
