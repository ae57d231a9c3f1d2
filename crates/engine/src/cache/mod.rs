//! Read-through cache for reports and budget lists.
//!
//! The cache sits on top of a [`KeyValueStore`] and is never authoritative:
//! every failure is logged and reported to the caller as a miss or a no-op,
//! and TTL expiry bounds how stale an entry can get.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::DateRange;

mod memory;

pub use memory::{MemoryStore, NoopStore};

const REPORT_PREFIX: &str = "report:summary";
const BUDGETS_PREFIX: &str = "budgets:all";

/// Errors surfaced by a key-value backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Backend is unavailable or timing out.
    #[error("cache backend failure: {message}")]
    Backend { message: String },
    /// Payload could not be encoded.
    #[error("cache serialisation failed: {message}")]
    Serialization { message: String },
}

impl CacheError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Byte-oriented key-value store with per-entry TTL.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Removes every key starting with `prefix`, returning how many went.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError>;
}

/// Independent TTLs for the two cached resource kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheSettings {
    pub report_ttl: Duration,
    pub budgets_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            report_ttl: Duration::from_secs(30),
            budgets_ttl: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Report of one owner over an exact date range.
    Report { owner: String, range: DateRange },
    /// Full budget list of one owner.
    Budgets { owner: String },
}

impl CacheKey {
    pub fn report(owner: &str, range: DateRange) -> Self {
        Self::Report {
            owner: owner.to_string(),
            range,
        }
    }

    pub fn budgets(owner: &str) -> Self {
        Self::Budgets {
            owner: owner.to_string(),
        }
    }

    /// Prefix shared by every report key of `owner`.
    pub fn report_prefix(owner: &str) -> String {
        format!("{REPORT_PREFIX}:{owner}:")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Report { owner, range } => write!(f, "{REPORT_PREFIX}:{owner}:{range}"),
            Self::Budgets { owner } => write!(f, "{BUDGETS_PREFIX}:{owner}"),
        }
    }
}

#[derive(Clone)]
pub struct LedgerCache {
    store: Arc<dyn KeyValueStore>,
    settings: CacheSettings,
}

impl fmt::Debug for LedgerCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerCache")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Default for LedgerCache {
    fn default() -> Self {
        Self::disabled()
    }
}

impl LedgerCache {
    pub fn new(store: Arc<dyn KeyValueStore>, settings: CacheSettings) -> Self {
        Self { store, settings }
    }

    pub fn in_memory(settings: CacheSettings) -> Self {
        Self::new(Arc::new(MemoryStore::new()), settings)
    }

    /// Cache that never hits.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopStore), CacheSettings::default())
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    fn ttl(&self, key: &CacheKey) -> Duration {
        match key {
            CacheKey::Report { .. } => self.settings.report_ttl,
            CacheKey::Budgets { .. } => self.settings.budgets_ttl,
        }
    }

    /// Cached value for `key`, or `None` on miss, backend failure or an
    /// undecodable payload.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = match self.store.get(&key.to_string()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!("cache miss key={key}");
                return None;
            }
            Err(err) => {
                tracing::warn!("cache read failed key={key}: {err}");
                return None;
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(value) => {
                tracing::debug!("cache hit key={key}");
                Some(value)
            }
            Err(err) => {
                tracing::warn!("discarding undecodable cache entry key={key}: {err}");
                None
            }
        }
    }

    /// Stores `value` under `key` with the TTL of its kind. Best-effort.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T) {
        let payload = match serde_json::to_vec(value) {
            Ok(payload) => payload,
            Err(err) => {
                let err = CacheError::Serialization {
                    message: err.to_string(),
                };
                tracing::warn!("cache write skipped key={key}: {err}");
                return;
            }
        };

        let ttl = self.ttl(key);
        match self.store.set(&key.to_string(), payload, ttl).await {
            Ok(()) => tracing::debug!("cache set key={key} ttl={ttl:?}"),
            Err(err) => tracing::warn!("cache write failed key={key}: {err}"),
        }
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        if let Err(err) = self.store.delete(&key.to_string()).await {
            tracing::warn!("cache invalidation failed key={key}: {err}");
        }
    }

    pub async fn invalidate_prefix(&self, prefix: &str) {
        match self.store.delete_prefix(prefix).await {
            Ok(removed) => tracing::debug!("cache invalidated prefix={prefix} removed={removed}"),
            Err(err) => tracing::warn!("cache invalidation failed prefix={prefix}: {err}"),
        }
    }

    /// Drops every cached report of `owner`.
    pub async fn invalidate_reports(&self, owner: &str) {
        self.invalidate_prefix(&CacheKey::report_prefix(owner)).await;
    }

    pub async fn invalidate_budgets(&self, owner: &str) {
        self.invalidate(&CacheKey::budgets(owner)).await;
    }
}
