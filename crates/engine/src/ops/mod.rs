use std::{fmt, sync::Arc, time::Duration};

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, ResultEngine,
    cache::LedgerCache,
    store::{BudgetStore, SqlStore, TransactionStore},
};

mod budgets;
mod csv;
mod locks;
mod reports;
mod transactions;

pub use self::csv::CsvImport;
pub use reports::{CategorySummary, Report};
pub use transactions::TransactionAdded;

use locks::KeyedLocks;

/// How the report aggregator computes per-category totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStrategy {
    /// One grouped aggregate query.
    #[default]
    Grouped,
    /// One concurrent worker per category.
    FanOut,
}

/// Tunables of the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSettings {
    pub report_strategy: ReportStrategy,
    /// Progress log period of the fan-out aggregator.
    pub heartbeat_interval: Duration,
    /// Percentage of a budget from which accepted transactions carry a
    /// warning.
    pub warning_threshold: f64,
    /// Serialize budget checks per `(owner, category)` inside this process.
    pub serialize_budget_checks: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            report_strategy: ReportStrategy::Grouped,
            heartbeat_interval: Duration::from_millis(400),
            warning_threshold: 80.0,
            serialize_budget_checks: true,
        }
    }
}

impl EngineSettings {
    fn validate(&self) -> ResultEngine<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(EngineError::Configuration(
                "heartbeat interval must be greater than zero".to_string(),
            ));
        }
        if !self.warning_threshold.is_finite()
            || self.warning_threshold <= 0.0
            || self.warning_threshold > 100.0
        {
            return Err(EngineError::Configuration(format!(
                "warning threshold must be within (0, 100], got {}",
                self.warning_threshold
            )));
        }
        Ok(())
    }
}

pub struct Engine {
    transactions: Arc<dyn TransactionStore>,
    budgets: Arc<dyn BudgetStore>,
    cache: LedgerCache,
    settings: EngineSettings,
    budget_locks: KeyedLocks,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("cache", &self.cache)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

#[derive(Default)]
pub struct EngineBuilder {
    transactions: Option<Arc<dyn TransactionStore>>,
    budgets: Option<Arc<dyn BudgetStore>>,
    cache: Option<LedgerCache>,
    settings: EngineSettings,
}

impl EngineBuilder {
    /// Pass the required database. Backs both stores.
    pub fn database(self, db: DatabaseConnection) -> EngineBuilder {
        let store = Arc::new(SqlStore::new(db));
        self.transaction_store(store.clone()).budget_store(store)
    }

    pub fn transaction_store(mut self, store: Arc<dyn TransactionStore>) -> EngineBuilder {
        self.transactions = Some(store);
        self
    }

    pub fn budget_store(mut self, store: Arc<dyn BudgetStore>) -> EngineBuilder {
        self.budgets = Some(store);
        self
    }

    /// Cache in front of reports and budget lists. Disabled when not set.
    pub fn cache(mut self, cache: LedgerCache) -> EngineBuilder {
        self.cache = Some(cache);
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> EngineBuilder {
        self.settings = settings;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        self.settings.validate()?;
        let transactions = self.transactions.ok_or_else(|| {
            EngineError::Configuration("transaction store is required".to_string())
        })?;
        let budgets = self
            .budgets
            .ok_or_else(|| EngineError::Configuration("budget store is required".to_string()))?;

        Ok(Engine {
            transactions,
            budgets,
            cache: self.cache.unwrap_or_default(),
            settings: self.settings,
            budget_locks: KeyedLocks::default(),
        })
    }
}
