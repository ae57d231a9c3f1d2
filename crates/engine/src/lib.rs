//! Ledger engine: budget enforcement, period windows, spending reports and
//! the read-through cache in front of them.
//!
//! Everything goes through [`Engine`], built with [`Engine::builder`] on top
//! of a [`TransactionStore`] and a [`BudgetStore`] (usually one [`SqlStore`]).

pub use budgets::{Budget, BudgetPeriod, NewBudget};
pub use cache::{
    CacheError, CacheKey, CacheSettings, KeyValueStore, LedgerCache, MemoryStore, NoopStore,
};
pub use context::{CancelHandle, RequestContext};
pub use error::EngineError;
pub use money::Money;
pub use ops::{
    CategorySummary, CsvImport, Engine, EngineBuilder, EngineSettings, Report, ReportStrategy,
    TransactionAdded,
};
pub use period::DateRange;
pub use store::{BudgetStore, SqlStore, TransactionFilter, TransactionStore};
pub use transactions::{NewTransaction, Transaction};
pub use util::Validate;

pub mod budgets;
pub mod cache;
mod context;
mod error;
mod money;
mod ops;
mod period;
pub mod store;
pub mod transactions;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
