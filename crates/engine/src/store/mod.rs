//! Durable store ports.
//!
//! The engine talks to persistence only through these traits so tests and
//! alternative backends can stand in for the SQL adapter. The store is the
//! source of truth; every method may fail with [`EngineError::Database`].
//!
//! [`EngineError::Database`]: crate::EngineError::Database

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{Budget, DateRange, Money, NewBudget, ResultEngine, Transaction};

mod sql;

pub use sql::SqlStore;

/// Filters for listing transactions. Date bounds are inclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Exact, case-sensitive category match.
    pub category: Option<String>,
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create(&self, tx: &Transaction) -> ResultEngine<()>;

    /// Owner's transactions, newest date first.
    async fn list(&self, owner: &str, filter: &TransactionFilter) -> ResultEngine<Vec<Transaction>>;

    /// Sum of amounts for one category within `range`.
    async fn sum_by_category(
        &self,
        owner: &str,
        category: &str,
        range: DateRange,
    ) -> ResultEngine<Money>;

    /// Per-category sums within `range`, ordered by category.
    async fn sum_grouped_by_category(
        &self,
        owner: &str,
        range: DateRange,
    ) -> ResultEngine<Vec<(String, Money)>>;

    /// Distinct categories the owner has ever booked against.
    async fn categories(&self, owner: &str) -> ResultEngine<Vec<String>>;
}

#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Insert or replace the budget of `(owner, category)`, keeping the id of
    /// an existing row.
    async fn upsert(&self, budget: &NewBudget) -> ResultEngine<Budget>;

    /// Owner's budgets ordered by category ascending.
    async fn list(&self, owner: &str) -> ResultEngine<Vec<Budget>>;

    async fn by_category(&self, owner: &str, category: &str) -> ResultEngine<Option<Budget>>;
}
