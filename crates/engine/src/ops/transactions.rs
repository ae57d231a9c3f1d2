use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, NewTransaction, ResultEngine, Transaction, store::TransactionFilter,
    util::normalize_required,
};

use super::Engine;

/// A stored transaction and the budget warning it triggered, if any.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionAdded {
    pub transaction: Transaction,
    pub budget_warning: Option<String>,
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl Engine {
    /// Record an expense after checking it against the budget of its
    /// category.
    ///
    /// Fails with [`EngineError::BudgetExceeded`] when the spend of the
    /// budget window would pass the limit; nothing is stored in that case.
    /// Above the warning threshold the transaction is stored and a warning is
    /// returned alongside it.
    pub async fn add_transaction(&self, new: NewTransaction) -> ResultEngine<TransactionAdded> {
        let tx = Transaction::create(new, today())?;

        let guard = if self.settings.serialize_budget_checks {
            Some(self.budget_locks.lock(&tx.owner, &tx.category).await)
        } else {
            None
        };
        let budget_warning = self.check_budget(&tx).await?;
        self.transactions.create(&tx).await?;
        drop(guard);

        self.cache.invalidate_reports(&tx.owner).await;

        if let Some(warning) = &budget_warning {
            tracing::info!(
                "transaction {} in '{}' for owner {}: {warning}",
                tx.id,
                tx.category,
                tx.owner
            );
        } else {
            tracing::debug!(
                "transaction {} stored in '{}' for owner {}",
                tx.id,
                tx.category,
                tx.owner
            );
        }

        Ok(TransactionAdded {
            transaction: tx,
            budget_warning,
        })
    }

    async fn check_budget(&self, tx: &Transaction) -> ResultEngine<Option<String>> {
        let Some(budget) = self.budgets.by_category(&tx.owner, &tx.category).await? else {
            return Ok(None);
        };

        let window = budget.period.window(tx.date);
        let spent = self
            .transactions
            .sum_by_category(&tx.owner, &tx.category, window)
            .await?;
        let new_total = spent
            .checked_add(tx.amount)
            .ok_or_else(|| EngineError::validation("amount overflows the category total"))?;
        let percentage = new_total.percent_of(budget.limit);

        if new_total > budget.limit {
            tracing::info!(
                "rejecting transaction in '{}' for owner {}: {new_total} over limit {} in {window}",
                tx.category,
                tx.owner,
                budget.limit
            );
            return Err(EngineError::BudgetExceeded {
                limit: budget.limit,
                new_total,
                percentage,
            });
        }

        if percentage >= self.settings.warning_threshold {
            return Ok(Some(format!(
                "Warning: {percentage:.1}% of budget used ({new_total}/{})",
                budget.limit
            )));
        }
        Ok(None)
    }

    /// Owner's transactions, newest first.
    pub async fn transactions(
        &self,
        owner: &str,
        filter: &TransactionFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let owner = normalize_required(owner, "owner")?;
        if let (Some(from), Some(to)) = (filter.from, filter.to)
            && from > to
        {
            return Err(EngineError::validation(format!(
                "invalid range: from {from} is after to {to}"
            )));
        }

        let filter = TransactionFilter {
            category: filter
                .category
                .as_deref()
                .map(str::trim)
                .filter(|category| !category.is_empty())
                .map(ToString::to_string),
            ..filter.clone()
        };
        self.transactions.list(&owner, &filter).await
    }
}
