use crate::{Budget, NewBudget, ResultEngine, cache::CacheKey, util::normalize_required};

use super::Engine;

impl Engine {
    /// Create or replace the budget of `(owner, category)`.
    ///
    /// A second call for the same pair overwrites limit and period and keeps
    /// the existing id. Reports cached earlier keep their old limit until they
    /// expire.
    pub async fn set_budget(&self, budget: NewBudget) -> ResultEngine<Budget> {
        let budget = budget.normalized()?;
        let stored = self.budgets.upsert(&budget).await?;
        self.cache.invalidate_budgets(&stored.owner).await;

        tracing::info!(
            "budget for '{}' of owner {} set to {} ({})",
            stored.category,
            stored.owner,
            stored.limit,
            stored.period.as_str()
        );
        Ok(stored)
    }

    /// Owner's budgets ordered by category, read through the cache.
    pub async fn budgets(&self, owner: &str) -> ResultEngine<Vec<Budget>> {
        let owner = normalize_required(owner, "owner")?;
        let key = CacheKey::budgets(&owner);
        if let Some(cached) = self.cache.get::<Vec<Budget>>(&key).await {
            return Ok(cached);
        }

        let budgets = self.budgets.list(&owner).await?;
        self.cache.set(&key, &budgets).await;
        Ok(budgets)
    }
}
