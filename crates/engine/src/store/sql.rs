//! SQL adapter backed by sea-orm.
//!
//! Row reads and writes go through the entities; the aggregates are plain
//! `SUM` statements. Dates are stored as ISO `YYYY-MM-DD` text, so range
//! filters compare lexically in calendar order.

use async_trait::async_trait;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseConnection, DbBackend, QueryFilter, QueryOrder,
    QuerySelect, Statement, TransactionTrait, prelude::*, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::{
    Budget, DateRange, EngineError, Money, NewBudget, ResultEngine, Transaction, budgets,
    transactions,
};

use super::{BudgetStore, TransactionFilter, TransactionStore};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

const SUM_BY_CATEGORY: &str = "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
     FROM transactions \
     WHERE owner_id = ? AND category = ? AND date >= ? AND date <= ?";

const SUM_GROUPED: &str = "SELECT category, COALESCE(SUM(amount_minor), 0) AS total \
     FROM transactions \
     WHERE owner_id = ? AND date >= ? AND date <= ? \
     GROUP BY category \
     ORDER BY category ASC";

#[derive(Clone, Debug)]
pub struct SqlStore {
    database: DatabaseConnection,
}

impl SqlStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    fn backend(&self) -> DbBackend {
        self.database.get_database_backend()
    }
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionFilter) -> Self {
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::Date.lte(to));
        }
        if let Some(category) = &filter.category {
            self = self.filter(transactions::Column::Category.eq(category.as_str()));
        }
        self
    }
}

async fn find_budget<C: ConnectionTrait>(
    conn: &C,
    owner: &str,
    category: &str,
) -> ResultEngine<Option<Budget>> {
    let model = budgets::Entity::find()
        .filter(budgets::Column::OwnerId.eq(owner))
        .filter(budgets::Column::Category.eq(category))
        .one(conn)
        .await?;
    Ok(model.map(Budget::from))
}

#[async_trait]
impl TransactionStore for SqlStore {
    async fn create(&self, tx: &Transaction) -> ResultEngine<()> {
        transactions::Entity::insert(transactions::ActiveModel::from(tx))
            .exec_without_returning(&self.database)
            .await?;
        Ok(())
    }

    async fn list(&self, owner: &str, filter: &TransactionFilter) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::OwnerId.eq(owner))
            .apply_tx_filters(filter)
            .order_by_desc(transactions::Column::Date)
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Transaction::from).collect())
    }

    async fn sum_by_category(
        &self,
        owner: &str,
        category: &str,
        range: DateRange,
    ) -> ResultEngine<Money> {
        let stmt = Statement::from_sql_and_values(
            self.backend(),
            SUM_BY_CATEGORY.to_string(),
            vec![
                owner.into(),
                category.into(),
                range.from.into(),
                range.to.into(),
            ],
        );
        let sum: i64 = match self.database.query_one(stmt).await? {
            Some(row) => row.try_get("", "sum")?,
            None => 0,
        };
        Ok(Money::new(sum))
    }

    async fn sum_grouped_by_category(
        &self,
        owner: &str,
        range: DateRange,
    ) -> ResultEngine<Vec<(String, Money)>> {
        let stmt = Statement::from_sql_and_values(
            self.backend(),
            SUM_GROUPED.to_string(),
            vec![owner.into(), range.from.into(), range.to.into()],
        );
        let rows = self.database.query_all(stmt).await?;

        let mut totals = Vec::with_capacity(rows.len());
        for row in rows {
            let category: String = row.try_get("", "category")?;
            let total: i64 = row.try_get("", "total")?;
            totals.push((category, Money::new(total)));
        }
        Ok(totals)
    }

    async fn categories(&self, owner: &str) -> ResultEngine<Vec<String>> {
        let categories = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::Category)
            .distinct()
            .filter(transactions::Column::OwnerId.eq(owner))
            .order_by_asc(transactions::Column::Category)
            .into_tuple::<String>()
            .all(&self.database)
            .await?;
        Ok(categories)
    }
}

#[async_trait]
impl BudgetStore for SqlStore {
    async fn upsert(&self, budget: &NewBudget) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| {
            let active = budgets::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                owner_id: ActiveValue::Set(budget.owner.clone()),
                category: ActiveValue::Set(budget.category.clone()),
                limit_minor: ActiveValue::Set(budget.limit.cents()),
                period: ActiveValue::Set(budget.period.as_str().to_string()),
            };
            budgets::Entity::insert(active)
                .on_conflict(
                    OnConflict::columns([budgets::Column::OwnerId, budgets::Column::Category])
                        .update_columns([budgets::Column::LimitMinor, budgets::Column::Period])
                        .to_owned(),
                )
                .exec_without_returning(&db_tx)
                .await?;

            find_budget(&db_tx, &budget.owner, &budget.category)
                .await?
                .ok_or_else(|| {
                    EngineError::Database(DbErr::RecordNotFound(format!(
                        "budget '{}' missing after upsert",
                        budget.category
                    )))
                })
        })
    }

    async fn list(&self, owner: &str) -> ResultEngine<Vec<Budget>> {
        let models = budgets::Entity::find()
            .filter(budgets::Column::OwnerId.eq(owner))
            .order_by_asc(budgets::Column::Category)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Budget::from).collect())
    }

    async fn by_category(&self, owner: &str, category: &str) -> ResultEngine<Option<Budget>> {
        find_budget(&self.database, owner, category).await
    }
}
