//! Transaction primitives.
//!
//! A `Transaction` is a single expense booked by an owner against a
//! category. Transactions are created once and never updated or deleted.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    util::{Validate, normalize_optional_text, normalize_required},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub owner: String,
    pub amount: Money,
    pub category: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A transaction as submitted by the boundary, before the engine assigns an
/// identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTransaction {
    pub owner: String,
    pub amount: Money,
    pub category: String,
    pub description: Option<String>,
    /// Defaults to today when absent.
    pub date: Option<NaiveDate>,
}

impl NewTransaction {
    #[must_use]
    pub fn new(owner: impl Into<String>, amount: Money, category: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            amount,
            category: category.into(),
            description: None,
            date: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

impl Validate for NewTransaction {
    fn validate(&self) -> ResultEngine<()> {
        if !self.amount.is_positive() {
            return Err(EngineError::validation("amount must be positive"));
        }
        normalize_required(&self.category, "category")?;
        normalize_required(&self.owner, "owner")?;
        Ok(())
    }
}

impl Transaction {
    /// Validates `new` and stamps identity, creation time and the default
    /// date.
    pub(crate) fn create(new: NewTransaction, today: NaiveDate) -> ResultEngine<Self> {
        new.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            owner: normalize_required(&new.owner, "owner")?,
            amount: new.amount,
            category: normalize_required(&new.category, "category")?,
            description: normalize_optional_text(new.description.as_deref()),
            date: new.date.unwrap_or(today),
            created_at: Utc::now(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: String,
    pub amount_minor: i64,
    pub category: String,
    pub description: Option<String>,
    pub date: Date,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id),
            owner_id: ActiveValue::Set(tx.owner.clone()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            category: ActiveValue::Set(tx.category.clone()),
            description: ActiveValue::Set(tx.description.clone()),
            date: ActiveValue::Set(tx.date),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl From<Model> for Transaction {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            owner: model.owner_id,
            amount: Money::new(model.amount_minor),
            category: model.category,
            description: model.description,
            date: model.date,
            created_at: model.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn rejects_non_positive_amount() {
        let zero = NewTransaction::new("u1", Money::ZERO, "food");
        assert!(matches!(zero.validate(), Err(EngineError::Validation(_))));
        let negative = NewTransaction::new("u1", Money::new(-50), "food");
        assert!(matches!(negative.validate(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn rejects_blank_category_and_owner() {
        let no_category = NewTransaction::new("u1", Money::new(100), "  ");
        assert!(no_category.validate().is_err());
        let no_owner = NewTransaction::new("", Money::new(100), "food");
        assert!(no_owner.validate().is_err());
    }

    #[test]
    fn create_assigns_identity_and_default_date() {
        let tx = Transaction::create(
            NewTransaction::new("u1", Money::new(10_050), "food").description("  "),
            today(),
        )
        .unwrap();
        assert_eq!(tx.date, today());
        assert_eq!(tx.description, None);
        assert_eq!(tx.category, "food");
        assert!(!tx.id.is_nil());
    }

    #[test]
    fn create_keeps_explicit_date_and_case() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let tx = Transaction::create(
            NewTransaction::new("u1", Money::new(1), "Food").date(date),
            today(),
        )
        .unwrap();
        assert_eq!(tx.date, date);
        assert_eq!(tx.category, "Food");
    }
}
