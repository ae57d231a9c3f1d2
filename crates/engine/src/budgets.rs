//! Spending budgets per owner and category.

use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    DateRange, EngineError, Money, ResultEngine,
    util::{Validate, normalize_required},
};

/// How long a budget window lasts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    #[default]
    Monthly,
    Weekly,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
        }
    }

    /// Window of this period that contains `date`.
    pub fn window(self, date: NaiveDate) -> DateRange {
        match self {
            Self::Monthly => DateRange::month_of(date),
            Self::Weekly => DateRange::iso_week_of(date),
        }
    }
}

/// Lenient conversion: anything other than `weekly` is monthly.
impl From<&str> for BudgetPeriod {
    fn from(value: &str) -> Self {
        match value.trim() {
            "weekly" => Self::Weekly,
            _ => Self::Monthly,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub owner: String,
    pub category: String,
    pub limit: Money,
    pub period: BudgetPeriod,
}

/// Budget to create or replace for `(owner, category)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBudget {
    pub owner: String,
    pub category: String,
    pub limit: Money,
    pub period: BudgetPeriod,
}

impl NewBudget {
    #[must_use]
    pub fn new(owner: impl Into<String>, category: impl Into<String>, limit: Money) -> Self {
        Self {
            owner: owner.into(),
            category: category.into(),
            limit,
            period: BudgetPeriod::default(),
        }
    }

    #[must_use]
    pub fn period(mut self, period: BudgetPeriod) -> Self {
        self.period = period;
        self
    }

    /// Trimmed copy, validated.
    pub(crate) fn normalized(&self) -> ResultEngine<Self> {
        self.validate()?;
        Ok(Self {
            owner: normalize_required(&self.owner, "owner")?,
            category: normalize_required(&self.category, "category")?,
            limit: self.limit,
            period: self.period,
        })
    }
}

impl Validate for NewBudget {
    fn validate(&self) -> ResultEngine<()> {
        if !self.limit.is_positive() {
            return Err(EngineError::validation("limit must be positive"));
        }
        normalize_required(&self.category, "category")?;
        normalize_required(&self.owner, "owner")?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: String,
    pub category: String,
    pub limit_minor: i64,
    pub period: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Budget {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            owner: model.owner_id,
            category: model.category,
            limit: Money::new(model.limit_minor),
            period: BudgetPeriod::from(model.period.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_period_defaults_to_monthly() {
        assert_eq!(BudgetPeriod::from("weekly"), BudgetPeriod::Weekly);
        assert_eq!(BudgetPeriod::from("monthly"), BudgetPeriod::Monthly);
        assert_eq!(BudgetPeriod::from(""), BudgetPeriod::Monthly);
        assert_eq!(BudgetPeriod::from("yearly"), BudgetPeriod::Monthly);
    }

    #[test]
    fn validates_limit_and_category() {
        assert!(NewBudget::new("u1", "food", Money::new(15_000)).validate().is_ok());
        assert!(NewBudget::new("u1", "food", Money::ZERO).validate().is_err());
        assert!(NewBudget::new("u1", "food", Money::new(-100)).validate().is_err());
        assert!(NewBudget::new("u1", "", Money::new(10_000)).validate().is_err());
        assert!(NewBudget::new("", "food", Money::new(10_000)).validate().is_err());
    }

    #[test]
    fn weekly_window_uses_iso_week() {
        let sunday = NaiveDate::from_ymd_opt(2024, 5, 19).unwrap();
        let window = BudgetPeriod::Weekly.window(sunday);
        assert_eq!(window.from, NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
    }
}
