//! JSON shapes of the HTTP boundary.
//!
//! Amounts travel as integer minor units (`amount_minor`), dates as
//! `YYYY-MM-DD`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod transaction {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub amount_minor: i64,
        pub category: String,
        pub description: Option<String>,
        /// Defaults to today when absent.
        pub date: Option<NaiveDate>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub from: Option<NaiveDate>,
        pub to: Option<NaiveDate>,
        pub category: Option<String>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub amount_minor: i64,
        pub category: String,
        pub description: Option<String>,
        pub date: NaiveDate,
        /// RFC3339 timestamp in UTC.
        pub created_at: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionCreated {
        pub transaction: TransactionView,
        pub budget_warning: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ImportResponse {
        pub imported: usize,
        pub skipped: usize,
        pub errors: Vec<String>,
        pub warnings: Vec<String>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum BudgetPeriod {
        Weekly,
        /// Also what any unrecognized period becomes.
        #[default]
        #[serde(other)]
        Monthly,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetSet {
        pub category: String,
        pub limit_minor: i64,
        /// Monthly when absent.
        pub period: Option<BudgetPeriod>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub category: String,
        pub limit_minor: i64,
        pub period: BudgetPeriod,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetListResponse {
        pub budgets: Vec<BudgetView>,
    }
}

pub mod report {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportGet {
        pub from: NaiveDate,
        pub to: NaiveDate,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct CategorySummary {
        pub category: String,
        pub total_minor: i64,
        pub budget_limit_minor: Option<i64>,
        pub budget_percentage: Option<f64>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct ReportView {
        pub from: NaiveDate,
        pub to: NaiveDate,
        pub categories: Vec<CategorySummary>,
        pub total_minor: i64,
    }
}

/// Body of every non-2xx response.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
