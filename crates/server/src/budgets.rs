//! Budgets API endpoints

use api_types::budget::{BudgetListResponse, BudgetPeriod as ApiPeriod, BudgetSet, BudgetView};
use axum::{Extension, Json, extract::State};
use engine::{Budget, BudgetPeriod, Money, NewBudget};

use crate::{
    ServerError,
    server::{Owner, ServerState},
};

fn map_period(period: BudgetPeriod) -> ApiPeriod {
    match period {
        BudgetPeriod::Monthly => ApiPeriod::Monthly,
        BudgetPeriod::Weekly => ApiPeriod::Weekly,
    }
}

fn view(budget: Budget) -> BudgetView {
    BudgetView {
        id: budget.id,
        category: budget.category,
        limit_minor: budget.limit.cents(),
        period: map_period(budget.period),
    }
}

pub async fn set(
    Extension(Owner(owner)): Extension<Owner>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetSet>,
) -> Result<Json<BudgetView>, ServerError> {
    let period = match payload.period.unwrap_or_default() {
        ApiPeriod::Monthly => BudgetPeriod::Monthly,
        ApiPeriod::Weekly => BudgetPeriod::Weekly,
    };
    let budget = NewBudget::new(owner, payload.category, Money::new(payload.limit_minor))
        .period(period);

    let stored = state.engine.set_budget(budget).await?;
    Ok(Json(view(stored)))
}

pub async fn list(
    Extension(Owner(owner)): Extension<Owner>,
    State(state): State<ServerState>,
) -> Result<Json<BudgetListResponse>, ServerError> {
    let budgets = state
        .engine
        .budgets(&owner)
        .await?
        .into_iter()
        .map(view)
        .collect();

    Ok(Json(BudgetListResponse { budgets }))
}
