//! Reports API endpoint

use api_types::report::{CategorySummary, ReportGet, ReportView};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::{DateRange, RequestContext};

use crate::{
    ServerError,
    server::{Owner, ServerState},
};

/// Spending report for `[from, to]`, cut off after the configured timeout.
pub async fn get(
    Extension(Owner(owner)): Extension<Owner>,
    State(state): State<ServerState>,
    Query(query): Query<ReportGet>,
) -> Result<Json<ReportView>, ServerError> {
    let range = DateRange::new(query.from, query.to)?;
    let ctx = RequestContext::background().with_timeout(state.report_timeout);

    let report = state.engine.report(&ctx, &owner, range).await?;
    Ok(Json(ReportView {
        from: range.from,
        to: range.to,
        categories: report
            .categories
            .into_iter()
            .map(|summary| CategorySummary {
                category: summary.category,
                total_minor: summary.total.cents(),
                budget_limit_minor: summary.budget_limit.map(|limit| limit.cents()),
                budget_percentage: summary.budget_percentage,
            })
            .collect(),
        total_minor: report.total.cents(),
    }))
}
