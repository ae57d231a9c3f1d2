//! Transactions API endpoints

use api_types::transaction::{
    ImportResponse, TransactionCreated, TransactionList, TransactionListResponse,
    TransactionNew, TransactionView,
};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::SecondsFormat;
use engine::{Money, NewTransaction, Transaction, TransactionFilter};

use crate::{
    ServerError,
    server::{Owner, ServerState},
};

fn view(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        amount_minor: tx.amount.cents(),
        category: tx.category,
        description: tx.description,
        date: tx.date,
        created_at: tx.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

fn filter(query: TransactionList) -> TransactionFilter {
    TransactionFilter {
        from: query.from,
        to: query.to,
        category: query.category,
    }
}

pub async fn create(
    Extension(Owner(owner)): Extension<Owner>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let mut new = NewTransaction::new(owner, Money::new(payload.amount_minor), payload.category);
    if let Some(description) = payload.description {
        new = new.description(description);
    }
    if let Some(date) = payload.date {
        new = new.date(date);
    }

    let added = state.engine.add_transaction(new).await?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionCreated {
            transaction: view(added.transaction),
            budget_warning: added.budget_warning,
        }),
    ))
}

pub async fn list(
    Extension(Owner(owner)): Extension<Owner>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let transactions = state
        .engine
        .transactions(&owner, &filter(query))
        .await?
        .into_iter()
        .map(view)
        .collect();

    Ok(Json(TransactionListResponse { transactions }))
}

pub async fn import(
    Extension(Owner(owner)): Extension<Owner>,
    State(state): State<ServerState>,
    body: Bytes,
) -> Result<Json<ImportResponse>, ServerError> {
    let outcome = state.engine.import_csv(&owner, &body).await?;

    Ok(Json(ImportResponse {
        imported: outcome.imported.len(),
        skipped: outcome.skipped,
        warnings: outcome
            .imported
            .into_iter()
            .filter_map(|added| added.budget_warning)
            .collect(),
        errors: outcome.errors,
    }))
}

pub async fn export(
    Extension(Owner(owner)): Extension<Owner>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionList>,
) -> Result<impl IntoResponse, ServerError> {
    let data = state.engine.export_csv(&owner, &filter(query)).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        data,
    ))
}
