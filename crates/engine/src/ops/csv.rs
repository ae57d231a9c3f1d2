//! CSV import and export of transactions.
//!
//! Rows are `amount,category[,description[,date]]` with amounts in major
//! units (`45.00`) and ISO dates. A leading header row is optional on import
//! and always written on export.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, Money, NewTransaction, ResultEngine, store::TransactionFilter,
    util::normalize_required,
};

use super::{Engine, TransactionAdded, transactions::today};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Outcome of a CSV import.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvImport {
    pub imported: Vec<TransactionAdded>,
    /// Rows that were not stored.
    pub skipped: usize,
    /// One `row N: ...` message per problem, in row order.
    pub errors: Vec<String>,
}

#[derive(Serialize)]
struct ExportRow<'a> {
    amount: String,
    category: &'a str,
    description: &'a str,
    date: String,
}

/// First cell reads `amount`, or its Russian `сумма`, in any case.
fn is_header(record: &StringRecord) -> bool {
    record.get(0).is_some_and(|cell| {
        let cell = cell.to_lowercase();
        cell == "amount" || cell == "сумма"
    })
}

/// Parsed row, plus a note when the date had to be replaced.
fn parse_row(
    owner: &str,
    record: &StringRecord,
    today: NaiveDate,
) -> Result<(NewTransaction, Option<String>), String> {
    if record.len() < 2 {
        return Err("not enough columns".to_string());
    }
    let raw_amount = record.get(0).unwrap_or_default();
    let amount: Money = raw_amount
        .parse()
        .map_err(|_| format!("invalid amount '{raw_amount}'"))?;
    let category = record.get(1).unwrap_or_default();
    if category.is_empty() {
        return Err("empty category".to_string());
    }

    let mut new = NewTransaction::new(owner, amount, category);
    if let Some(description) = record.get(2).filter(|cell| !cell.is_empty()) {
        new = new.description(description);
    }

    let mut note = None;
    match record.get(3).filter(|cell| !cell.is_empty()) {
        Some(raw_date) => match NaiveDate::parse_from_str(raw_date, DATE_FORMAT) {
            Ok(date) => new = new.date(date),
            Err(_) => {
                note = Some(format!("invalid date '{raw_date}', using today"));
                new = new.date(today);
            }
        },
        None => new = new.date(today),
    }
    Ok((new, note))
}

impl Engine {
    /// Import transactions from CSV, one [`Engine::add_transaction`] per row.
    ///
    /// Bad rows and budget rejections are collected in
    /// [`CsvImport::errors`] without stopping the import. Only an unreadable
    /// stream fails the whole call.
    pub async fn import_csv(&self, owner: &str, data: &[u8]) -> ResultEngine<CsvImport> {
        let owner = normalize_required(owner, "owner")?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(EngineError::validation("csv data is required"));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(data);
        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| EngineError::validation(format!("failed to parse CSV: {err}")))?;

        let today = today();
        let mut outcome = CsvImport::default();
        for (index, record) in records.iter().enumerate() {
            let row = index + 1;
            if index == 0 && is_header(record) {
                continue;
            }

            let (new, note) = match parse_row(&owner, record, today) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    outcome.skipped += 1;
                    outcome.errors.push(format!("row {row}: {reason}"));
                    continue;
                }
            };
            if let Some(note) = note {
                outcome.errors.push(format!("row {row}: {note}"));
            }

            match self.add_transaction(new).await {
                Ok(added) => outcome.imported.push(added),
                Err(err @ (EngineError::Validation(_) | EngineError::BudgetExceeded { .. })) => {
                    outcome.skipped += 1;
                    outcome.errors.push(format!("row {row}: {err}"));
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            "csv import for owner {owner}: {} imported, {} skipped",
            outcome.imported.len(),
            outcome.skipped
        );
        Ok(outcome)
    }

    /// Export the owner's transactions as CSV in listing order.
    pub async fn export_csv(&self, owner: &str, filter: &TransactionFilter) -> ResultEngine<Vec<u8>> {
        let transactions = self.transactions(owner, filter).await?;

        let export_error = |err: csv::Error| {
            tracing::error!("failed to serialize export row: {err}");
            EngineError::validation(format!("failed to write CSV: {err}"))
        };

        let mut writer = Writer::from_writer(vec![]);
        if transactions.is_empty() {
            writer
                .write_record(["amount", "category", "description", "date"])
                .map_err(export_error)?;
        }
        for tx in &transactions {
            writer
                .serialize(ExportRow {
                    amount: tx.amount.to_string(),
                    category: &tx.category,
                    description: tx.description.as_deref().unwrap_or_default(),
                    date: tx.date.format(DATE_FORMAT).to_string(),
                })
                .map_err(export_error)?;
        }

        writer.into_inner().map_err(|err| {
            tracing::error!("failed to finalize export: {err}");
            EngineError::validation("failed to finalize CSV export")
        })
    }
}
