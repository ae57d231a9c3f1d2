//! Date ranges and budget period windows.
//!
//! Dates are calendar dates in the owner's own calendar, so a window is a
//! pair of inclusive days.

use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Inclusive range of calendar days.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting `from > to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> ResultEngine<Self> {
        if from > to {
            return Err(EngineError::validation(format!(
                "invalid range: from {from} is after to {to}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Whole calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let from = date.with_day(1).unwrap_or(date);
        let to = from
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(date);
        Self { from, to }
    }

    /// ISO week containing `date`, Monday through Sunday.
    ///
    /// Sunday counts as the 7th day, so it closes the week that began on the
    /// preceding Monday.
    pub fn iso_week_of(date: NaiveDate) -> Self {
        let offset = u64::from(date.weekday().number_from_monday() - 1);
        let from = date.checked_sub_days(Days::new(offset)).unwrap_or(date);
        let to = from.checked_add_days(Days::new(6)).unwrap_or(date);
        Self { from, to }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.from.format("%F"), self.to.format("%F"))
    }
}
