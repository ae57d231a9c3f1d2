//! Spending reports over arbitrary date ranges.
//!
//! Totals come either from one grouped query or from a fan-out with one
//! worker per category. Both race the caller's [`RequestContext`], and the
//! fan-out never returns partial totals.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::mpsc,
    task::{JoinHandle, JoinSet},
};

use crate::{
    Budget, DateRange, EngineError, Money, RequestContext, ResultEngine, cache::CacheKey,
    util::normalize_required,
};

use super::{Engine, ReportStrategy};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub total: Money,
    pub budget_limit: Option<Money>,
    /// `total / budget_limit * 100`, present with a budget.
    pub budget_percentage: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Sorted by category ascending.
    pub categories: Vec<CategorySummary>,
    pub total: Money,
}

impl Report {
    fn assemble(mut totals: Vec<(String, Money)>, budgets: &[Budget]) -> ResultEngine<Self> {
        totals.sort_by(|(a, _), (b, _)| a.cmp(b));
        let limits: HashMap<&str, Money> = budgets
            .iter()
            .map(|budget| (budget.category.as_str(), budget.limit))
            .collect();

        let categories: Vec<CategorySummary> = totals
            .into_iter()
            .map(|(category, total)| {
                let budget_limit = limits.get(category.as_str()).copied();
                CategorySummary {
                    budget_percentage: budget_limit.map(|limit| total.percent_of(limit)),
                    budget_limit,
                    total,
                    category,
                }
            })
            .collect();
        let total = Money::checked_sum(categories.iter().map(|summary| summary.total))
            .ok_or_else(|| EngineError::Validation("report total is out of range".to_string()))?;

        Ok(Self { categories, total })
    }
}

/// Periodic progress log of a fan-out. Stops when dropped.
struct Heartbeat {
    task: JoinHandle<()>,
}

impl Heartbeat {
    fn start(owner: String, expected: usize, finished: Arc<AtomicUsize>, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                tracing::info!(
                    "report for owner {owner} in progress: {}/{expected} categories aggregated",
                    finished.load(Ordering::Relaxed)
                );
            }
        });
        Self { task }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Engine {
    /// Per-category spend of `owner` within `range`, with budget usage.
    ///
    /// Served from the cache when an entry for the exact range exists.
    /// Fails with [`EngineError::Cancelled`] or
    /// [`EngineError::DeadlineExceeded`] when `ctx` finishes first.
    pub async fn report(
        &self,
        ctx: &RequestContext,
        owner: &str,
        range: DateRange,
    ) -> ResultEngine<Report> {
        let owner = normalize_required(owner, "owner")?;
        let range = DateRange::new(range.from, range.to)?;
        ctx.check()?;

        let key = CacheKey::report(&owner, range);
        if let Some(report) = self.cache.get::<Report>(&key).await {
            return Ok(report);
        }

        let totals = match self.settings.report_strategy {
            ReportStrategy::Grouped => {
                ctx.run(self.transactions.sum_grouped_by_category(&owner, range))
                    .await?
            }
            ReportStrategy::FanOut => self.totals_fan_out(ctx, &owner, range).await?,
        };
        let budgets = ctx.run(self.budgets(&owner)).await?;

        let report = Report::assemble(totals, &budgets)?;
        self.cache.set(&key, &report).await;
        Ok(report)
    }

    async fn totals_fan_out(
        &self,
        ctx: &RequestContext,
        owner: &str,
        range: DateRange,
    ) -> ResultEngine<Vec<(String, Money)>> {
        let categories = ctx.run(self.transactions.categories(owner)).await?;
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let expected = categories.len();
        let finished = Arc::new(AtomicUsize::new(0));
        let _heartbeat = Heartbeat::start(
            owner.to_string(),
            expected,
            finished.clone(),
            self.settings.heartbeat_interval,
        );

        let (sender, mut receiver) = mpsc::channel(expected);
        let mut workers = JoinSet::new();
        for category in categories {
            let store = Arc::clone(&self.transactions);
            let sender = sender.clone();
            let owner = owner.to_string();
            workers.spawn(async move {
                let total = store.sum_by_category(&owner, &category, range).await;
                // A closed channel means the report was abandoned.
                let _ = sender.send((category, total)).await;
            });
        }
        // The channel closes once every worker has dropped its sender.
        drop(sender);

        let mut totals = Vec::with_capacity(expected);
        loop {
            tokio::select! {
                biased;
                reason = ctx.done() => {
                    workers.abort_all();
                    tracing::info!(
                        "report for owner {owner} abandoned after {}/{expected} categories: {reason}",
                        totals.len()
                    );
                    return Err(reason);
                }
                message = receiver.recv() => match message {
                    Some((category, Ok(total))) => {
                        finished.fetch_add(1, Ordering::Relaxed);
                        // Categories without spend in range stay out, as with the grouped query.
                        if total != Money::ZERO {
                            totals.push((category, total));
                        }
                    }
                    Some((category, Err(err))) => {
                        workers.abort_all();
                        tracing::error!("report worker for '{category}' failed: {err}");
                        return Err(err);
                    }
                    None => break,
                },
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                return Err(EngineError::Database(DbErr::Custom(format!(
                    "report worker failed: {err}"
                ))));
            }
        }

        totals.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(totals)
    }
}
