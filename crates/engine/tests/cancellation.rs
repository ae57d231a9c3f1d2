use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use engine::{
    Budget, BudgetStore, DateRange, Engine, EngineError, EngineSettings, Money, NewBudget,
    ReportStrategy, RequestContext, ResultEngine, Transaction, TransactionFilter,
    TransactionStore,
};

/// Store whose per-category sums take `delay` each.
struct SlowStore {
    delay: Duration,
    categories: Vec<String>,
    completed: AtomicUsize,
}

impl SlowStore {
    fn new(delay: Duration, categories: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            delay,
            categories: categories.iter().map(ToString::to_string).collect(),
            completed: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TransactionStore for SlowStore {
    async fn create(&self, _tx: &Transaction) -> ResultEngine<()> {
        Ok(())
    }

    async fn list(&self, _owner: &str, _filter: &TransactionFilter) -> ResultEngine<Vec<Transaction>> {
        Ok(Vec::new())
    }

    async fn sum_by_category(
        &self,
        _owner: &str,
        _category: &str,
        _range: DateRange,
    ) -> ResultEngine<Money> {
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(Money::new(100))
    }

    async fn sum_grouped_by_category(
        &self,
        _owner: &str,
        _range: DateRange,
    ) -> ResultEngine<Vec<(String, Money)>> {
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .categories
            .iter()
            .map(|category| (category.clone(), Money::new(100)))
            .collect())
    }

    async fn categories(&self, _owner: &str) -> ResultEngine<Vec<String>> {
        Ok(self.categories.clone())
    }
}

struct NoBudgets;

#[async_trait]
impl BudgetStore for NoBudgets {
    async fn upsert(&self, budget: &NewBudget) -> ResultEngine<Budget> {
        Ok(Budget {
            id: Uuid::new_v4(),
            owner: budget.owner.clone(),
            category: budget.category.clone(),
            limit: budget.limit,
            period: budget.period,
        })
    }

    async fn list(&self, _owner: &str) -> ResultEngine<Vec<Budget>> {
        Ok(Vec::new())
    }

    async fn by_category(&self, _owner: &str, _category: &str) -> ResultEngine<Option<Budget>> {
        Ok(None)
    }
}

async fn engine_over(store: Arc<SlowStore>, strategy: ReportStrategy) -> Engine {
    Engine::builder()
        .transaction_store(store)
        .budget_store(Arc::new(NoBudgets))
        .settings(EngineSettings {
            report_strategy: strategy,
            heartbeat_interval: Duration::from_millis(100),
            ..EngineSettings::default()
        })
        .build()
        .await
        .unwrap()
}

fn march() -> DateRange {
    DateRange::month_of(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
}

#[tokio::test(start_paused = true)]
async fn fan_out_completes_with_all_categories() {
    let store = SlowStore::new(Duration::from_secs(1), &["rent", "food", "books"]);
    let engine = engine_over(store.clone(), ReportStrategy::FanOut).await;

    let report = engine
        .report(&RequestContext::background(), "u1", march())
        .await
        .unwrap();
    let categories: Vec<&str> = report
        .categories
        .iter()
        .map(|summary| summary.category.as_str())
        .collect();
    assert_eq!(categories, ["books", "food", "rent"]);
    assert_eq!(report.total, Money::new(300));
    assert_eq!(store.completed.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn fan_out_deadline_discards_partial_results() {
    let store = SlowStore::new(Duration::from_secs(10), &["food", "rent"]);
    let engine = engine_over(store.clone(), ReportStrategy::FanOut).await;

    let ctx = RequestContext::background().with_timeout(Duration::from_millis(50));
    let result = engine.report(&ctx, "u1", march()).await;
    assert_eq!(result, Err(EngineError::DeadlineExceeded));

    // Aborted workers never finish.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(store.completed.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn fan_out_cancellation_stops_workers() {
    let store = SlowStore::new(Duration::from_secs(10), &["food", "rent", "travel"]);
    let engine = engine_over(store.clone(), ReportStrategy::FanOut).await;

    let (ctx, handle) = RequestContext::background().cancellable();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    let result = engine.report(&ctx, "u1", march()).await;
    assert_eq!(result, Err(EngineError::Cancelled));
    canceller.await.unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(store.completed.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn grouped_strategy_honors_deadline() {
    let store = SlowStore::new(Duration::from_secs(10), &["food"]);
    let engine = engine_over(store.clone(), ReportStrategy::Grouped).await;

    let ctx = RequestContext::background().with_timeout(Duration::from_secs(1));
    let result = engine.report(&ctx, "u1", march()).await;
    assert_eq!(result, Err(EngineError::DeadlineExceeded));
}

#[tokio::test]
async fn already_cancelled_context_fails_fast() {
    let store = SlowStore::new(Duration::from_secs(10), &["food"]);
    let engine = engine_over(store.clone(), ReportStrategy::FanOut).await;

    let (ctx, handle) = RequestContext::background().cancellable();
    handle.cancel();
    let result = engine.report(&ctx, "u1", march()).await;
    assert_eq!(result, Err(EngineError::Cancelled));
    assert_eq!(store.completed.load(Ordering::SeqCst), 0);
}
