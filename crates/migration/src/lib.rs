pub use sea_orm_migration::prelude::*;

mod m20240301_000001_transactions;
mod m20240301_000002_budgets;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_transactions::Migration),
            Box::new(m20240301_000002_budgets::Migration),
        ]
    }
}
