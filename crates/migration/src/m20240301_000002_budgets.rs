use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Budgets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Budgets::OwnerId).string().not_null())
                    .col(ColumnDef::new(Budgets::Category).string().not_null())
                    .col(ColumnDef::new(Budgets::LimitMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Budgets::Period)
                            .string()
                            .not_null()
                            .default("monthly"),
                    )
                    .to_owned(),
            )
            .await?;

        // Upserts conflict on this index.
        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-owner_id-category-unique")
                    .table(Budgets::Table)
                    .col(Budgets::OwnerId)
                    .col(Budgets::Category)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Budgets {
    Table,
    Id,
    OwnerId,
    Category,
    LimitMinor,
    Period,
}
