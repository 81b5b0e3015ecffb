use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_scheduler_date")
                    .table(Scheduler::Table)
                    .col(Scheduler::Date)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_scheduler_date")
                    .table(Scheduler::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Scheduler {
    Table,
    Date,
}
