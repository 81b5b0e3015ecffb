use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Scheduler::Table)
                    .if_not_exists()
                    .col(pk_auto(Scheduler::Id))
                    .col(string_len(Scheduler::Date, 8))
                    .col(text(Scheduler::Title))
                    .col(text(Scheduler::Comment).default(""))
                    .col(string_len(Scheduler::Repeat, 128).default(""))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Scheduler::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Scheduler {
    Table,
    Id,
    Date,
    Title,
    Comment,
    Repeat,
}
