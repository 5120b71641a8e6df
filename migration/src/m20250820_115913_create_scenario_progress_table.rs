use crate::m20250819_215543_create_user_table::User;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScenarioProgress::Table)
                    .if_not_exists()
                    .col(uuid(ScenarioProgress::Id).primary_key())
                    .col(uuid(ScenarioProgress::UserId))
                    .col(string(ScenarioProgress::ScenarioId))
                    .col(string(ScenarioProgress::Status))
                    .col(double(ScenarioProgress::Progress))
                    .col(json(ScenarioProgress::CompletedStages))
                    .col(double_null(ScenarioProgress::Score))
                    .col(big_integer(ScenarioProgress::TimeSpent))
                    .col(string_null(ScenarioProgress::Feedback))
                    .col(timestamp_with_time_zone(ScenarioProgress::StartDate))
                    .col(timestamp_with_time_zone_null(
                        ScenarioProgress::CompletionDate,
                    ))
                    .col(timestamp_with_time_zone(ScenarioProgress::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scenario_progress_user_id")
                            .from(ScenarioProgress::Table, ScenarioProgress::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // one record per (user, scenario)
        manager
            .create_index(
                Index::create()
                    .name("idx_scenario_progress_user_scenario")
                    .table(ScenarioProgress::Table)
                    .col(ScenarioProgress::UserId)
                    .col(ScenarioProgress::ScenarioId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScenarioProgress::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ScenarioProgress {
    Table,
    Id,
    UserId,
    ScenarioId,
    Status,
    Progress,
    CompletedStages,
    Score,
    TimeSpent,
    Feedback,
    StartDate,
    CompletionDate,
    UpdatedAt,
}
