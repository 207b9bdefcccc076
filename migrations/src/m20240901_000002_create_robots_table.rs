use sea_orm_migration::prelude::*;

use super::m20240901_000001_create_teams_table::Teams;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240901_000002_create_robots_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Robots::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Robots::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Robots::TeamId).uuid().not_null())
                    .col(ColumnDef::new(Robots::Name).string().not_null())
                    .col(ColumnDef::new(Robots::Year).integer().null())
                    .col(ColumnDef::new(Robots::ImageFile).string().null())
                    .col(
                        ColumnDef::new(Robots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Robots::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_robots_team_id")
                            .from(Robots::Table, Robots::TeamId)
                            .to(Teams::Table, Teams::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Robots::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Robots {
    Table,
    Id,
    TeamId,
    Name,
    Year,
    ImageFile,
    CreatedAt,
    UpdatedAt,
}
