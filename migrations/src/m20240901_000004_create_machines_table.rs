use sea_orm_migration::prelude::*;

use super::m20240901_000002_create_robots_table::Robots;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240901_000004_create_machines_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Machines::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Machines::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Machines::RobotId).uuid().not_null())
                    .col(ColumnDef::new(Machines::Name).string().not_null())
                    .col(
                        ColumnDef::new(Machines::OutputFormat)
                            .string_len(20)
                            .not_null()
                            .default("STEP"),
                    )
                    .col(ColumnDef::new(Machines::IconFile).string().null())
                    .col(
                        ColumnDef::new(Machines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Machines::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_machines_robot_id")
                            .from(Machines::Table, Machines::RobotId)
                            .to(Robots::Table, Robots::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Machines::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Machines {
    Table,
    Id,
    RobotId,
    Name,
    OutputFormat,
    IconFile,
    CreatedAt,
    UpdatedAt,
}
