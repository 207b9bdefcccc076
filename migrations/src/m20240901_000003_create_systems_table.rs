use sea_orm_migration::prelude::*;

use super::m20240901_000002_create_robots_table::Robots;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240901_000003_create_systems_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Systems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Systems::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Systems::RobotId).uuid().not_null())
                    .col(ColumnDef::new(Systems::Name).string().not_null())
                    .col(ColumnDef::new(Systems::AssemblyUrl).text().null())
                    .col(ColumnDef::new(Systems::PartStudioUrls).json().not_null())
                    .col(ColumnDef::new(Systems::AccessKey).string().null())
                    .col(ColumnDef::new(Systems::SecretKey).string().null())
                    // Cached BOM snapshot, replaced wholesale on every import
                    .col(ColumnDef::new(Systems::BomData).json().not_null())
                    .col(
                        ColumnDef::new(Systems::BomUpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Systems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Systems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_systems_robot_id")
                            .from(Systems::Table, Systems::RobotId)
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
            .drop_table(Table::drop().table(Systems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Systems {
    Table,
    Id,
    RobotId,
    Name,
    AssemblyUrl,
    PartStudioUrls,
    AccessKey,
    SecretKey,
    BomData,
    BomUpdatedAt,
    CreatedAt,
    UpdatedAt,
}
