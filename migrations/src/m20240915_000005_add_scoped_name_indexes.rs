use sea_orm_migration::prelude::*;

use super::m20240901_000002_create_robots_table::Robots;
use super::m20240901_000003_create_systems_table::Systems;
use super::m20240901_000004_create_machines_table::Machines;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Robot names are unique per team
        manager
            .create_index(
                Index::create()
                    .name("idx_robots_team_name")
                    .table(Robots::Table)
                    .col(Robots::TeamId)
                    .col(Robots::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // System names are unique per robot
        manager
            .create_index(
                Index::create()
                    .name("idx_systems_robot_name")
                    .table(Systems::Table)
                    .col(Systems::RobotId)
                    .col(Systems::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Machine names are unique per robot
        manager
            .create_index(
                Index::create()
                    .name("idx_machines_robot_name")
                    .table(Machines::Table)
                    .col(Machines::RobotId)
                    .col(Machines::Name)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_machines_robot_name")
                    .table(Machines::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_systems_robot_name")
                    .table(Systems::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_robots_team_name")
                    .table(Robots::Table)
                    .to_owned(),
            )
            .await
    }
}
