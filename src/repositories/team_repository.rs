use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{machine, robot, system, team};
use crate::errors::ServiceError;
use crate::repositories::Repository;

use super::BaseRepository;

/// Repository for team accounts
#[derive(Debug, Clone)]
pub struct TeamRepository {
    base: BaseRepository,
}

impl TeamRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<team::Model>, ServiceError> {
        Ok(team::Entity::find_by_id(id).one(self.get_db()).await?)
    }

    pub async fn find_by_number(&self, team_number: i32) -> Result<Option<team::Model>, ServiceError> {
        Ok(team::Entity::find()
            .filter(team::Column::TeamNumber.eq(team_number))
            .one(self.get_db())
            .await?)
    }

    pub async fn exists(&self, team_number: i32) -> Result<bool, ServiceError> {
        let count = team::Entity::find()
            .filter(team::Column::TeamNumber.eq(team_number))
            .count(self.get_db())
            .await?;
        Ok(count > 0)
    }

    /// All teams ordered by team number
    pub async fn list(&self) -> Result<Vec<team::Model>, ServiceError> {
        Ok(team::Entity::find()
            .order_by_asc(team::Column::TeamNumber)
            .all(self.get_db())
            .await?)
    }

    pub async fn create(&self, model: team::ActiveModel) -> Result<team::Model, ServiceError> {
        model
            .insert(self.get_db())
            .await
            .map_err(|e| ServiceError::from_db_conflict(e, "team number is already registered"))
    }

    pub async fn update(&self, model: team::ActiveModel) -> Result<team::Model, ServiceError> {
        Ok(model.update(self.get_db()).await?)
    }

    /// Deletes a team together with its robots, systems and machines.
    pub async fn delete_cascade(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.get_db().begin().await?;

        let robot_ids: Vec<Uuid> = robot::Entity::find()
            .select_only()
            .column(robot::Column::Id)
            .filter(robot::Column::TeamId.eq(id))
            .into_tuple()
            .all(&txn)
            .await?;

        delete_robot_children(&txn, &robot_ids).await?;
        robot::Entity::delete_many()
            .filter(robot::Column::TeamId.eq(id))
            .exec(&txn)
            .await?;
        let result = team::Entity::delete_by_id(id).exec(&txn).await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Team {} not found", id)));
        }

        txn.commit().await?;
        Ok(())
    }
}

/// Removes the systems and machines hanging off the given robots.
pub(crate) async fn delete_robot_children<C>(conn: &C, robot_ids: &[Uuid]) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    if robot_ids.is_empty() {
        return Ok(());
    }

    system::Entity::delete_many()
        .filter(system::Column::RobotId.is_in(robot_ids.iter().copied()))
        .exec(conn)
        .await?;
    machine::Entity::delete_many()
        .filter(machine::Column::RobotId.is_in(robot_ids.iter().copied()))
        .exec(conn)
        .await?;
    Ok(())
}

impl Repository for TeamRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
