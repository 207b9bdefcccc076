use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::part::Part;

/// A robot subsystem backed by an Onshape assembly.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "systems")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub robot_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub assembly_url: Option<String>,
    /// JSON array of part studio URLs
    pub part_studio_urls: Json,
    #[serde(skip_serializing)]
    pub access_key: Option<String>,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    /// JSON array of [`Part`] records from the last import or save
    pub bom_data: Json,
    pub bom_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.access_key) && present(&self.secret_key)
    }

    /// Part studio URLs; malformed stored values read as an empty list.
    pub fn part_studios(&self) -> Vec<String> {
        serde_json::from_value(self.part_studio_urls.clone()).unwrap_or_default()
    }

    /// The cached BOM; malformed stored values read as an empty list.
    pub fn parts(&self) -> Vec<Part> {
        serde_json::from_value(self.bom_data.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::robot::Entity",
        from = "Column::RobotId",
        to = "super::robot::Column::Id",
        on_delete = "Cascade"
    )]
    Robot,
}

impl Related<super::robot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Robot.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}
