//! Site-wide dump and restore of BOM snapshots and system settings.
//!
//! Both dictionaries are keyed team number → robot name → system name, which
//! is the layout the per-team `bom.json` exports used before the database.

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{robot, system, team};
use crate::errors::ServiceError;
use crate::models::Part;
use crate::repositories::{RobotRepository, SystemRepository, TeamRepository};

/// robot name → system name → value
pub type RobotMap<T> = BTreeMap<String, BTreeMap<String, T>>;
/// team number → robot name → system name → parts
pub type BomDict = BTreeMap<String, RobotMap<Vec<Part>>>;
/// team number → robot name → system name → settings
pub type SettingsDict = BTreeMap<String, RobotMap<SystemSettings>>;

/// Onshape connection settings of one system, including its keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SystemSettings {
    #[serde(default)]
    pub assembly_url: Option<String>,
    #[serde(default)]
    pub part_studio_urls: Vec<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl From<&system::Model> for SystemSettings {
    fn from(model: &system::Model) -> Self {
        Self {
            assembly_url: model.assembly_url.clone(),
            part_studio_urls: model.part_studios(),
            access_key: model.access_key.clone(),
            secret_key: model.secret_key.clone(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RestoreReport {
    pub teams_updated: usize,
    pub robots_created: usize,
    pub systems_created: usize,
    pub systems_updated: usize,
    /// Keys that did not match a registered team
    pub skipped_teams: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamSummary {
    pub id: Uuid,
    pub name: String,
    pub team_number: i32,
    pub robot_count: u64,
}

/// Rejects the whole upload before any write if a robot or system name is invalid.
fn validate_names<T>(dict: &BTreeMap<String, RobotMap<T>>) -> Result<(), ServiceError> {
    for robots in dict.values() {
        for (robot_name, systems) in robots {
            let names = std::iter::once(robot_name).chain(systems.keys());
            if let Some(bad) = names.into_iter().find(|n| super::validate_name(n).is_err()) {
                return Err(ServiceError::ValidationError(format!(
                    "invalid robot or system name {bad:?}"
                )));
            }
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct AdminService {
    db: Arc<DatabaseConnection>,
    teams: TeamRepository,
    robots: RobotRepository,
    systems: SystemRepository,
}

impl AdminService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            teams: TeamRepository::new(db.clone()),
            robots: RobotRepository::new(db.clone()),
            systems: SystemRepository::new(db.clone()),
            db,
        }
    }

    pub async fn list_teams(&self) -> Result<Vec<TeamSummary>, ServiceError> {
        let mut summaries = Vec::new();
        for team in self.teams.list().await? {
            let robot_count = self.robots.count_by_team(team.id).await?;
            summaries.push(TeamSummary {
                id: team.id,
                name: team.name,
                team_number: team.team_number,
                robot_count,
            });
        }
        Ok(summaries)
    }

    /// Walks every robot and system of a team.
    async fn collect<T>(
        &self,
        team: &team::Model,
        extract: impl Fn(&system::Model) -> T,
    ) -> Result<RobotMap<T>, ServiceError> {
        let mut robots = RobotMap::new();
        for robot in self.robots.list_by_team(team.id).await? {
            let systems = self
                .systems
                .list_by_robot(robot.id)
                .await?
                .iter()
                .map(|s| (s.name.clone(), extract(s)))
                .collect();
            robots.insert(robot.name, systems);
        }
        Ok(robots)
    }

    pub async fn bom_dict(&self) -> Result<BomDict, ServiceError> {
        let mut dict = BomDict::new();
        for team in self.teams.list().await? {
            let robots = self.collect(&team, system::Model::parts).await?;
            dict.insert(team.team_number.to_string(), robots);
        }
        Ok(dict)
    }

    pub async fn team_bom(&self, team_number: i32) -> Result<RobotMap<Vec<Part>>, ServiceError> {
        let team = self
            .teams
            .find_by_number(team_number)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Team {} not found", team_number)))?;
        self.collect(&team, system::Model::parts).await
    }

    pub async fn settings_dict(&self) -> Result<SettingsDict, ServiceError> {
        let mut dict = SettingsDict::new();
        for team in self.teams.list().await? {
            let robots = self.collect(&team, |s| SystemSettings::from(s)).await?;
            dict.insert(team.team_number.to_string(), robots);
        }
        Ok(dict)
    }

    #[instrument(skip(self, dict), fields(teams = dict.len()))]
    pub async fn restore_bom_dict(&self, dict: BomDict) -> Result<RestoreReport, ServiceError> {
        let report = self
            .restore(dict, |system, parts: Vec<Part>| {
                let mut active = system.into_active_model();
                active.bom_data = Set(serde_json::to_value(&parts)?);
                active.bom_updated_at = Set(Some(chrono::Utc::now()));
                Ok(active)
            })
            .await?;
        info!(?report, "BOM dictionary restored");
        Ok(report)
    }

    #[instrument(skip(self, dict), fields(teams = dict.len()))]
    pub async fn restore_settings_dict(
        &self,
        dict: SettingsDict,
    ) -> Result<RestoreReport, ServiceError> {
        let report = self
            .restore(dict, |system, settings: SystemSettings| {
                let mut active = system.into_active_model();
                active.assembly_url = Set(super::non_blank(settings.assembly_url));
                active.part_studio_urls = Set(json!(settings.part_studio_urls));
                active.access_key = Set(super::non_blank(settings.access_key));
                active.secret_key = Set(super::non_blank(settings.secret_key));
                Ok(active)
            })
            .await?;
        info!(?report, "settings dictionary restored");
        Ok(report)
    }

    /// Applies `apply` to every system named in `dict`, creating robots and
    /// systems that do not exist yet. All writes share one transaction.
    async fn restore<T>(
        &self,
        dict: BTreeMap<String, RobotMap<T>>,
        apply: impl Fn(system::Model, T) -> Result<system::ActiveModel, ServiceError>,
    ) -> Result<RestoreReport, ServiceError> {
        validate_names(&dict)?;
        let mut report = RestoreReport::default();
        let txn = self.db.begin().await?;

        for (team_key, robots) in dict {
            let team = match team_key.trim().parse::<i32>() {
                Ok(number) => {
                    team::Entity::find()
                        .filter(team::Column::TeamNumber.eq(number))
                        .one(&txn)
                        .await?
                }
                Err(_) => None,
            };
            let Some(team) = team else {
                warn!(team = %team_key, "skipping unknown team");
                report.skipped_teams.push(team_key);
                continue;
            };
            report.teams_updated += 1;

            for (robot_name, systems) in robots {
                let robot = robot_named(&txn, &team, &robot_name, &mut report).await?;
                for (system_name, value) in systems {
                    let (system, created) = system_named(&txn, &robot, &system_name).await?;
                    if created {
                        report.systems_created += 1;
                    } else {
                        report.systems_updated += 1;
                    }
                    apply(system, value)?.update(&txn).await?;
                }
            }
        }

        txn.commit().await?;
        Ok(report)
    }
}

async fn robot_named<C: ConnectionTrait>(
    conn: &C,
    team: &team::Model,
    name: &str,
    report: &mut RestoreReport,
) -> Result<robot::Model, ServiceError> {
    let name = name.trim();
    let existing = robot::Entity::find()
        .filter(robot::Column::TeamId.eq(team.id))
        .filter(robot::Column::Name.eq(name))
        .one(conn)
        .await?;
    if let Some(existing) = existing {
        return Ok(existing);
    }
    report.robots_created += 1;
    let created = robot::ActiveModel {
        id: Set(Uuid::new_v4()),
        team_id: Set(team.id),
        name: Set(name.to_string()),
        year: Set(None),
        image_file: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(created)
}

async fn system_named<C: ConnectionTrait>(
    conn: &C,
    robot: &robot::Model,
    name: &str,
) -> Result<(system::Model, bool), ServiceError> {
    let name = name.trim();
    let existing = system::Entity::find()
        .filter(system::Column::RobotId.eq(robot.id))
        .filter(system::Column::Name.eq(name))
        .one(conn)
        .await?;
    if let Some(existing) = existing {
        return Ok((existing, false));
    }
    let created = system::ActiveModel {
        id: Set(Uuid::new_v4()),
        robot_id: Set(robot.id),
        name: Set(name.to_string()),
        assembly_url: Set(None),
        part_studio_urls: Set(json!([])),
        access_key: Set(None),
        secret_key: Set(None),
        bom_data: Set(json!([])),
        bom_updated_at: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok((created, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use assert_matches::assert_matches;

    async fn service_with_team(team_number: i32) -> (AdminService, team::Model) {
        let pool = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&pool).await.unwrap();
        let db = Arc::new(pool);

        let team = TeamRepository::new(db.clone())
            .create(team::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set("The Cheesy Poofs".into()),
                team_number: Set(team_number),
                password_hash: Set("x".into()),
                admin_password_hash: Set("x".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        (AdminService::new(db), team)
    }

    #[tokio::test]
    async fn failed_restore_leaves_no_partial_writes() {
        let (service, team) = service_with_team(254).await;

        let mut systems = BTreeMap::new();
        systems.insert("Drivetrain".to_string(), true);
        systems.insert("Shooter".to_string(), false);
        let mut robots = RobotMap::new();
        robots.insert("Comp".to_string(), systems);
        let mut dict = BTreeMap::new();
        dict.insert("254".to_string(), robots);

        let result = service
            .restore(dict, |system, ok: bool| {
                if ok {
                    Ok(system.into_active_model())
                } else {
                    Err(ServiceError::BadRequest("rejected".into()))
                }
            })
            .await;
        assert_matches!(result, Err(ServiceError::BadRequest(_)));

        assert_eq!(service.robots.count_by_team(team.id).await.unwrap(), 0);
        assert!(service.team_bom(254).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn restore_reuses_existing_robot_and_system() {
        let (service, _) = service_with_team(1678).await;
        let dict = || {
            let mut robots = RobotMap::new();
            robots.insert(
                "Comp".to_string(),
                BTreeMap::from([("Turret".to_string(), SystemSettings::default())]),
            );
            SettingsDict::from([("1678".to_string(), robots)])
        };

        let first = service.restore_settings_dict(dict()).await.unwrap();
        assert_eq!((first.robots_created, first.systems_created), (1, 1));

        let second = service.restore_settings_dict(dict()).await.unwrap();
        assert_eq!((second.robots_created, second.systems_created), (0, 0));
        assert_eq!(second.systems_updated, 1);
    }
}
