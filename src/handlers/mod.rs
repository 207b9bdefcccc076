pub mod admin;
pub mod auth;
pub mod bom;
pub mod export;
pub mod machines;
pub mod robots;
pub mod systems;
pub mod teams;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::middleware_helpers::retry::PollConfig;
use crate::onshape::CadVendor;
use crate::repositories::{MachineRepository, RobotRepository, SystemRepository, TeamRepository};
use crate::services::{
    admin::AdminService, bom::BomService, export::ExportService, machines::MachineService,
    robots::RobotService, systems::SystemService, teams::TeamService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub teams: Arc<TeamService>,
    pub robots: Arc<RobotService>,
    pub systems: Arc<SystemService>,
    pub machines: Arc<MachineService>,
    pub bom: Arc<BomService>,
    pub export: Arc<ExportService>,
    pub admin: Arc<AdminService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        vendor: Arc<dyn CadVendor>,
        config: &AppConfig,
    ) -> Self {
        let robots = RobotService::new(RobotRepository::new(db.clone()));
        let systems = SystemService::new(SystemRepository::new(db.clone()), robots.clone());
        let machines = MachineService::new(MachineRepository::new(db.clone()), robots.clone());
        let poll = PollConfig::new(
            config.onshape.export_max_attempts,
            config.onshape.export_poll_interval(),
        );

        Self {
            teams: Arc::new(TeamService::new(
                TeamRepository::new(db.clone()),
                RobotRepository::new(db.clone()),
                auth,
                config.admin_password_hash.clone(),
            )),
            bom: Arc::new(BomService::new(systems.clone(), vendor.clone())),
            export: Arc::new(ExportService::new(
                systems.clone(),
                machines.clone(),
                vendor,
                poll,
            )),
            admin: Arc::new(AdminService::new(db)),
            robots: Arc::new(robots),
            systems: Arc::new(systems),
            machines: Arc::new(machines),
        }
    }
}
