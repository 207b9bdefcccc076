use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod machine_repository;
pub mod robot_repository;
pub mod system_repository;
pub mod team_repository;

pub use machine_repository::MachineRepository;
pub use robot_repository::RobotRepository;
pub use system_repository::SystemRepository;
pub use team_repository::TeamRepository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
