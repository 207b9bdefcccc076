pub use sea_orm_migration::prelude::*;

mod m20240901_000001_create_teams_table;
mod m20240901_000002_create_robots_table;
mod m20240901_000003_create_systems_table;
mod m20240901_000004_create_machines_table;
mod m20240915_000005_add_scoped_name_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240901_000001_create_teams_table::Migration),
            Box::new(m20240901_000002_create_robots_table::Migration),
            Box::new(m20240901_000003_create_systems_table::Migration),
            Box::new(m20240901_000004_create_machines_table::Migration),
            Box::new(m20240915_000005_add_scoped_name_indexes::Migration),
        ]
    }
}
