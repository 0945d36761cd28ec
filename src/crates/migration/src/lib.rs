pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_stat_domain;
mod m20250301_000002_create_interaction_domain;
mod m20250301_000003_create_behavior_domain;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_stat_domain::Migration),
            Box::new(m20250301_000002_create_interaction_domain::Migration),
            Box::new(m20250301_000003_create_behavior_domain::Migration),
        ]
    }
}
