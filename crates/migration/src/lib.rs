use sea_orm_migration::prelude::*;

mod m20261001_000001_certificates;
mod m20261009_000002_certificates_created_idx;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_certificates::Migration),
            Box::new(m20261009_000002_certificates_created_idx::Migration),
        ]
    }
}
