use sea_orm_migration::prelude::*;

mod m20250101_initial;
mod m20250115_add_classrooms;
mod m20250201_add_role_requests;
mod m20250210_add_notifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_initial::Migration),
            Box::new(m20250115_add_classrooms::Migration),
            Box::new(m20250201_add_role_requests::Migration),
            Box::new(m20250210_add_notifications::Migration),
        ]
    }
}
