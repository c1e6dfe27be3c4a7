use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::domain::{AssignmentStatus, ClassroomId, EnrollmentStatus, PrincipalId, TaskId};
use crate::models::{
    Assignment, Classroom, Credential, Enrollment, NewNotification, Notification, Principal, Task,
};

pub mod migrator;
pub mod repositories;
mod tables;

pub use repositories::activity::ActivityEntry;
pub use repositories::role_request::ReviewOutcome;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)
                    .with_context(|| format!("Failed to create database file {path_str}"))?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn principal_repo(&self) -> repositories::principal::PrincipalRepository {
        repositories::principal::PrincipalRepository::new(self.conn.clone())
    }

    fn profile_repo(&self) -> repositories::profile::ProfileRepository {
        repositories::profile::ProfileRepository::new(self.conn.clone())
    }

    fn role_request_repo(&self) -> repositories::role_request::RoleRequestRepository {
        repositories::role_request::RoleRequestRepository::new(self.conn.clone())
    }

    fn classroom_repo(&self) -> repositories::classroom::ClassroomRepository {
        repositories::classroom::ClassroomRepository::new(self.conn.clone())
    }

    fn task_repo(&self) -> repositories::task::TaskRepository {
        repositories::task::TaskRepository::new(self.conn.clone())
    }

    fn notification_repo(&self) -> repositories::notification::NotificationRepository {
        repositories::notification::NotificationRepository::new(self.conn.clone())
    }

    fn activity_repo(&self) -> repositories::activity::ActivityRepository {
        repositories::activity::ActivityRepository::new(self.conn.clone())
    }

    // Principals & credentials

    pub async fn create_principal(&self, email: &str, password_hash: String) -> Result<Principal> {
        self.principal_repo().create(email, password_hash).await
    }

    pub async fn get_principal_by_email(&self, email: &str) -> Result<Option<Principal>> {
        self.principal_repo().get_by_email(email).await
    }

    pub async fn verify_principal_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Principal>> {
        self.principal_repo().verify_password(email, password).await
    }

    pub async fn update_principal_password(
        &self,
        id: &PrincipalId,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        self.principal_repo()
            .update_password(id, new_password, config)
            .await
    }

    pub async fn create_auth_session(
        &self,
        principal: &Principal,
        ttl: chrono::Duration,
    ) -> Result<Credential> {
        self.principal_repo().create_session(principal, ttl).await
    }

    pub async fn find_auth_session(&self, token: &str) -> Result<Option<Credential>> {
        self.principal_repo().find_session(token).await
    }

    pub async fn delete_auth_session(&self, token: &str) -> Result<bool> {
        self.principal_repo().delete_session(token).await
    }

    // Classrooms

    pub async fn create_classroom(
        &self,
        teacher: &PrincipalId,
        name: &str,
        class_code: &str,
    ) -> Result<Classroom> {
        self.classroom_repo().create(teacher, name, class_code).await
    }

    pub async fn get_classroom(&self, id: &ClassroomId) -> Result<Option<Classroom>> {
        self.classroom_repo().get(id).await
    }

    pub async fn get_classroom_by_code(&self, class_code: &str) -> Result<Option<Classroom>> {
        self.classroom_repo().get_by_code(class_code).await
    }

    pub async fn list_all_classrooms(&self) -> Result<Vec<Classroom>> {
        self.classroom_repo().list_all().await
    }

    pub async fn list_classrooms_for_teacher(&self, teacher: &PrincipalId) -> Result<Vec<Classroom>> {
        self.classroom_repo().list_for_teacher(teacher).await
    }

    pub async fn list_classrooms_for_student(&self, student: &PrincipalId) -> Result<Vec<Classroom>> {
        self.classroom_repo().list_for_student(student).await
    }

    pub async fn enroll_student(
        &self,
        classroom: &ClassroomId,
        student: &PrincipalId,
    ) -> Result<Enrollment> {
        self.classroom_repo().enroll(classroom, student).await
    }

    pub async fn set_enrollment_status(
        &self,
        classroom: &ClassroomId,
        student: &PrincipalId,
        status: EnrollmentStatus,
    ) -> Result<bool> {
        self.classroom_repo()
            .set_enrollment_status(classroom, student, status)
            .await
    }

    pub async fn list_enrollments(&self, classroom: &ClassroomId) -> Result<Vec<Enrollment>> {
        self.classroom_repo().list_enrollments(classroom).await
    }

    // Tasks

    pub async fn create_task(
        &self,
        teacher: &PrincipalId,
        classroom: &ClassroomId,
        title: &str,
    ) -> Result<Task> {
        self.task_repo().create(teacher, classroom, title).await
    }

    pub async fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        self.task_repo().get(id).await
    }

    pub async fn list_all_tasks(&self) -> Result<Vec<Task>> {
        self.task_repo().list_all().await
    }

    pub async fn list_tasks_for_teacher(&self, teacher: &PrincipalId) -> Result<Vec<Task>> {
        self.task_repo().list_for_teacher(teacher).await
    }

    pub async fn list_tasks_for_student(&self, student: &PrincipalId) -> Result<Vec<Task>> {
        self.task_repo().list_for_student(student).await
    }

    pub async fn assign_task(&self, task: &TaskId, student: &PrincipalId) -> Result<Assignment> {
        self.task_repo().assign(task, student).await
    }

    pub async fn get_assignment(
        &self,
        task: &TaskId,
        student: &PrincipalId,
    ) -> Result<Option<Assignment>> {
        self.task_repo().assignment(task, student).await
    }

    pub async fn list_assignments(&self, task: &TaskId) -> Result<Vec<Assignment>> {
        self.task_repo().list_assignments(task).await
    }

    pub async fn update_assignment_status(
        &self,
        task: &TaskId,
        student: &PrincipalId,
        from: AssignmentStatus,
        to: AssignmentStatus,
    ) -> Result<Option<Assignment>> {
        self.task_repo().update_status(task, student, from, to).await
    }

    // Notifications

    pub async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification> {
        self.notification_repo().insert(notification).await
    }

    pub async fn get_notification(&self, id: i32) -> Result<Option<Notification>> {
        self.notification_repo().get(id).await
    }

    pub async fn list_notifications(
        &self,
        recipient: &PrincipalId,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        self.notification_repo().list_for(recipient, unread_only).await
    }

    pub async fn mark_notification_read(
        &self,
        id: i32,
    ) -> Result<Option<Notification>> {
        self.notification_repo().mark_read(id).await
    }

    pub async fn unread_notification_count(&self, recipient: &PrincipalId) -> Result<u64> {
        self.notification_repo().unread_count(recipient).await
    }

    pub async fn mark_all_notifications_read(
        &self,
        recipient: &PrincipalId,
    ) -> Result<Vec<Notification>> {
        self.notification_repo().mark_all_read(recipient).await
    }

    pub async fn delete_notification(&self, id: i32) -> Result<bool> {
        self.notification_repo().delete(id).await
    }

    // Audit trail

    pub async fn recent_activities(&self, limit: u64) -> Result<Vec<ActivityEntry>> {
        self.activity_repo().recent(limit).await
    }

    pub async fn activities_of_type(&self, activity_type: &str) -> Result<Vec<ActivityEntry>> {
        self.activity_repo().for_type(activity_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unusable_database_directory_is_reported() {
        let blocker = std::env::temp_dir().join(format!(
            "wordventure-store-blocker-{}",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&blocker, b"not a directory").unwrap();

        let url = format!("sqlite:{}", blocker.join("nested").join("app.db").display());
        let err = Store::new(&url).await.err().expect("store should not open");
        assert!(
            err.to_string().contains("Failed to create database directory"),
            "unexpected error: {err:#}"
        );

        std::fs::remove_file(&blocker).unwrap();
    }
}
