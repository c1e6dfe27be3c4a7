//! Domain service for classrooms, enrollments and tasks.
//!
//! Every operation takes the acting profile and goes through the
//! [`crate::services::Authorizer`] before touching the tables.

use crate::domain::{AssignmentStatus, ClassroomId, PrincipalId, TaskId};
use crate::error::AccessError;
use crate::models::{Assignment, Classroom, Enrollment, NewClassroom, NewTask, Profile, Task};

#[async_trait::async_trait]
pub trait ClassroomService: Send + Sync {
    /// Creates a classroom owned by `actor` with a fresh join code.
    async fn create_classroom(
        &self,
        actor: &Profile,
        classroom: NewClassroom,
    ) -> Result<Classroom, AccessError>;

    async fn get_classroom(&self, actor: &Profile, id: &ClassroomId)
    -> Result<Classroom, AccessError>;

    /// Classrooms visible to `actor`: all for admins, owned ones for teachers
    /// and actively enrolled ones for students.
    async fn list_classrooms(&self, actor: &Profile) -> Result<Vec<Classroom>, AccessError>;

    /// Enrolls a student by join code.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::NotFound`] for an unknown code and
    /// [`AccessError::Validation`] if the classroom is closed.
    async fn join_classroom(
        &self,
        actor: &Profile,
        class_code: &str,
    ) -> Result<Enrollment, AccessError>;

    /// Marks an enrollment inactive. Owner or admin only.
    async fn remove_student(
        &self,
        actor: &Profile,
        classroom: &ClassroomId,
        student: &PrincipalId,
    ) -> Result<(), AccessError>;

    async fn list_enrollments(
        &self,
        actor: &Profile,
        classroom: &ClassroomId,
    ) -> Result<Vec<Enrollment>, AccessError>;

    async fn create_task(&self, actor: &Profile, task: NewTask) -> Result<Task, AccessError>;

    async fn get_task(&self, actor: &Profile, id: &TaskId) -> Result<Task, AccessError>;

    async fn list_tasks(&self, actor: &Profile) -> Result<Vec<Task>, AccessError>;

    /// Assigns a task to a student enrolled in the task's classroom.
    async fn assign_task(
        &self,
        actor: &Profile,
        task: &TaskId,
        student: &PrincipalId,
    ) -> Result<Assignment, AccessError>;

    /// Moves the actor's own assignment forward
    /// (`assigned` → `in_progress` → `completed`).
    async fn update_assignment_status(
        &self,
        actor: &Profile,
        task: &TaskId,
        status: AssignmentStatus,
    ) -> Result<Assignment, AccessError>;
}
