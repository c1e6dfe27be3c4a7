use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::domain::{AssignmentStatus, ClassroomId, PrincipalId, TaskId};
use crate::entities::{prelude::*, task_assignments, teacher_tasks};
use crate::models::{Assignment, Task};

impl From<teacher_tasks::Model> for Task {
    fn from(model: teacher_tasks::Model) -> Self {
        Self {
            id: TaskId::from(model.id),
            teacher_id: PrincipalId::from(model.teacher_id),
            classroom_id: ClassroomId::from(model.classroom_id),
            title: model.title,
            created_at: model.created_at,
        }
    }
}

pub struct TaskRepository {
    conn: DatabaseConnection,
}

impl TaskRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_assignment(model: task_assignments::Model) -> Result<Assignment> {
        Ok(Assignment {
            status: model
                .status
                .parse::<AssignmentStatus>()
                .with_context(|| format!("Assignment {} has an unknown status", model.id))?,
            task_id: TaskId::from(model.task_id),
            student_id: PrincipalId::from(model.student_id),
            updated_at: model.updated_at,
        })
    }

    pub async fn create(
        &self,
        teacher: &PrincipalId,
        classroom: &ClassroomId,
        title: &str,
    ) -> Result<Task> {
        let id = TaskId::generate();

        TeacherTasks::insert(teacher_tasks::ActiveModel {
            id: Set(id.to_string()),
            teacher_id: Set(teacher.to_string()),
            classroom_id: Set(classroom.to_string()),
            title: Set(title.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        })
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to insert task")?;

        self.get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Task {id} missing after insert"))
    }

    pub async fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        let row = TeacherTasks::find_by_id(id.as_str())
            .one(&self.conn)
            .await
            .context("Failed to query task")?;

        Ok(row.map(Task::from))
    }

    pub async fn owner(&self, id: &TaskId) -> Result<Option<PrincipalId>> {
        let owner: Option<String> = TeacherTasks::find_by_id(id.as_str())
            .select_only()
            .column(teacher_tasks::Column::TeacherId)
            .into_tuple()
            .one(&self.conn)
            .await
            .context("Failed to query task owner")?;

        Ok(owner.map(PrincipalId::from))
    }

    pub async fn list_all(&self) -> Result<Vec<Task>> {
        let rows = TeacherTasks::find()
            .order_by_asc(teacher_tasks::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list tasks")?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    pub async fn list_for_teacher(&self, teacher: &PrincipalId) -> Result<Vec<Task>> {
        let rows = TeacherTasks::find()
            .filter(teacher_tasks::Column::TeacherId.eq(teacher.as_str()))
            .order_by_asc(teacher_tasks::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list tasks for teacher")?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    /// Tasks assigned to the student.
    pub async fn list_for_student(&self, student: &PrincipalId) -> Result<Vec<Task>> {
        let ids: Vec<String> = TaskAssignments::find()
            .select_only()
            .column(task_assignments::Column::TaskId)
            .filter(task_assignments::Column::StudentId.eq(student.as_str()))
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to query assignments")?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = TeacherTasks::find()
            .filter(teacher_tasks::Column::Id.is_in(ids))
            .order_by_asc(teacher_tasks::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list tasks for student")?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    /// Fails with a unique violation if the student is already assigned.
    pub async fn assign(&self, task: &TaskId, student: &PrincipalId) -> Result<Assignment> {
        TaskAssignments::insert(task_assignments::ActiveModel {
            task_id: Set(task.to_string()),
            student_id: Set(student.to_string()),
            status: Set(AssignmentStatus::Assigned.as_str().to_string()),
            updated_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        })
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to insert assignment")?;

        self.assignment(task, student)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Assignment missing after insert"))
    }

    pub async fn assignment(
        &self,
        task: &TaskId,
        student: &PrincipalId,
    ) -> Result<Option<Assignment>> {
        let row = TaskAssignments::find()
            .filter(task_assignments::Column::TaskId.eq(task.as_str()))
            .filter(task_assignments::Column::StudentId.eq(student.as_str()))
            .one(&self.conn)
            .await
            .context("Failed to query assignment")?;

        row.map(Self::map_assignment).transpose()
    }

    pub async fn list_assignments(&self, task: &TaskId) -> Result<Vec<Assignment>> {
        let rows = TaskAssignments::find()
            .filter(task_assignments::Column::TaskId.eq(task.as_str()))
            .order_by_asc(task_assignments::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list assignments")?;

        rows.into_iter().map(Self::map_assignment).collect()
    }

    pub async fn is_assigned(&self, student: &PrincipalId, task: &TaskId) -> Result<bool> {
        let count = TaskAssignments::find()
            .filter(task_assignments::Column::TaskId.eq(task.as_str()))
            .filter(task_assignments::Column::StudentId.eq(student.as_str()))
            .count(&self.conn)
            .await
            .context("Failed to check assignment")?;

        Ok(count > 0)
    }

    /// Writes only if the stored status is still `from`, so concurrent updates
    /// cannot move an assignment backwards.
    pub async fn update_status(
        &self,
        task: &TaskId,
        student: &PrincipalId,
        from: AssignmentStatus,
        to: AssignmentStatus,
    ) -> Result<Option<Assignment>> {
        let result = TaskAssignments::update_many()
            .col_expr(task_assignments::Column::Status, Expr::value(to.as_str()))
            .col_expr(
                task_assignments::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(task_assignments::Column::TaskId.eq(task.as_str()))
            .filter(task_assignments::Column::StudentId.eq(student.as_str()))
            .filter(task_assignments::Column::Status.eq(from.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to update assignment status")?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.assignment(task, student).await
    }
}
