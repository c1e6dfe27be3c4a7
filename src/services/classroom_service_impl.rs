//! `SeaORM` implementation of the `ClassroomService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::Store;
use crate::db::repositories::classroom::generate_class_code;
use crate::domain::{AssignmentStatus, ClassroomId, EnrollmentStatus, PrincipalId, Role, TaskId};
use crate::error::{AccessError, StoreError};
use crate::models::{Assignment, Classroom, Enrollment, NewClassroom, NewTask, Profile, Task};
use crate::policy::{DenyReason, Feature, Operation};
use crate::services::authorizer::{Authorizer, Request};
use crate::services::classroom_service::ClassroomService;
use crate::validation::{validate_classroom_name, validate_task_title};

const CLASS_CODE_ATTEMPTS: usize = 5;

pub struct SeaOrmClassroomService {
    store: Store,
    authorizer: Arc<Authorizer>,
}

impl SeaOrmClassroomService {
    #[must_use]
    pub const fn new(store: Store, authorizer: Arc<Authorizer>) -> Self {
        Self { store, authorizer }
    }
}

fn db(err: anyhow::Error) -> AccessError {
    StoreError::from(err).into()
}

#[async_trait]
impl ClassroomService for SeaOrmClassroomService {
    async fn create_classroom(
        &self,
        actor: &Profile,
        classroom: NewClassroom,
    ) -> Result<Classroom, AccessError> {
        self.authorizer
            .require(actor, Request::Feature(Feature::CreateClassroom))
            .await?;
        let name = validate_classroom_name(&classroom.name)?;

        for attempt in 1..=CLASS_CODE_ATTEMPTS {
            let code = generate_class_code();
            match self.store.create_classroom(&actor.id, name, &code).await {
                Ok(created) => {
                    info!(teacher = %actor.id, classroom = %created.id, "Classroom created");
                    return Ok(created);
                }
                Err(e) => match StoreError::from(e) {
                    StoreError::Conflict(_) => {
                        warn!(attempt, "Class code collision, retrying");
                    }
                    other => return Err(other.into()),
                },
            }
        }

        Err(AccessError::Internal(
            "Could not allocate a unique class code".to_string(),
        ))
    }

    async fn get_classroom(
        &self,
        actor: &Profile,
        id: &ClassroomId,
    ) -> Result<Classroom, AccessError> {
        self.authorizer
            .require(
                actor,
                Request::Classroom {
                    id,
                    op: Operation::View,
                },
            )
            .await?;

        self.store
            .get_classroom(id)
            .await
            .map_err(db)?
            .ok_or_else(|| AccessError::not_found("Classroom", id))
    }

    async fn list_classrooms(&self, actor: &Profile) -> Result<Vec<Classroom>, AccessError> {
        self.authorizer
            .require(actor, Request::ListClassrooms)
            .await?;

        let classrooms = match actor.role {
            Role::Admin => self.store.list_all_classrooms().await,
            Role::Teacher => self.store.list_classrooms_for_teacher(&actor.id).await,
            Role::Student => self.store.list_classrooms_for_student(&actor.id).await,
        };
        classrooms.map_err(db)
    }

    async fn join_classroom(
        &self,
        actor: &Profile,
        class_code: &str,
    ) -> Result<Enrollment, AccessError> {
        self.authorizer
            .require(actor, Request::Feature(Feature::JoinClassroom))
            .await?;
        if actor.role != Role::Student {
            return Err(DenyReason::InsufficientRole.into());
        }

        let code = class_code.trim().to_uppercase();
        let classroom = self
            .store
            .get_classroom_by_code(&code)
            .await
            .map_err(db)?
            .ok_or_else(|| AccessError::not_found("Classroom with code", &code))?;

        if !classroom.active {
            return Err(AccessError::validation(
                "This classroom is not accepting students",
            ));
        }

        let enrollment = self
            .store
            .enroll_student(&classroom.id, &actor.id)
            .await
            .map_err(db)?;

        info!(student = %actor.id, classroom = %classroom.id, "Student joined classroom");
        Ok(enrollment)
    }

    async fn remove_student(
        &self,
        actor: &Profile,
        classroom: &ClassroomId,
        student: &PrincipalId,
    ) -> Result<(), AccessError> {
        self.authorizer
            .require(
                actor,
                Request::Classroom {
                    id: classroom,
                    op: Operation::Edit,
                },
            )
            .await?;

        let updated = self
            .store
            .set_enrollment_status(classroom, student, EnrollmentStatus::Inactive)
            .await
            .map_err(db)?;
        if !updated {
            return Err(AccessError::not_found("Enrollment of", student));
        }

        info!(classroom = %classroom, student = %student, "Student removed from classroom");
        Ok(())
    }

    async fn list_enrollments(
        &self,
        actor: &Profile,
        classroom: &ClassroomId,
    ) -> Result<Vec<Enrollment>, AccessError> {
        self.authorizer
            .require(actor, Request::Feature(Feature::ViewStudentProgress))
            .await?;
        self.authorizer
            .require(
                actor,
                Request::Classroom {
                    id: classroom,
                    op: Operation::View,
                },
            )
            .await?;

        self.store.list_enrollments(classroom).await.map_err(db)
    }

    async fn create_task(&self, actor: &Profile, task: NewTask) -> Result<Task, AccessError> {
        self.authorizer
            .require(actor, Request::Feature(Feature::CreateTask))
            .await?;
        self.authorizer
            .require(
                actor,
                Request::Classroom {
                    id: &task.classroom_id,
                    op: Operation::Edit,
                },
            )
            .await?;
        let title = validate_task_title(&task.title)?;

        let created = self
            .store
            .create_task(&actor.id, &task.classroom_id, title)
            .await
            .map_err(db)?;

        info!(teacher = %actor.id, task = %created.id, "Task created");
        Ok(created)
    }

    async fn get_task(&self, actor: &Profile, id: &TaskId) -> Result<Task, AccessError> {
        self.authorizer
            .require(
                actor,
                Request::Task {
                    id,
                    op: Operation::View,
                },
            )
            .await?;

        self.store
            .get_task(id)
            .await
            .map_err(db)?
            .ok_or_else(|| AccessError::not_found("Task", id))
    }

    async fn list_tasks(&self, actor: &Profile) -> Result<Vec<Task>, AccessError> {
        self.authorizer.require(actor, Request::ListTasks).await?;

        let tasks = match actor.role {
            Role::Admin => self.store.list_all_tasks().await,
            Role::Teacher => self.store.list_tasks_for_teacher(&actor.id).await,
            Role::Student => self.store.list_tasks_for_student(&actor.id).await,
        };
        tasks.map_err(db)
    }

    async fn assign_task(
        &self,
        actor: &Profile,
        task: &TaskId,
        student: &PrincipalId,
    ) -> Result<Assignment, AccessError> {
        self.authorizer
            .require(actor, Request::Feature(Feature::CreateTask))
            .await?;
        self.authorizer
            .require(
                actor,
                Request::Task {
                    id: task,
                    op: Operation::Edit,
                },
            )
            .await?;

        let stored = self
            .store
            .get_task(task)
            .await
            .map_err(db)?
            .ok_or_else(|| AccessError::not_found("Task", task))?;

        let enrolled = self
            .store
            .list_enrollments(&stored.classroom_id)
            .await
            .map_err(db)?
            .into_iter()
            .any(|e| e.student_id == *student && e.status == EnrollmentStatus::Active);
        if !enrolled {
            return Err(AccessError::validation(
                "Student is not enrolled in the task's classroom",
            ));
        }

        match self.store.assign_task(task, student).await {
            Ok(assignment) => {
                info!(task = %task, student = %student, "Task assigned");
                Ok(assignment)
            }
            Err(e) => Err(match StoreError::from(e) {
                StoreError::Conflict(_) => {
                    AccessError::validation("Task is already assigned to this student")
                }
                other => other.into(),
            }),
        }
    }

    async fn update_assignment_status(
        &self,
        actor: &Profile,
        task: &TaskId,
        status: AssignmentStatus,
    ) -> Result<Assignment, AccessError> {
        self.authorizer
            .require(
                actor,
                Request::Task {
                    id: task,
                    op: Operation::Edit,
                },
            )
            .await?;
        if actor.role != Role::Student {
            return Err(DenyReason::InsufficientRole.into());
        }

        let current = self
            .store
            .get_assignment(task, &actor.id)
            .await
            .map_err(db)?
            .ok_or_else(|| AccessError::not_found("Assignment for task", task))?;

        if !current.status.can_transition_to(status) {
            return Err(AccessError::validation(format!(
                "Cannot move assignment from {} to {}",
                current.status, status
            )));
        }

        self.store
            .update_assignment_status(task, &actor.id, current.status, status)
            .await
            .map_err(db)?
            .ok_or_else(|| AccessError::validation("Assignment changed concurrently, try again"))
    }
}
