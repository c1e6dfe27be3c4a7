use serde::{Deserialize, Serialize};

use crate::domain::{AssignmentStatus, ClassroomId, EnrollmentStatus, PrincipalId, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classroom {
    pub id: ClassroomId,
    pub teacher_id: PrincipalId,
    pub name: String,
    pub class_code: String,
    pub active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewClassroom {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrollment {
    pub classroom_id: ClassroomId,
    pub student_id: PrincipalId,
    pub status: EnrollmentStatus,
    pub joined_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub teacher_id: PrincipalId,
    pub classroom_id: ClassroomId,
    pub title: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewTask {
    pub classroom_id: ClassroomId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub task_id: TaskId,
    pub student_id: PrincipalId,
    pub status: AssignmentStatus,
    pub updated_at: String,
}
