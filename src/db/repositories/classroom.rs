use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::domain::{ClassroomId, EnrollmentStatus, PrincipalId};
use crate::entities::{classroom_students, classrooms, prelude::*};
use crate::models::{Classroom, Enrollment};

const CLASS_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CLASS_CODE_LEN: usize = 6;

impl From<classrooms::Model> for Classroom {
    fn from(model: classrooms::Model) -> Self {
        Self {
            id: ClassroomId::from(model.id),
            teacher_id: PrincipalId::from(model.teacher_id),
            name: model.name,
            class_code: model.class_code,
            active: model.is_active,
            created_at: model.created_at,
        }
    }
}

pub struct ClassroomRepository {
    conn: DatabaseConnection,
}

impl ClassroomRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_enrollment(model: classroom_students::Model) -> Result<Enrollment> {
        Ok(Enrollment {
            status: model
                .status
                .parse::<EnrollmentStatus>()
                .with_context(|| format!("Enrollment {} has an unknown status", model.id))?,
            classroom_id: ClassroomId::from(model.classroom_id),
            student_id: PrincipalId::from(model.student_id),
            joined_at: model.joined_at,
        })
    }

    /// Fails with a unique violation if `class_code` is already used.
    pub async fn create(
        &self,
        teacher: &PrincipalId,
        name: &str,
        class_code: &str,
    ) -> Result<Classroom> {
        let id = ClassroomId::generate();

        Classrooms::insert(classrooms::ActiveModel {
            id: Set(id.to_string()),
            teacher_id: Set(teacher.to_string()),
            name: Set(name.to_string()),
            class_code: Set(class_code.to_string()),
            is_active: Set(true),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        })
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to insert classroom")?;

        self.get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Classroom {id} missing after insert"))
    }

    pub async fn get(&self, id: &ClassroomId) -> Result<Option<Classroom>> {
        let row = Classrooms::find_by_id(id.as_str())
            .one(&self.conn)
            .await
            .context("Failed to query classroom")?;

        Ok(row.map(Classroom::from))
    }

    pub async fn get_by_code(&self, class_code: &str) -> Result<Option<Classroom>> {
        let row = Classrooms::find()
            .filter(classrooms::Column::ClassCode.eq(class_code))
            .one(&self.conn)
            .await
            .context("Failed to query classroom by code")?;

        Ok(row.map(Classroom::from))
    }

    pub async fn owner(&self, id: &ClassroomId) -> Result<Option<PrincipalId>> {
        let owner: Option<String> = Classrooms::find_by_id(id.as_str())
            .select_only()
            .column(classrooms::Column::TeacherId)
            .into_tuple()
            .one(&self.conn)
            .await
            .context("Failed to query classroom owner")?;

        Ok(owner.map(PrincipalId::from))
    }

    pub async fn list_all(&self) -> Result<Vec<Classroom>> {
        let rows = Classrooms::find()
            .order_by_asc(classrooms::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list classrooms")?;

        Ok(rows.into_iter().map(Classroom::from).collect())
    }

    pub async fn list_for_teacher(&self, teacher: &PrincipalId) -> Result<Vec<Classroom>> {
        let rows = Classrooms::find()
            .filter(classrooms::Column::TeacherId.eq(teacher.as_str()))
            .order_by_asc(classrooms::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list classrooms for teacher")?;

        Ok(rows.into_iter().map(Classroom::from).collect())
    }

    /// Classrooms the student is actively enrolled in.
    pub async fn list_for_student(&self, student: &PrincipalId) -> Result<Vec<Classroom>> {
        let ids: Vec<String> = ClassroomStudents::find()
            .select_only()
            .column(classroom_students::Column::ClassroomId)
            .filter(classroom_students::Column::StudentId.eq(student.as_str()))
            .filter(classroom_students::Column::Status.eq(EnrollmentStatus::Active.as_str()))
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to query enrollments")?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = Classrooms::find()
            .filter(classrooms::Column::Id.is_in(ids))
            .order_by_asc(classrooms::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list classrooms for student")?;

        Ok(rows.into_iter().map(Classroom::from).collect())
    }

    /// Enrolls the student, reactivating an inactive enrollment.
    pub async fn enroll(
        &self,
        classroom: &ClassroomId,
        student: &PrincipalId,
    ) -> Result<Enrollment> {
        ClassroomStudents::insert(classroom_students::ActiveModel {
            classroom_id: Set(classroom.to_string()),
            student_id: Set(student.to_string()),
            status: Set(EnrollmentStatus::Active.as_str().to_string()),
            joined_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([
                classroom_students::Column::ClassroomId,
                classroom_students::Column::StudentId,
            ])
            .update_column(classroom_students::Column::Status)
            .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to enroll student")?;

        self.enrollment(classroom, student)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Enrollment missing after insert"))
    }

    pub async fn enrollment(
        &self,
        classroom: &ClassroomId,
        student: &PrincipalId,
    ) -> Result<Option<Enrollment>> {
        let row = ClassroomStudents::find()
            .filter(classroom_students::Column::ClassroomId.eq(classroom.as_str()))
            .filter(classroom_students::Column::StudentId.eq(student.as_str()))
            .one(&self.conn)
            .await
            .context("Failed to query enrollment")?;

        row.map(Self::map_enrollment).transpose()
    }

    pub async fn set_enrollment_status(
        &self,
        classroom: &ClassroomId,
        student: &PrincipalId,
        status: EnrollmentStatus,
    ) -> Result<bool> {
        let result = ClassroomStudents::update_many()
            .col_expr(classroom_students::Column::Status, Expr::value(status.as_str()))
            .filter(classroom_students::Column::ClassroomId.eq(classroom.as_str()))
            .filter(classroom_students::Column::StudentId.eq(student.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to update enrollment")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list_enrollments(&self, classroom: &ClassroomId) -> Result<Vec<Enrollment>> {
        let rows = ClassroomStudents::find()
            .filter(classroom_students::Column::ClassroomId.eq(classroom.as_str()))
            .order_by_asc(classroom_students::Column::JoinedAt)
            .all(&self.conn)
            .await
            .context("Failed to list enrollments")?;

        rows.into_iter().map(Self::map_enrollment).collect()
    }

    pub async fn is_actively_enrolled(
        &self,
        student: &PrincipalId,
        classroom: &ClassroomId,
    ) -> Result<bool> {
        let count = ClassroomStudents::find()
            .filter(classroom_students::Column::ClassroomId.eq(classroom.as_str()))
            .filter(classroom_students::Column::StudentId.eq(student.as_str()))
            .filter(classroom_students::Column::Status.eq(EnrollmentStatus::Active.as_str()))
            .count(&self.conn)
            .await
            .context("Failed to check enrollment")?;

        Ok(count > 0)
    }

    /// True if `student` is actively enrolled in any classroom owned by
    /// `teacher`.
    pub async fn teaches_student(
        &self,
        teacher: &PrincipalId,
        student: &PrincipalId,
    ) -> Result<bool> {
        let owned: Vec<String> = Classrooms::find()
            .select_only()
            .column(classrooms::Column::Id)
            .filter(classrooms::Column::TeacherId.eq(teacher.as_str()))
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to query teacher classrooms")?;

        if owned.is_empty() {
            return Ok(false);
        }

        let count = ClassroomStudents::find()
            .filter(classroom_students::Column::ClassroomId.is_in(owned))
            .filter(classroom_students::Column::StudentId.eq(student.as_str()))
            .filter(classroom_students::Column::Status.eq(EnrollmentStatus::Active.as_str()))
            .count(&self.conn)
            .await
            .context("Failed to check teacher-student link")?;

        Ok(count > 0)
    }
}

/// Random join code, e.g. `K7QX2M`. Ambiguous characters are left out.
#[must_use]
pub fn generate_class_code() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    (0..CLASS_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CLASS_CODE_ALPHABET.len());
            char::from(CLASS_CODE_ALPHABET[idx])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_codes_use_the_unambiguous_alphabet() {
        for _ in 0..50 {
            let code = generate_class_code();
            assert_eq!(code.len(), CLASS_CODE_LEN);
            assert!(code.bytes().all(|b| CLASS_CODE_ALPHABET.contains(&b)));
            assert!(!code.contains('0') && !code.contains('O') && !code.contains('I'));
        }
    }
}
