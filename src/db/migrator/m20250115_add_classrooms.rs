use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Classrooms::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Classrooms::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Classrooms::TeacherId).string().not_null())
                    .col(ColumnDef::new(Classrooms::Name).string().not_null())
                    .col(
                        ColumnDef::new(Classrooms::ClassCode)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Classrooms::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Classrooms::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_classrooms_teacher_id")
                    .table(Classrooms::Table)
                    .col(Classrooms::TeacherId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ClassroomStudents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClassroomStudents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ClassroomStudents::ClassroomId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClassroomStudents::StudentId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClassroomStudents::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(ClassroomStudents::JoinedAt)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_classroom_students_classroom_id")
                            .from(ClassroomStudents::Table, ClassroomStudents::ClassroomId)
                            .to(Classrooms::Table, Classrooms::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_classroom_students_unique")
                    .table(ClassroomStudents::Table)
                    .col(ClassroomStudents::ClassroomId)
                    .col(ClassroomStudents::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TeacherTasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TeacherTasks::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TeacherTasks::TeacherId).string().not_null())
                    .col(ColumnDef::new(TeacherTasks::ClassroomId).string().not_null())
                    .col(ColumnDef::new(TeacherTasks::Title).string().not_null())
                    .col(ColumnDef::new(TeacherTasks::CreatedAt).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_teacher_tasks_classroom_id")
                            .from(TeacherTasks::Table, TeacherTasks::ClassroomId)
                            .to(Classrooms::Table, Classrooms::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TaskAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TaskAssignments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TaskAssignments::TaskId).string().not_null())
                    .col(
                        ColumnDef::new(TaskAssignments::StudentId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TaskAssignments::Status)
                            .string()
                            .not_null()
                            .default("assigned"),
                    )
                    .col(
                        ColumnDef::new(TaskAssignments::UpdatedAt)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_assignments_task_id")
                            .from(TaskAssignments::Table, TaskAssignments::TaskId)
                            .to(TeacherTasks::Table, TeacherTasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_task_assignments_unique")
                    .table(TaskAssignments::Table)
                    .col(TaskAssignments::TaskId)
                    .col(TaskAssignments::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TaskAssignments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TeacherTasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClassroomStudents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Classrooms::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Classrooms {
    Table,
    Id,
    TeacherId,
    Name,
    ClassCode,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ClassroomStudents {
    Table,
    Id,
    ClassroomId,
    StudentId,
    Status,
    JoinedAt,
}

#[derive(DeriveIden)]
enum TeacherTasks {
    Table,
    Id,
    TeacherId,
    ClassroomId,
    Title,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TaskAssignments {
    Table,
    Id,
    TaskId,
    StudentId,
    Status,
    UpdatedAt,
}
