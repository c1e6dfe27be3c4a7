use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Principals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Principals::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Principals::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Principals::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Principals::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Principals::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuthSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuthSessions::Token)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuthSessions::PrincipalId).string().not_null())
                    .col(ColumnDef::new(AuthSessions::IssuedAt).string().not_null())
                    .col(ColumnDef::new(AuthSessions::ExpiresAt).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_auth_sessions_principal_id")
                            .from(AuthSessions::Table, AuthSessions::PrincipalId)
                            .to(Principals::Table, Principals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_auth_sessions_principal_id")
                    .table(AuthSessions::Table)
                    .col(AuthSessions::PrincipalId)
                    .to_owned(),
            )
            .await?;

        // The primary key is the uniqueness constraint that keeps concurrent
        // profile bootstrapping down to a single row.
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Profiles::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Profiles::Email).string().not_null())
                    .col(
                        ColumnDef::new(Profiles::DisplayName)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Profiles::Role)
                            .string()
                            .not_null()
                            .default("student"),
                    )
                    .col(
                        ColumnDef::new(Profiles::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Profiles::TeacherId).string())
                    .col(
                        ColumnDef::new(Profiles::NotificationsEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Profiles::SoundEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Profiles::DarkMode)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Profiles::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Profiles::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_role")
                    .table(Profiles::Table)
                    .col(Profiles::Role)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuthSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Principals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Principals {
    Table,
    Id,
    Email,
    PasswordHash,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AuthSessions {
    Table,
    Token,
    PrincipalId,
    IssuedAt,
    ExpiresAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    Email,
    DisplayName,
    Role,
    IsActive,
    TeacherId,
    NotificationsEnabled,
    SoundEnabled,
    DarkMode,
    CreatedAt,
    UpdatedAt,
}
