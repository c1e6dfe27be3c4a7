use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RoleRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoleRequests::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoleRequests::RequesterId).string().not_null())
                    .col(
                        ColumnDef::new(RoleRequests::RequestedRole)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RoleRequests::RequestData)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(RoleRequests::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(RoleRequests::ReviewerId).string())
                    .col(ColumnDef::new(RoleRequests::ReviewNotes).text())
                    .col(ColumnDef::new(RoleRequests::CreatedAt).string().not_null())
                    .col(ColumnDef::new(RoleRequests::ReviewedAt).string())
                    .to_owned(),
            )
            .await?;

        // At most one pending request per requester. Partial indexes are not
        // expressible through the index builder, so this one is raw SQL.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_role_requests_one_pending \
                 ON role_requests (requester_id) WHERE status = 'pending'",
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_role_requests_status")
                    .table(RoleRequests::Table)
                    .col(RoleRequests::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RoleRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RoleRequests {
    Table,
    Id,
    RequesterId,
    RequestedRole,
    RequestData,
    Status,
    ReviewerId,
    ReviewNotes,
    CreatedAt,
    ReviewedAt,
}
