use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use crate::db::repositories::principal::PrincipalRepository;
use crate::domain::{PrincipalId, Role};
use crate::entities::{prelude::*, profiles};
use crate::models::{NewProfile, Profile, ProfileChanges, ProfileFilter};

pub struct ProfileRepository {
    conn: DatabaseConnection,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: profiles::Model) -> Result<Profile> {
        let role = model
            .role
            .parse::<Role>()
            .with_context(|| format!("Profile {} has an unknown role", model.id))?;

        Ok(Profile {
            id: PrincipalId::from(model.id),
            email: model.email,
            display_name: model.display_name,
            role,
            active: model.is_active,
            teacher_id: model.teacher_id.map(PrincipalId::from),
            notifications_enabled: model.notifications_enabled,
            sound_enabled: model.sound_enabled,
            dark_mode: model.dark_mode,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn get(&self, id: &PrincipalId) -> Result<Option<Profile>> {
        let row = Profiles::find_by_id(id.as_str())
            .one(&self.conn)
            .await
            .context("Failed to query profile")?;

        row.map(Self::map_model).transpose()
    }

    /// Plain insert. A second insert for the same id fails on the primary key.
    pub async fn insert(&self, profile: NewProfile) -> Result<Profile> {
        let now = chrono::Utc::now().to_rfc3339();
        let id = profile.id.clone();

        Profiles::insert(profiles::ActiveModel {
            id: Set(profile.id.to_string()),
            email: Set(profile.email),
            display_name: Set(profile.display_name),
            role: Set(profile.role.as_str().to_string()),
            is_active: Set(profile.active),
            teacher_id: Set(None),
            notifications_enabled: Set(true),
            sound_enabled: Set(true),
            dark_mode: Set(false),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        })
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to insert profile")?;

        self.get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Profile {id} missing after insert"))
    }

    pub async fn update_details(
        &self,
        id: &PrincipalId,
        changes: &ProfileChanges,
    ) -> Result<Option<Profile>> {
        let mut update = Profiles::update_many()
            .col_expr(
                profiles::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(profiles::Column::Id.eq(id.as_str()));

        if let Some(name) = &changes.display_name {
            update = update.col_expr(profiles::Column::DisplayName, Expr::value(name.clone()));
        }
        if let Some(enabled) = changes.notifications_enabled {
            update = update.col_expr(profiles::Column::NotificationsEnabled, Expr::value(enabled));
        }
        if let Some(enabled) = changes.sound_enabled {
            update = update.col_expr(profiles::Column::SoundEnabled, Expr::value(enabled));
        }
        if let Some(dark) = changes.dark_mode {
            update = update.col_expr(profiles::Column::DarkMode, Expr::value(dark));
        }

        let result = update
            .exec(&self.conn)
            .await
            .context("Failed to update profile")?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    pub async fn set_role(&self, id: &PrincipalId, role: Role) -> Result<Option<Profile>> {
        self.set_column(id, profiles::Column::Role, Expr::value(role.as_str()))
            .await
    }

    pub async fn set_active(&self, id: &PrincipalId, active: bool) -> Result<Option<Profile>> {
        self.set_column(id, profiles::Column::IsActive, Expr::value(active))
            .await
    }

    pub async fn set_teacher(
        &self,
        id: &PrincipalId,
        teacher: Option<&PrincipalId>,
    ) -> Result<Option<Profile>> {
        let value = teacher.map(PrincipalId::to_string);
        self.set_column(id, profiles::Column::TeacherId, Expr::value(value))
            .await
    }

    async fn set_column(
        &self,
        id: &PrincipalId,
        column: profiles::Column,
        value: sea_orm::sea_query::SimpleExpr,
    ) -> Result<Option<Profile>> {
        let result = Profiles::update_many()
            .col_expr(column, value)
            .col_expr(
                profiles::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(profiles::Column::Id.eq(id.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to update profile")?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    /// Removes the account outright: profile, principal and every
    /// credential go in one transaction, so a still signed-in device cannot
    /// bootstrap a fresh profile afterwards.
    pub async fn delete(&self, id: &PrincipalId) -> Result<bool> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to start profile delete")?;

        let result = Profiles::delete_by_id(id.as_str())
            .exec(&txn)
            .await
            .context("Failed to delete profile")?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        let revoked = PrincipalRepository::delete_sessions_for(&txn, id).await?;
        PrincipalRepository::delete_principal(&txn, id).await?;

        txn.commit().await.context("Failed to commit profile delete")?;
        debug!(principal = %id, revoked, "Account removed");
        Ok(true)
    }

    pub async fn list(&self, filter: &ProfileFilter) -> Result<Vec<Profile>> {
        let mut query = Profiles::find();

        if let Some(role) = filter.role {
            query = query.filter(profiles::Column::Role.eq(role.as_str()));
        }
        if let Some(active) = filter.active {
            query = query.filter(profiles::Column::IsActive.eq(active));
        }

        let rows = query
            .order_by_asc(profiles::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list profiles")?;

        rows.into_iter().map(Self::map_model).collect()
    }
}
