use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::PrincipalId;
use crate::entities::{notifications, prelude::*};
use crate::models::{NewNotification, Notification};

impl From<notifications::Model> for Notification {
    fn from(model: notifications::Model) -> Self {
        Self {
            id: model.id,
            recipient_id: PrincipalId::from(model.recipient_id),
            sender_id: model.sender_id.map(PrincipalId::from),
            kind: model.kind,
            title: model.title,
            message: model.message,
            related_id: model.related_id,
            is_read: model.is_read,
            created_at: model.created_at,
        }
    }
}

pub struct NotificationRepository {
    conn: DatabaseConnection,
}

impl NotificationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, notification: NewNotification) -> Result<Notification> {
        let result = Notifications::insert(notifications::ActiveModel {
            recipient_id: Set(notification.recipient_id.to_string()),
            sender_id: Set(notification.sender_id.map(|id| id.to_string())),
            kind: Set(notification.kind),
            title: Set(notification.title),
            message: Set(notification.message),
            related_id: Set(notification.related_id),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        })
        .exec(&self.conn)
        .await
        .context("Failed to insert notification")?;

        self.get(result.last_insert_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Notification missing after insert"))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Notification>> {
        let row = Notifications::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query notification")?;

        Ok(row.map(Notification::from))
    }

    pub async fn list_for(
        &self,
        recipient: &PrincipalId,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let mut query =
            Notifications::find().filter(notifications::Column::RecipientId.eq(recipient.as_str()));
        if unread_only {
            query = query.filter(notifications::Column::IsRead.eq(false));
        }

        let rows = query
            .order_by_desc(notifications::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list notifications")?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    pub async fn mark_read(&self, id: i32) -> Result<Option<Notification>> {
        let result = Notifications::update_many()
            .col_expr(notifications::Column::IsRead, Expr::value(true))
            .filter(notifications::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to mark notification read")?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    pub async fn unread_count(&self, recipient: &PrincipalId) -> Result<u64> {
        Notifications::find()
            .filter(notifications::Column::RecipientId.eq(recipient.as_str()))
            .filter(notifications::Column::IsRead.eq(false))
            .count(&self.conn)
            .await
            .context("Failed to count unread notifications")
    }

    /// Marks every unread notification of `recipient` read and returns the
    /// rows that changed.
    pub async fn mark_all_read(&self, recipient: &PrincipalId) -> Result<Vec<Notification>> {
        let unread = self.list_for(recipient, true).await?;
        if unread.is_empty() {
            return Ok(unread);
        }

        let ids: Vec<i32> = unread.iter().map(|n| n.id).collect();
        Notifications::update_many()
            .col_expr(notifications::Column::IsRead, Expr::value(true))
            .filter(notifications::Column::Id.is_in(ids))
            .filter(notifications::Column::IsRead.eq(false))
            .exec(&self.conn)
            .await
            .context("Failed to mark notifications read")?;

        Ok(unread
            .into_iter()
            .map(|n| Notification { is_read: true, ..n })
            .collect())
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Notifications::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete notification")?;

        Ok(result.rows_affected > 0)
    }
}
