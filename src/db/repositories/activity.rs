use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::Serialize;

use crate::domain::PrincipalId;
use crate::entities::{prelude::*, system_activities};

/// One row of the admin audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub id: i32,
    pub actor_id: PrincipalId,
    pub activity_type: String,
    pub description: String,
    pub metadata: serde_json::Value,
    pub created_at: String,
}

impl From<system_activities::Model> for ActivityEntry {
    fn from(model: system_activities::Model) -> Self {
        Self {
            id: model.id,
            actor_id: PrincipalId::from(model.actor_id),
            activity_type: model.activity_type,
            description: model.description,
            // Rows are only written by `record`, which stores valid JSON.
            metadata: serde_json::from_str(&model.metadata).unwrap_or(serde_json::Value::Null),
            created_at: model.created_at,
        }
    }
}

pub struct ActivityRepository {
    conn: DatabaseConnection,
}

impl ActivityRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn record(
        &self,
        actor: &PrincipalId,
        activity_type: &str,
        description: &str,
        metadata: &serde_json::Value,
    ) -> Result<()> {
        SystemActivities::insert(system_activities::ActiveModel {
            actor_id: Set(actor.to_string()),
            activity_type: Set(activity_type.to_string()),
            description: Set(description.to_string()),
            metadata: Set(metadata.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        })
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to record activity")?;

        Ok(())
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<ActivityEntry>> {
        let rows = SystemActivities::find()
            .order_by_desc(system_activities::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list activities")?;

        Ok(rows.into_iter().map(ActivityEntry::from).collect())
    }

    pub async fn for_type(&self, activity_type: &str) -> Result<Vec<ActivityEntry>> {
        let rows = SystemActivities::find()
            .filter(system_activities::Column::ActivityType.eq(activity_type))
            .order_by_desc(system_activities::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list activities by type")?;

        Ok(rows.into_iter().map(ActivityEntry::from).collect())
    }
}
