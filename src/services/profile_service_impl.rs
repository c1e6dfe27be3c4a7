use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::{ActivityLog, ProfileTable};
use crate::domain::{PrincipalId, Role};
use crate::error::AccessError;
use crate::models::{Profile, ProfileChanges, ProfileFilter};
use crate::policy::{Feature, ProfileOp};
use crate::services::authorizer::{Authorizer, Request};
use crate::services::profile_service::ProfileService;
use crate::validation::validate_display_name;

pub struct DefaultProfileService {
    profiles: Arc<dyn ProfileTable>,
    authorizer: Arc<Authorizer>,
    activity: Arc<dyn ActivityLog>,
}

impl DefaultProfileService {
    #[must_use]
    pub fn new(
        profiles: Arc<dyn ProfileTable>,
        authorizer: Arc<Authorizer>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            profiles,
            authorizer,
            activity,
        }
    }

    async fn audit(
        &self,
        actor: &Profile,
        activity_type: &str,
        description: String,
        metadata: serde_json::Value,
    ) {
        if let Err(e) = self
            .activity
            .record(&actor.id, activity_type, &description, metadata)
            .await
        {
            warn!("Failed to record {activity_type}: {e}");
        }
    }

    fn reject_self(actor: &Profile, id: &PrincipalId, what: &str) -> Result<(), AccessError> {
        if actor.id == *id {
            return Err(AccessError::validation(format!("You cannot {what} yourself")));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileService for DefaultProfileService {
    async fn get(&self, actor: &Profile, id: &PrincipalId) -> Result<Profile, AccessError> {
        self.authorizer
            .require(actor, Request::Profile { id, op: ProfileOp::Read })
            .await?;

        self.profiles
            .fetch(id)
            .await?
            .ok_or_else(|| AccessError::not_found("Profile", id))
    }

    async fn update_own(
        &self,
        actor: &Profile,
        mut changes: ProfileChanges,
    ) -> Result<Profile, AccessError> {
        self.authorizer
            .require(
                actor,
                Request::Profile {
                    id: &actor.id,
                    op: ProfileOp::UpdateDetails,
                },
            )
            .await?;

        if let Some(name) = changes.display_name.take() {
            changes.display_name = Some(validate_display_name(&name)?.to_string());
        }

        if changes.is_empty() {
            return self
                .profiles
                .fetch(&actor.id)
                .await?
                .ok_or_else(|| AccessError::not_found("Profile", &actor.id));
        }

        self.profiles
            .update_details(&actor.id, &changes)
            .await?
            .ok_or_else(|| AccessError::not_found("Profile", &actor.id))
    }

    async fn list(
        &self,
        actor: &Profile,
        filter: ProfileFilter,
    ) -> Result<Vec<Profile>, AccessError> {
        self.authorizer
            .require(actor, Request::Feature(Feature::ManageUsers))
            .await?;

        Ok(self.profiles.list(&filter).await?)
    }

    async fn set_active(
        &self,
        actor: &Profile,
        id: &PrincipalId,
        active: bool,
    ) -> Result<Profile, AccessError> {
        self.authorizer
            .require(
                actor,
                Request::Profile {
                    id,
                    op: ProfileOp::UpdateActive,
                },
            )
            .await?;
        if !active {
            Self::reject_self(actor, id, "deactivate")?;
        }

        let updated = self
            .profiles
            .set_active(id, active)
            .await?
            .ok_or_else(|| AccessError::not_found("Profile", id))?;

        info!(admin = %actor.id, target = %id, active, "Profile active flag changed");
        let (activity_type, verb) = if active {
            ("user_activated", "Activated")
        } else {
            ("user_deactivated", "Deactivated")
        };
        self.audit(
            actor,
            activity_type,
            format!("{verb} {}", updated.email),
            json!({ "user_id": id, "active": active }),
        )
        .await;

        Ok(updated)
    }

    async fn set_role(
        &self,
        actor: &Profile,
        id: &PrincipalId,
        role: Role,
    ) -> Result<Profile, AccessError> {
        self.authorizer
            .require(
                actor,
                Request::Profile {
                    id,
                    op: ProfileOp::UpdateRole,
                },
            )
            .await?;
        Self::reject_self(actor, id, "change the role of")?;

        let previous = self
            .profiles
            .fetch(id)
            .await?
            .ok_or_else(|| AccessError::not_found("Profile", id))?;

        let updated = self
            .profiles
            .set_role(id, role)
            .await?
            .ok_or_else(|| AccessError::not_found("Profile", id))?;

        info!(admin = %actor.id, target = %id, role = %role, "Profile role changed");
        self.audit(
            actor,
            "user_role_changed",
            format!(
                "Changed role of {} from {} to {}",
                updated.email, previous.role, role
            ),
            json!({ "user_id": id, "from": previous.role, "to": role }),
        )
        .await;

        Ok(updated)
    }

    async fn delete(&self, actor: &Profile, id: &PrincipalId) -> Result<(), AccessError> {
        self.authorizer
            .require(
                actor,
                Request::Profile {
                    id,
                    op: ProfileOp::Delete,
                },
            )
            .await?;
        Self::reject_self(actor, id, "delete")?;

        if !self.profiles.delete(id).await? {
            return Err(AccessError::not_found("Profile", id));
        }

        info!(admin = %actor.id, target = %id, "Profile deleted");
        self.audit(
            actor,
            "user_deleted",
            format!("Deleted profile {id}"),
            json!({ "user_id": id }),
        )
        .await;

        Ok(())
    }
}
