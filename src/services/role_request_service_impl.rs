use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::{ActivityLog, ProfileTable, RoleRequestTable};
use crate::domain::{Role, RoleRequestId, RoleRequestStatus};
use crate::error::{AccessError, StoreError};
use crate::models::{
    NewNotification, NewRoleRequest, Profile, ProfileFilter, Review, ReviewDecision, RoleRequest,
};
use crate::policy::{Action, Feature, authorize};
use crate::services::notification_service::Notifier;
use crate::services::role_request_service::RoleRequestService;

pub struct DefaultRoleRequestService {
    requests: Arc<dyn RoleRequestTable>,
    profiles: Arc<dyn ProfileTable>,
    activity: Arc<dyn ActivityLog>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl DefaultRoleRequestService {
    #[must_use]
    pub fn new(
        requests: Arc<dyn RoleRequestTable>,
        profiles: Arc<dyn ProfileTable>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            requests,
            profiles,
            activity,
            notifier: None,
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    async fn notify_admins(&self, request: &RoleRequest, requester: &Profile) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        let admins = match self
            .profiles
            .list(&ProfileFilter::active_with_role(Role::Admin))
            .await
        {
            Ok(admins) => admins,
            Err(e) => {
                warn!("Could not load admins to notify about role request: {e}");
                return;
            }
        };

        let name = if requester.display_name.is_empty() {
            requester.email.as_str()
        } else {
            requester.display_name.as_str()
        };

        for admin in admins {
            let notification = NewNotification {
                recipient_id: admin.id,
                sender_id: Some(requester.id.clone()),
                kind: "role_request".to_string(),
                title: "New role request".to_string(),
                message: format!(
                    "{name} requested {} access",
                    request.requested_role.display_name()
                ),
                related_id: Some(request.id.to_string()),
            };
            if let Err(e) = notifier.notify(notification).await {
                warn!("Failed to notify admin about role request {}: {e}", request.id);
            }
        }
    }

    async fn notify_requester(&self, request: &RoleRequest, reviewer: &Profile) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        let (title, message) = match request.status {
            RoleRequestStatus::Approved => (
                "Role request approved",
                format!(
                    "You now have {} access",
                    request.requested_role.display_name()
                ),
            ),
            _ => (
                "Role request rejected",
                request
                    .review_notes
                    .clone()
                    .unwrap_or_else(|| "Your role request was not approved".to_string()),
            ),
        };

        let notification = NewNotification {
            recipient_id: request.requester_id.clone(),
            sender_id: Some(reviewer.id.clone()),
            kind: "role_request_reviewed".to_string(),
            title: title.to_string(),
            message,
            related_id: Some(request.id.to_string()),
        };
        if let Err(e) = notifier.notify(notification).await {
            warn!("Failed to notify requester of role request {}: {e}", request.id);
        }
    }

    async fn audit(&self, reviewer: &Profile, request: &RoleRequest) {
        let activity_type = match request.status {
            RoleRequestStatus::Approved => "role_request_approved",
            _ => "role_request_rejected",
        };
        let metadata = json!({
            "request_id": request.id.value(),
            "requester_id": request.requester_id,
            "requested_role": request.requested_role,
            "notes": request.review_notes,
        });
        let description = format!(
            "{} role request {} from {}",
            request.status, request.id, request.requester_id
        );

        if let Err(e) = self
            .activity
            .record(&reviewer.id, activity_type, &description, metadata)
            .await
        {
            warn!("Failed to record review of role request {}: {e}", request.id);
        }
    }
}

#[async_trait]
impl RoleRequestService for DefaultRoleRequestService {
    async fn submit(
        &self,
        requester: &Profile,
        requested_role: Role,
        request_data: serde_json::Value,
    ) -> Result<RoleRequest, AccessError> {
        authorize(requester, &Action::Feature(Feature::SubmitRoleRequest)).into_result()?;

        if requested_role <= requester.role {
            return Err(AccessError::validation(format!(
                "Cannot request {} access while holding {} access",
                requested_role.display_name(),
                requester.role.display_name()
            )));
        }

        if self.requests.find_pending(&requester.id).await?.is_some() {
            return Err(AccessError::RequestAlreadyPending);
        }

        let request = match self
            .requests
            .insert(NewRoleRequest {
                requester_id: requester.id.clone(),
                requested_role,
                request_data,
            })
            .await
        {
            Ok(request) => request,
            Err(StoreError::Conflict(_)) => return Err(AccessError::RequestAlreadyPending),
            Err(e) => return Err(e.into()),
        };

        info!(
            request_id = %request.id,
            requester = %requester.id,
            requested_role = %requested_role,
            "Role request submitted"
        );

        self.notify_admins(&request, requester).await;
        Ok(request)
    }

    async fn review(
        &self,
        reviewer: &Profile,
        id: RoleRequestId,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Result<RoleRequest, AccessError> {
        authorize(reviewer, &Action::Feature(Feature::ReviewRoleRequests)).into_result()?;

        let current = self
            .requests
            .get(id)
            .await?
            .ok_or(AccessError::RequestNotFound(id))?;
        if current.status.is_terminal() {
            return Err(AccessError::RequestAlreadyReviewed(id));
        }

        let review = Review {
            request_id: id,
            reviewer_id: reviewer.id.clone(),
            decision,
            notes: notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        };

        let result = match decision {
            ReviewDecision::Approve => self.requests.approve(&review).await,
            ReviewDecision::Reject => self.requests.reject(&review).await,
        };
        let reviewed = match result {
            Ok(request) => request,
            Err(StoreError::Conflict(_)) => return Err(AccessError::RequestAlreadyReviewed(id)),
            Err(e) => return Err(e.into()),
        };

        info!(
            request_id = %id,
            reviewer = %reviewer.id,
            status = %reviewed.status,
            "Role request reviewed"
        );

        self.audit(reviewer, &reviewed).await;
        self.notify_requester(&reviewed, reviewer).await;
        Ok(reviewed)
    }

    async fn list(
        &self,
        reviewer: &Profile,
        status: Option<RoleRequestStatus>,
    ) -> Result<Vec<RoleRequest>, AccessError> {
        authorize(reviewer, &Action::Feature(Feature::ReviewRoleRequests)).into_result()?;
        Ok(self.requests.list(status).await?)
    }

    async fn pending_for(&self, requester: &Profile) -> Result<Option<RoleRequest>, AccessError> {
        Ok(self.requests.find_pending(&requester.id).await?)
    }

    async fn history_for(&self, requester: &Profile) -> Result<Vec<RoleRequest>, AccessError> {
        Ok(self.requests.list_for_requester(&requester.id).await?)
    }
}
