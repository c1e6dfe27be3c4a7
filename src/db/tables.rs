//! SQLite implementations of the backend table contracts.

use async_trait::async_trait;

use super::Store;
use super::repositories::role_request::ReviewOutcome;
use crate::backend::{ActivityLog, OwnershipLookup, ProfileTable, RoleRequestTable};
use crate::domain::{ClassroomId, PrincipalId, Role, RoleRequestId, RoleRequestStatus, TaskId};
use crate::error::StoreError;
use crate::models::{
    NewProfile, NewRoleRequest, Profile, ProfileChanges, ProfileFilter, Review, ReviewDecision,
    RoleRequest,
};

#[async_trait]
impl ProfileTable for Store {
    async fn fetch(&self, id: &PrincipalId) -> Result<Option<Profile>, StoreError> {
        Ok(self.profile_repo().get(id).await?)
    }

    async fn insert(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        Ok(self.profile_repo().insert(profile).await?)
    }

    async fn update_details(
        &self,
        id: &PrincipalId,
        changes: &ProfileChanges,
    ) -> Result<Option<Profile>, StoreError> {
        Ok(self.profile_repo().update_details(id, changes).await?)
    }

    async fn set_role(&self, id: &PrincipalId, role: Role) -> Result<Option<Profile>, StoreError> {
        Ok(self.profile_repo().set_role(id, role).await?)
    }

    async fn set_active(
        &self,
        id: &PrincipalId,
        active: bool,
    ) -> Result<Option<Profile>, StoreError> {
        Ok(self.profile_repo().set_active(id, active).await?)
    }

    async fn delete(&self, id: &PrincipalId) -> Result<bool, StoreError> {
        Ok(self.profile_repo().delete(id).await?)
    }

    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, StoreError> {
        Ok(self.profile_repo().list(filter).await?)
    }
}

#[async_trait]
impl OwnershipLookup for Store {
    async fn classroom_owner(&self, id: &ClassroomId) -> Result<Option<PrincipalId>, StoreError> {
        Ok(self.classroom_repo().owner(id).await?)
    }

    async fn is_actively_enrolled(
        &self,
        student: &PrincipalId,
        classroom: &ClassroomId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .classroom_repo()
            .is_actively_enrolled(student, classroom)
            .await?)
    }

    async fn task_owner(&self, id: &TaskId) -> Result<Option<PrincipalId>, StoreError> {
        Ok(self.task_repo().owner(id).await?)
    }

    async fn is_assigned(&self, student: &PrincipalId, task: &TaskId) -> Result<bool, StoreError> {
        Ok(self.task_repo().is_assigned(student, task).await?)
    }

    async fn teaches_student(
        &self,
        teacher: &PrincipalId,
        student: &PrincipalId,
    ) -> Result<bool, StoreError> {
        Ok(self.classroom_repo().teaches_student(teacher, student).await?)
    }
}

impl Store {
    async fn apply_review(&self, review: &Review) -> Result<RoleRequest, StoreError> {
        match self.role_request_repo().review(review).await? {
            ReviewOutcome::Reviewed(request) => Ok(request),
            ReviewOutcome::RequestMissing => Err(StoreError::NotFound(format!(
                "Role request {}",
                review.request_id
            ))),
            ReviewOutcome::NotPending(request) => Err(StoreError::Conflict(format!(
                "Role request {} is already {}",
                request.id, request.status
            ))),
            ReviewOutcome::RequesterMissing => Err(StoreError::NotFound(format!(
                "Profile for role request {}",
                review.request_id
            ))),
        }
    }
}

#[async_trait]
impl RoleRequestTable for Store {
    async fn find_pending(
        &self,
        requester: &PrincipalId,
    ) -> Result<Option<RoleRequest>, StoreError> {
        Ok(self.role_request_repo().find_pending(requester).await?)
    }

    async fn insert(&self, request: NewRoleRequest) -> Result<RoleRequest, StoreError> {
        Ok(self.role_request_repo().insert(request).await?)
    }

    async fn get(&self, id: RoleRequestId) -> Result<Option<RoleRequest>, StoreError> {
        Ok(self.role_request_repo().get(id).await?)
    }

    async fn list_for_requester(
        &self,
        requester: &PrincipalId,
    ) -> Result<Vec<RoleRequest>, StoreError> {
        Ok(self.role_request_repo().list_for_requester(requester).await?)
    }

    async fn list(
        &self,
        status: Option<RoleRequestStatus>,
    ) -> Result<Vec<RoleRequest>, StoreError> {
        Ok(self.role_request_repo().list(status).await?)
    }

    async fn approve(&self, review: &Review) -> Result<RoleRequest, StoreError> {
        let review = Review {
            decision: ReviewDecision::Approve,
            ..review.clone()
        };
        self.apply_review(&review).await
    }

    async fn reject(&self, review: &Review) -> Result<RoleRequest, StoreError> {
        let review = Review {
            decision: ReviewDecision::Reject,
            ..review.clone()
        };
        self.apply_review(&review).await
    }
}

#[async_trait]
impl ActivityLog for Store {
    async fn record(
        &self,
        actor: &PrincipalId,
        activity_type: &str,
        description: &str,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError> {
        Ok(self
            .activity_repo()
            .record(actor, activity_type, description, &metadata)
            .await?)
    }
}
