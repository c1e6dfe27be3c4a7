//! Domain service for the role elevation workflow.

use crate::domain::{Role, RoleRequestId, RoleRequestStatus};
use crate::error::AccessError;
use crate::models::{Profile, ReviewDecision, RoleRequest};

#[async_trait::async_trait]
pub trait RoleRequestService: Send + Sync {
    /// Files a request to be elevated to `requested_role`.
    ///
    /// # Errors
    ///
    /// - [`AccessError::RequestAlreadyPending`] if the requester already has a
    ///   pending request. The existing request is left untouched.
    /// - [`AccessError::Validation`] unless `requested_role` is above the
    ///   requester's current role.
    async fn submit(
        &self,
        requester: &Profile,
        requested_role: Role,
        request_data: serde_json::Value,
    ) -> Result<RoleRequest, AccessError>;

    /// Approves or rejects a pending request. Approval changes the
    /// requester's role atomically with the status transition.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Denied`] with `InsufficientRole` unless `reviewer` is
    ///   an admin.
    /// - [`AccessError::RequestNotFound`] / [`AccessError::RequestAlreadyReviewed`].
    async fn review(
        &self,
        reviewer: &Profile,
        id: RoleRequestId,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Result<RoleRequest, AccessError>;

    /// All requests, optionally filtered by status. Admin only.
    async fn list(
        &self,
        reviewer: &Profile,
        status: Option<RoleRequestStatus>,
    ) -> Result<Vec<RoleRequest>, AccessError>;

    /// The requester's own pending request, if any.
    async fn pending_for(&self, requester: &Profile) -> Result<Option<RoleRequest>, AccessError>;

    /// The requester's own requests in every status, newest first.
    async fn history_for(&self, requester: &Profile) -> Result<Vec<RoleRequest>, AccessError>;
}
