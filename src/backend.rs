//! Contracts expected from the hosted backend.
//!
//! The services in this crate depend only on these traits. [`crate::db::Store`]
//! implements the table traits on SQLite and
//! [`crate::services::SeaOrmCredentialStore`] implements [`CredentialStore`].

use async_trait::async_trait;

use crate::domain::{ClassroomId, PrincipalId, Role, RoleRequestId, RoleRequestStatus, TaskId};
use crate::error::{AccessError, StoreError};
use crate::models::{
    Credential, NewProfile, NewRoleRequest, Profile, ProfileChanges, ProfileFilter, Review,
    RoleRequest,
};

/// Issues and validates bearer credentials. Holds the device's current
/// credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Registers a principal and signs it in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Credential, AccessError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Credential, AccessError>;

    /// Invalidates the current credential. A no-op when signed out.
    async fn sign_out(&self) -> Result<(), AccessError>;

    /// The stored credential if it is still valid.
    async fn current_credential(&self) -> Result<Option<Credential>, StoreError>;

    async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccessError>;
}

/// Profile rows keyed by principal id, unique on `id`.
#[async_trait]
pub trait ProfileTable: Send + Sync {
    async fn fetch(&self, id: &PrincipalId) -> Result<Option<Profile>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the row already exists.
    async fn insert(&self, profile: NewProfile) -> Result<Profile, StoreError>;

    async fn update_details(
        &self,
        id: &PrincipalId,
        changes: &ProfileChanges,
    ) -> Result<Option<Profile>, StoreError>;

    async fn set_role(&self, id: &PrincipalId, role: Role) -> Result<Option<Profile>, StoreError>;

    async fn set_active(
        &self,
        id: &PrincipalId,
        active: bool,
    ) -> Result<Option<Profile>, StoreError>;

    /// Removes the profile along with its principal and credentials.
    /// Returns true if a profile was removed.
    async fn delete(&self, id: &PrincipalId) -> Result<bool, StoreError>;

    async fn list(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, StoreError>;
}

/// Row filters answering the ownership predicates of the policy.
#[async_trait]
pub trait OwnershipLookup: Send + Sync {
    async fn classroom_owner(&self, id: &ClassroomId) -> Result<Option<PrincipalId>, StoreError>;

    async fn is_actively_enrolled(
        &self,
        student: &PrincipalId,
        classroom: &ClassroomId,
    ) -> Result<bool, StoreError>;

    async fn task_owner(&self, id: &TaskId) -> Result<Option<PrincipalId>, StoreError>;

    async fn is_assigned(&self, student: &PrincipalId, task: &TaskId) -> Result<bool, StoreError>;

    /// True if `student` is actively enrolled in a classroom `teacher` owns.
    async fn teaches_student(
        &self,
        teacher: &PrincipalId,
        student: &PrincipalId,
    ) -> Result<bool, StoreError>;
}

/// Role elevation requests, with at most one pending row per requester.
#[async_trait]
pub trait RoleRequestTable: Send + Sync {
    async fn find_pending(
        &self,
        requester: &PrincipalId,
    ) -> Result<Option<RoleRequest>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the requester already has a
    /// pending request.
    async fn insert(&self, request: NewRoleRequest) -> Result<RoleRequest, StoreError>;

    async fn get(&self, id: RoleRequestId) -> Result<Option<RoleRequest>, StoreError>;

    /// Every request filed by `requester`, newest first.
    async fn list_for_requester(
        &self,
        requester: &PrincipalId,
    ) -> Result<Vec<RoleRequest>, StoreError>;

    async fn list(
        &self,
        status: Option<RoleRequestStatus>,
    ) -> Result<Vec<RoleRequest>, StoreError>;

    /// Marks the request approved and sets the requester's role in one
    /// transaction. Either both changes commit or neither does.
    ///
    /// Fails with [`StoreError::Conflict`] if the request is no longer pending
    /// and [`StoreError::NotFound`] if the request or the requester's profile
    /// is missing.
    async fn approve(&self, review: &Review) -> Result<RoleRequest, StoreError>;

    async fn reject(&self, review: &Review) -> Result<RoleRequest, StoreError>;
}

/// Audit trail for admin operations.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(
        &self,
        actor: &PrincipalId,
        activity_type: &str,
        description: &str,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError>;
}
