//! Domain service for reading and managing profiles.
//!
//! Owners edit their display name and preferences. Role, active flag and
//! deletion are admin operations and are written to the audit trail.

use crate::domain::{PrincipalId, Role};
use crate::error::AccessError;
use crate::models::{Profile, ProfileChanges, ProfileFilter};

#[async_trait::async_trait]
pub trait ProfileService: Send + Sync {
    /// Own profile, any profile for admins, or an enrolled student's profile
    /// for their teacher.
    async fn get(&self, actor: &Profile, id: &PrincipalId) -> Result<Profile, AccessError>;

    async fn update_own(
        &self,
        actor: &Profile,
        changes: ProfileChanges,
    ) -> Result<Profile, AccessError>;

    /// Admin only.
    async fn list(&self, actor: &Profile, filter: ProfileFilter)
    -> Result<Vec<Profile>, AccessError>;

    /// Admin only. Admins cannot deactivate themselves.
    async fn set_active(
        &self,
        actor: &Profile,
        id: &PrincipalId,
        active: bool,
    ) -> Result<Profile, AccessError>;

    /// Admin only. Admins cannot change their own role.
    async fn set_role(
        &self,
        actor: &Profile,
        id: &PrincipalId,
        role: Role,
    ) -> Result<Profile, AccessError>;

    /// Admin only. Hard delete; admins cannot delete themselves.
    async fn delete(&self, actor: &Profile, id: &PrincipalId) -> Result<(), AccessError>;
}
