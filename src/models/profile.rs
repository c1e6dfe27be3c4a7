use serde::{Deserialize, Serialize};

use crate::domain::{PrincipalId, Role};
use crate::models::Principal;

/// Application-level record for a principal: role, state and preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: PrincipalId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub active: bool,
    /// Parent teacher, for students.
    pub teacher_id: Option<PrincipalId>,
    pub notifications_enabled: bool,
    pub sound_enabled: bool,
    pub dark_mode: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Row inserted by the profile bootstrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub id: PrincipalId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub active: bool,
}

impl NewProfile {
    /// Minimal lowest-privilege profile for a freshly authenticated principal.
    #[must_use]
    pub fn bootstrap(principal: &Principal) -> Self {
        Self {
            id: principal.id.clone(),
            email: principal.email.clone(),
            display_name: principal.email_local_part().to_string(),
            role: Role::Student,
            active: true,
        }
    }
}

/// Owner-editable fields. `None` leaves the stored value unchanged.
///
/// Role and active flag are deliberately absent: they change only through
/// admin operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub notifications_enabled: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub dark_mode: Option<bool>,
}

impl ProfileChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.notifications_enabled.is_none()
            && self.sound_enabled.is_none()
            && self.dark_mode.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFilter {
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl ProfileFilter {
    #[must_use]
    pub const fn active_with_role(role: Role) -> Self {
        Self {
            role: Some(role),
            active: Some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_profile_is_lowest_privilege() {
        let principal = Principal {
            id: PrincipalId::new("u1"),
            email: "kid@school.test".to_string(),
        };
        let profile = NewProfile::bootstrap(&principal);
        assert_eq!(profile.role, Role::Student);
        assert!(profile.active);
        assert_eq!(profile.display_name, "kid");
        assert_eq!(profile.id, principal.id);
    }

    #[test]
    fn empty_changes() {
        assert!(ProfileChanges::default().is_empty());
        let changes = ProfileChanges {
            dark_mode: Some(true),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
