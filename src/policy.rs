//! Role authorization policy.
//!
//! [`authorize`] is a pure function of the acting profile and an [`Action`]
//! whose ownership facts have already been loaded. Loading those facts from
//! the backing tables is the job of [`crate::services::Authorizer`].
//!
//! Two distinct mechanisms live here:
//! - minimum-role checks for [`Feature`]s, using the `Student < Teacher < Admin` order;
//! - ownership checks for classrooms, tasks and profiles, where admins bypass
//!   and teachers and students never reach each other's resources.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{ClassroomId, PrincipalId, Role, TaskId};
use crate::error::AccessError;
use crate::models::Profile;

/// Why an action was refused. Always carried by a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NotOwner,
    NotEnrolled,
    InsufficientRole,
    AccountInactive,
}

impl DenyReason {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotOwner => "not_owner",
            Self::NotEnrolled => "not_enrolled",
            Self::InsufficientRole => "insufficient_role",
            Self::AccountInactive => "account_inactive",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NotOwner => "you do not own this resource",
            Self::NotEnrolled => "you are not enrolled or assigned here",
            Self::InsufficientRole => "your role does not permit this action",
            Self::AccountInactive => "your account is inactive",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn into_result(self) -> Result<(), AccessError> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(AccessError::Denied(reason)),
        }
    }
}

/// Capabilities gated only by a minimum role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    JoinClassroom,
    SubmitRoleRequest,
    CreateClassroom,
    CreateTask,
    ViewStudentProgress,
    ManageUsers,
    ReviewRoleRequests,
    ManageContent,
    ViewSystemAnalytics,
    ExportData,
}

impl Feature {
    #[must_use]
    pub const fn minimum_role(self) -> Role {
        match self {
            Self::JoinClassroom | Self::SubmitRoleRequest => Role::Student,
            Self::CreateClassroom | Self::CreateTask | Self::ViewStudentProgress => Role::Teacher,
            Self::ManageUsers
            | Self::ReviewRoleRequests
            | Self::ManageContent
            | Self::ViewSystemAnalytics
            | Self::ExportData => Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    View,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileOp {
    Read,
    UpdateDetails,
    UpdateRole,
    UpdateActive,
    Delete,
}

/// Ownership facts about one classroom, relative to the acting profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassroomFacts {
    pub id: ClassroomId,
    pub teacher_id: PrincipalId,
    /// The actor holds an active enrollment in this classroom.
    pub viewer_enrolled: bool,
}

impl ClassroomFacts {
    pub fn owned_by(id: impl Into<ClassroomId>, teacher_id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            teacher_id: teacher_id.into(),
            viewer_enrolled: false,
        }
    }

    #[must_use]
    pub const fn with_enrollment(mut self, enrolled: bool) -> Self {
        self.viewer_enrolled = enrolled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFacts {
    pub id: TaskId,
    pub teacher_id: PrincipalId,
    /// An assignment links the actor to this task.
    pub viewer_assigned: bool,
}

impl TaskFacts {
    pub fn owned_by(id: impl Into<TaskId>, teacher_id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            teacher_id: teacher_id.into(),
            viewer_assigned: false,
        }
    }

    #[must_use]
    pub const fn with_assignment(mut self, assigned: bool) -> Self {
        self.viewer_assigned = assigned;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFacts {
    pub id: PrincipalId,
    /// The target is a student actively enrolled in one of the actor's classrooms.
    pub viewer_teaches: bool,
}

impl ProfileFacts {
    pub fn of(id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            viewer_teaches: false,
        }
    }

    #[must_use]
    pub const fn taught_by_viewer(mut self, teaches: bool) -> Self {
        self.viewer_teaches = teaches;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ListClassrooms,
    Classroom { facts: ClassroomFacts, op: Operation },
    ListTasks,
    Task { facts: TaskFacts, op: Operation },
    Profile { facts: ProfileFacts, op: ProfileOp },
    Feature(Feature),
}

/// Decides whether `profile` may perform `action`.
#[must_use]
pub fn authorize(profile: &Profile, action: &Action) -> Decision {
    if !profile.active {
        return Decision::Deny(DenyReason::AccountInactive);
    }

    if let Action::Feature(feature) = action {
        return feature_decision(profile.role, *feature);
    }

    match profile.role {
        Role::Admin => Decision::Allow,
        Role::Teacher => teacher_decision(&profile.id, action),
        Role::Student => student_decision(&profile.id, action),
    }
}

fn teacher_decision(actor: &PrincipalId, action: &Action) -> Decision {
    match action {
        Action::ListClassrooms | Action::ListTasks => Decision::Allow,
        Action::Classroom { facts, .. } => owner_only(actor, &facts.teacher_id),
        Action::Task { facts, .. } => owner_only(actor, &facts.teacher_id),
        Action::Profile { facts, op } => match op {
            ProfileOp::Read if facts.id == *actor || facts.viewer_teaches => Decision::Allow,
            ProfileOp::UpdateDetails if facts.id == *actor => Decision::Allow,
            ProfileOp::Read | ProfileOp::UpdateDetails => Decision::Deny(DenyReason::NotOwner),
            ProfileOp::UpdateRole | ProfileOp::UpdateActive | ProfileOp::Delete => {
                Decision::Deny(DenyReason::InsufficientRole)
            }
        },
        Action::Feature(feature) => feature_decision(Role::Teacher, *feature),
    }
}

fn student_decision(actor: &PrincipalId, action: &Action) -> Decision {
    match action {
        Action::ListClassrooms | Action::ListTasks => Decision::Allow,
        Action::Classroom { facts, op } => match op {
            Operation::View if facts.viewer_enrolled => Decision::Allow,
            Operation::View => Decision::Deny(DenyReason::NotEnrolled),
            Operation::Edit => Decision::Deny(DenyReason::InsufficientRole),
        },
        // Edit on a task means progressing the student's own assignment.
        Action::Task { facts, .. } => {
            if facts.viewer_assigned {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotEnrolled)
            }
        }
        Action::Profile { facts, op } => match op {
            ProfileOp::Read | ProfileOp::UpdateDetails if facts.id == *actor => Decision::Allow,
            ProfileOp::Read | ProfileOp::UpdateDetails => Decision::Deny(DenyReason::NotOwner),
            ProfileOp::UpdateRole | ProfileOp::UpdateActive | ProfileOp::Delete => {
                Decision::Deny(DenyReason::InsufficientRole)
            }
        },
        Action::Feature(feature) => feature_decision(Role::Student, *feature),
    }
}

fn feature_decision(role: Role, feature: Feature) -> Decision {
    if role.at_least(feature.minimum_role()) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::InsufficientRole)
    }
}

fn owner_only(actor: &PrincipalId, owner: &PrincipalId) -> Decision {
    if actor == owner {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::NotOwner)
    }
}

/// Capability summary for a role, for clients that toggle UI affordances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Permissions {
    pub can_update_own_profile: bool,
    pub can_receive_notifications: bool,
    pub can_join_classrooms: bool,
    pub can_submit_assignments: bool,
    pub can_request_role: bool,
    pub can_create_classrooms: bool,
    pub can_create_tasks: bool,
    pub can_view_student_progress: bool,
    pub can_manage_users: bool,
    pub can_review_role_requests: bool,
    pub can_manage_content: bool,
    pub can_view_system_analytics: bool,
    pub can_export_data: bool,
}

impl Permissions {
    #[must_use]
    pub fn for_profile(profile: &Profile) -> Self {
        if !profile.active {
            return Self::default();
        }

        let role = profile.role;
        let has = |feature: Feature| role.at_least(feature.minimum_role());
        Self {
            can_update_own_profile: true,
            can_receive_notifications: true,
            can_join_classrooms: role == Role::Student,
            can_submit_assignments: role == Role::Student,
            can_request_role: role < Role::Admin,
            can_create_classrooms: has(Feature::CreateClassroom),
            can_create_tasks: has(Feature::CreateTask),
            can_view_student_progress: has(Feature::ViewStudentProgress),
            can_manage_users: has(Feature::ManageUsers),
            can_review_role_requests: has(Feature::ReviewRoleRequests),
            can_manage_content: has(Feature::ManageContent),
            can_view_system_analytics: has(Feature::ViewSystemAnalytics),
            can_export_data: has(Feature::ExportData),
        }
    }
}
