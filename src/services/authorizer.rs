//! Loads ownership facts and applies the pure policy.

use std::sync::Arc;
use tracing::debug;

use crate::backend::OwnershipLookup;
use crate::domain::{ClassroomId, PrincipalId, Role, TaskId};
use crate::error::AccessError;
use crate::models::Profile;
use crate::policy::{
    Action, ClassroomFacts, Decision, DenyReason, Feature, Operation, ProfileFacts, ProfileOp,
    TaskFacts, authorize,
};

/// An action named by resource id, before its facts are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    ListClassrooms,
    Classroom { id: &'a ClassroomId, op: Operation },
    ListTasks,
    Task { id: &'a TaskId, op: Operation },
    Profile { id: &'a PrincipalId, op: ProfileOp },
    Feature(Feature),
}

pub struct Authorizer {
    lookup: Arc<dyn OwnershipLookup>,
}

impl Authorizer {
    #[must_use]
    pub fn new(lookup: Arc<dyn OwnershipLookup>) -> Self {
        Self { lookup }
    }

    /// Evaluates `request` for `profile`.
    ///
    /// Inactive profiles are denied without touching the lookup. Admins only
    /// have the resource's existence checked.
    ///
    /// # Errors
    ///
    /// - [`AccessError::NotFound`] if the classroom or task does not exist.
    /// - [`AccessError::Database`] if a lookup fails. A failed lookup is never
    ///   reported as a denial.
    pub async fn check(
        &self,
        profile: &Profile,
        request: Request<'_>,
    ) -> Result<Decision, AccessError> {
        let decision = if profile.active {
            let action = self.load(profile, request).await?;
            authorize(profile, &action)
        } else {
            Decision::Deny(DenyReason::AccountInactive)
        };

        if let Decision::Deny(reason) = decision {
            metrics::counter!(
                "wordventure_authorization_denials_total",
                &[("reason", reason.code())]
            )
            .increment(1);
            debug!(actor = %profile.id, ?request, reason = reason.code(), "Authorization denied");
        }

        Ok(decision)
    }

    /// Like [`Self::check`] but turns a denial into [`AccessError::Denied`].
    pub async fn require(&self, profile: &Profile, request: Request<'_>) -> Result<(), AccessError> {
        self.check(profile, request).await?.into_result()
    }

    async fn load(&self, profile: &Profile, request: Request<'_>) -> Result<Action, AccessError> {
        let action = match request {
            Request::ListClassrooms => Action::ListClassrooms,
            Request::ListTasks => Action::ListTasks,
            Request::Feature(feature) => Action::Feature(feature),
            Request::Classroom { id, op } => {
                let owner = self
                    .lookup
                    .classroom_owner(id)
                    .await?
                    .ok_or_else(|| AccessError::not_found("Classroom", id))?;
                let enrolled = profile.role == Role::Student
                    && self.lookup.is_actively_enrolled(&profile.id, id).await?;
                Action::Classroom {
                    facts: ClassroomFacts::owned_by(id.clone(), owner).with_enrollment(enrolled),
                    op,
                }
            }
            Request::Task { id, op } => {
                let owner = self
                    .lookup
                    .task_owner(id)
                    .await?
                    .ok_or_else(|| AccessError::not_found("Task", id))?;
                let assigned = profile.role == Role::Student
                    && self.lookup.is_assigned(&profile.id, id).await?;
                Action::Task {
                    facts: TaskFacts::owned_by(id.clone(), owner).with_assignment(assigned),
                    op,
                }
            }
            Request::Profile { id, op } => {
                let teaches = profile.role == Role::Teacher
                    && op == ProfileOp::Read
                    && *id != profile.id
                    && self.lookup.teaches_student(&profile.id, id).await?;
                Action::Profile {
                    facts: ProfileFacts::of(id.clone()).taught_by_viewer(teaches),
                    op,
                }
            }
        };

        Ok(action)
    }
}
