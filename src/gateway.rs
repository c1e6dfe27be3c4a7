//! Public boundary of the crate.
//!
//! Every call resolves the acting session, delegates to a service and folds
//! the result into an [`Outcome`]. Nothing here panics or returns a raw
//! error, so callers only ever branch on `success`.

use serde_json::Value;
use std::sync::Arc;

use crate::domain::{
    AssignmentStatus, ClassroomId, PrincipalId, Role, RoleRequestId, RoleRequestStatus, TaskId,
};
use crate::envelope::Outcome;
use crate::error::AccessError;
use crate::models::{
    Assignment, Classroom, Enrollment, NewClassroom, NewTask, Notification, Profile,
    ProfileChanges, ProfileFilter, ReviewDecision, RoleRequest, Task,
};
use crate::policy::Permissions;
use crate::services::{
    ClassroomService, NotificationService, ProfileService, RoleRequestService, SessionService,
    Subscription,
};
use crate::session::{SessionState, SessionView};

#[derive(Clone)]
pub struct Gateway {
    sessions: Arc<dyn SessionService>,
    profiles: Arc<dyn ProfileService>,
    role_requests: Arc<dyn RoleRequestService>,
    classrooms: Arc<dyn ClassroomService>,
    notifications: Arc<NotificationService>,
}

impl Gateway {
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionService>,
        profiles: Arc<dyn ProfileService>,
        role_requests: Arc<dyn RoleRequestService>,
        classrooms: Arc<dyn ClassroomService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            sessions,
            profiles,
            role_requests,
            classrooms,
            notifications,
        }
    }

    /// The acting profile, re-resolved so role changes and deactivation take
    /// effect on the next call.
    async fn actor(&self) -> Result<Profile, AccessError> {
        match self.sessions.resolve_session().await? {
            SessionState::Authenticated(session) => Ok(session.profile.clone()),
            SessionState::Unauthenticated => Err(AccessError::Unauthenticated),
        }
    }

    // Session

    pub async fn session(&self) -> Outcome<SessionView> {
        self.sessions
            .resolve_session()
            .await
            .map(|state| state.view())
            .into()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Outcome<SessionView> {
        self.sessions
            .sign_in(email, password)
            .await
            .map(|session| SessionState::Authenticated(session).view())
            .into()
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Outcome<SessionView> {
        self.sessions
            .sign_up(email, password)
            .await
            .map(|session| SessionState::Authenticated(session).view())
            .into()
    }

    pub async fn sign_out(&self) -> Outcome<()> {
        self.sessions.sign_out().await.into()
    }

    pub async fn change_password(&self, current: &str, new: &str) -> Outcome<()> {
        self.sessions.change_password(current, new).await.into()
    }

    pub async fn permissions(&self) -> Outcome<Permissions> {
        self.actor()
            .await
            .map(|actor| Permissions::for_profile(&actor))
            .into()
    }

    // Profiles

    pub async fn my_profile(&self) -> Outcome<Profile> {
        self.actor().await.into()
    }

    pub async fn get_profile(&self, id: &PrincipalId) -> Outcome<Profile> {
        async {
            let actor = self.actor().await?;
            self.profiles.get(&actor, id).await
        }
        .await
        .into()
    }

    pub async fn update_profile(&self, changes: ProfileChanges) -> Outcome<Profile> {
        async {
            let actor = self.actor().await?;
            self.profiles.update_own(&actor, changes).await
        }
        .await
        .into()
    }

    pub async fn list_profiles(&self, filter: ProfileFilter) -> Outcome<Vec<Profile>> {
        async {
            let actor = self.actor().await?;
            self.profiles.list(&actor, filter).await
        }
        .await
        .into()
    }

    pub async fn set_profile_active(&self, id: &PrincipalId, active: bool) -> Outcome<Profile> {
        async {
            let actor = self.actor().await?;
            self.profiles.set_active(&actor, id, active).await
        }
        .await
        .into()
    }

    pub async fn set_profile_role(&self, id: &PrincipalId, role: Role) -> Outcome<Profile> {
        async {
            let actor = self.actor().await?;
            self.profiles.set_role(&actor, id, role).await
        }
        .await
        .into()
    }

    pub async fn delete_profile(&self, id: &PrincipalId) -> Outcome<()> {
        async {
            let actor = self.actor().await?;
            self.profiles.delete(&actor, id).await
        }
        .await
        .into()
    }

    // Role requests

    pub async fn submit_role_request(
        &self,
        requested_role: Role,
        request_data: Value,
    ) -> Outcome<RoleRequest> {
        async {
            let actor = self.actor().await?;
            self.role_requests
                .submit(&actor, requested_role, request_data)
                .await
        }
        .await
        .into()
    }

    pub async fn review_role_request(
        &self,
        id: RoleRequestId,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Outcome<RoleRequest> {
        async {
            let actor = self.actor().await?;
            self.role_requests.review(&actor, id, decision, notes).await
        }
        .await
        .into()
    }

    pub async fn list_role_requests(
        &self,
        status: Option<RoleRequestStatus>,
    ) -> Outcome<Vec<RoleRequest>> {
        async {
            let actor = self.actor().await?;
            self.role_requests.list(&actor, status).await
        }
        .await
        .into()
    }

    pub async fn my_pending_role_request(&self) -> Outcome<Option<RoleRequest>> {
        async {
            let actor = self.actor().await?;
            self.role_requests.pending_for(&actor).await
        }
        .await
        .into()
    }

    pub async fn my_role_requests(&self) -> Outcome<Vec<RoleRequest>> {
        async {
            let actor = self.actor().await?;
            self.role_requests.history_for(&actor).await
        }
        .await
        .into()
    }

    // Classrooms and tasks

    pub async fn create_classroom(&self, classroom: NewClassroom) -> Outcome<Classroom> {
        async {
            let actor = self.actor().await?;
            self.classrooms.create_classroom(&actor, classroom).await
        }
        .await
        .into()
    }

    pub async fn get_classroom(&self, id: &ClassroomId) -> Outcome<Classroom> {
        async {
            let actor = self.actor().await?;
            self.classrooms.get_classroom(&actor, id).await
        }
        .await
        .into()
    }

    pub async fn list_classrooms(&self) -> Outcome<Vec<Classroom>> {
        async {
            let actor = self.actor().await?;
            self.classrooms.list_classrooms(&actor).await
        }
        .await
        .into()
    }

    pub async fn join_classroom(&self, class_code: &str) -> Outcome<Enrollment> {
        async {
            let actor = self.actor().await?;
            self.classrooms.join_classroom(&actor, class_code).await
        }
        .await
        .into()
    }

    pub async fn remove_student(
        &self,
        classroom: &ClassroomId,
        student: &PrincipalId,
    ) -> Outcome<()> {
        async {
            let actor = self.actor().await?;
            self.classrooms
                .remove_student(&actor, classroom, student)
                .await
        }
        .await
        .into()
    }

    pub async fn list_enrollments(&self, classroom: &ClassroomId) -> Outcome<Vec<Enrollment>> {
        async {
            let actor = self.actor().await?;
            self.classrooms.list_enrollments(&actor, classroom).await
        }
        .await
        .into()
    }

    pub async fn create_task(&self, task: NewTask) -> Outcome<Task> {
        async {
            let actor = self.actor().await?;
            self.classrooms.create_task(&actor, task).await
        }
        .await
        .into()
    }

    pub async fn get_task(&self, id: &TaskId) -> Outcome<Task> {
        async {
            let actor = self.actor().await?;
            self.classrooms.get_task(&actor, id).await
        }
        .await
        .into()
    }

    pub async fn list_tasks(&self) -> Outcome<Vec<Task>> {
        async {
            let actor = self.actor().await?;
            self.classrooms.list_tasks(&actor).await
        }
        .await
        .into()
    }

    pub async fn assign_task(&self, task: &TaskId, student: &PrincipalId) -> Outcome<Assignment> {
        async {
            let actor = self.actor().await?;
            self.classrooms.assign_task(&actor, task, student).await
        }
        .await
        .into()
    }

    pub async fn update_assignment_status(
        &self,
        task: &TaskId,
        status: AssignmentStatus,
    ) -> Outcome<Assignment> {
        async {
            let actor = self.actor().await?;
            self.classrooms
                .update_assignment_status(&actor, task, status)
                .await
        }
        .await
        .into()
    }

    // Notifications

    pub async fn notifications(&self, unread_only: bool) -> Outcome<Vec<Notification>> {
        async {
            let actor = self.actor().await?;
            self.notifications.list(&actor.id, unread_only).await
        }
        .await
        .into()
    }

    pub async fn mark_notification_read(&self, id: i32) -> Outcome<Notification> {
        async {
            let actor = self.actor().await?;
            self.notifications.mark_read(&actor, id).await
        }
        .await
        .into()
    }

    pub async fn unread_notification_count(&self) -> Outcome<u64> {
        async {
            let actor = self.actor().await?;
            self.notifications.unread_count(&actor.id).await
        }
        .await
        .into()
    }

    pub async fn mark_all_notifications_read(&self) -> Outcome<Vec<Notification>> {
        async {
            let actor = self.actor().await?;
            self.notifications.mark_all_read(&actor).await
        }
        .await
        .into()
    }

    pub async fn delete_notification(&self, id: i32) -> Outcome<()> {
        async {
            let actor = self.actor().await?;
            self.notifications.delete(&actor, id).await
        }
        .await
        .into()
    }

    /// Live feed of the signed-in user's notification changes.
    pub async fn subscribe_notifications(&self) -> Outcome<Subscription> {
        self.actor()
            .await
            .map(|actor| self.notifications.subscribe(actor.id))
            .into()
    }
}
