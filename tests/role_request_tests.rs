//! Integration tests for the role request workflow.
//!
//! Each participant signs in on their own `SharedState` over one database
//! file, the way separate devices share the hosted backend.

use serde_json::json;
use wordventure::backend::{ProfileTable, RoleRequestTable};
use wordventure::config::Config;
use wordventure::domain::{PrincipalId, Role, RoleRequestStatus};
use wordventure::models::{ProfileFilter, ReviewDecision};
use wordventure::SharedState;

fn test_config() -> Config {
    let db_path = std::env::temp_dir().join(format!(
        "wordventure-role-request-test-{}.db",
        uuid::Uuid::new_v4()
    ));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn sign_up(config: &Config, email: &str, role: Role) -> (SharedState, PrincipalId) {
    let state = SharedState::new(config.clone())
        .await
        .expect("Failed to create shared state");
    let session = state
        .sessions
        .sign_up(email, "Correct-horse1")
        .await
        .expect("Sign up failed");
    let id = session.profile.id.clone();

    if role != Role::Student {
        state.store.set_role(&id, role).await.unwrap();
    }
    (state, id)
}

#[tokio::test]
async fn test_second_pending_request_is_rejected() {
    let config = test_config();
    let (student, student_id) = sign_up(&config, "kid@school.test", Role::Student).await;

    let first = student
        .gateway
        .submit_role_request(Role::Teacher, json!({"school": "Hillside"}))
        .await;
    assert!(first.is_success());
    let first = first.into_data().unwrap();
    assert_eq!(first.status, RoleRequestStatus::Pending);
    assert_eq!(first.requester_id, student_id);

    let second = student
        .gateway
        .submit_role_request(Role::Admin, json!({"school": "Elsewhere"}))
        .await;
    assert_eq!(second.code(), Some("request_already_pending"));

    // the original request is untouched
    let pending = student.store.find_pending(&student_id).await.unwrap().unwrap();
    assert_eq!(pending.id, first.id);
    assert_eq!(pending.requested_role, Role::Teacher);
    assert_eq!(pending.request_data, json!({"school": "Hillside"}));

    let mine = student.gateway.my_pending_role_request().await;
    assert_eq!(mine.into_data().flatten().map(|r| r.id), Some(first.id));
}

#[tokio::test]
async fn test_requested_role_must_be_higher() {
    let config = test_config();
    let (teacher, _) = sign_up(&config, "teach@school.test", Role::Teacher).await;

    let outcome = teacher
        .gateway
        .submit_role_request(Role::Student, json!({}))
        .await;
    assert_eq!(outcome.code(), Some("validation"));

    let outcome = teacher
        .gateway
        .submit_role_request(Role::Teacher, json!({}))
        .await;
    assert_eq!(outcome.code(), Some("validation"));
}

#[tokio::test]
async fn test_only_admins_review() {
    let config = test_config();
    let (student, _) = sign_up(&config, "kid@school.test", Role::Student).await;
    let (teacher, _) = sign_up(&config, "teach@school.test", Role::Teacher).await;

    let request = student
        .gateway
        .submit_role_request(Role::Teacher, json!({}))
        .await
        .into_data()
        .unwrap();

    for state in [&student, &teacher] {
        let outcome = state
            .gateway
            .review_role_request(request.id, ReviewDecision::Approve, None)
            .await;
        assert_eq!(outcome.code(), Some("insufficient_role"));

        let outcome = state.gateway.list_role_requests(None).await;
        assert_eq!(outcome.code(), Some("insufficient_role"));
    }

    let still = student.store.get(request.id).await.unwrap().unwrap();
    assert_eq!(still.status, RoleRequestStatus::Pending);
}

#[tokio::test]
async fn test_approval_elevates_requester() {
    let config = test_config();
    let (student, student_id) = sign_up(&config, "kid@school.test", Role::Student).await;
    let (admin, admin_id) = sign_up(&config, "boss@school.test", Role::Admin).await;

    let request = student
        .gateway
        .submit_role_request(Role::Teacher, json!({"reason": "I run the book club"}))
        .await
        .into_data()
        .unwrap();

    // active admins hear about the new request
    let inbox = admin.gateway.notifications(true).await.into_data().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, "role_request");
    assert_eq!(inbox[0].related_id, Some(request.id.to_string()));

    let listed = admin
        .gateway
        .list_role_requests(Some(RoleRequestStatus::Pending))
        .await
        .into_data()
        .unwrap();
    assert_eq!(listed.len(), 1);

    let reviewed = admin
        .gateway
        .review_role_request(request.id, ReviewDecision::Approve, Some("  welcome  ".to_string()))
        .await
        .into_data()
        .unwrap();
    assert_eq!(reviewed.status, RoleRequestStatus::Approved);
    assert_eq!(reviewed.reviewer_id, Some(admin_id));
    assert_eq!(reviewed.review_notes.as_deref(), Some("welcome"));
    assert!(reviewed.reviewed_at.is_some());

    let profile = student.gateway.my_profile().await.into_data().unwrap();
    assert_eq!(profile.role, Role::Teacher);
    assert!(student.gateway.permissions().await.into_data().unwrap().can_create_classrooms);

    let again = admin
        .gateway
        .review_role_request(request.id, ReviewDecision::Reject, None)
        .await;
    assert_eq!(again.code(), Some("request_already_reviewed"));

    let audit = admin
        .store
        .activities_of_type("role_request_approved")
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].metadata["requester_id"], json!(student_id));

    let inbox = student.gateway.notifications(false).await.into_data().unwrap();
    assert!(inbox.iter().any(|n| n.kind == "role_request_reviewed"));
}

#[tokio::test]
async fn test_approval_is_all_or_nothing() {
    let config = test_config();
    let (student, student_id) = sign_up(&config, "kid@school.test", Role::Student).await;
    let (admin, _) = sign_up(&config, "boss@school.test", Role::Admin).await;

    let request = student
        .gateway
        .submit_role_request(Role::Teacher, json!({}))
        .await
        .into_data()
        .unwrap();

    // the role update cannot land without a profile row
    assert!(admin.store.delete(&student_id).await.unwrap());

    let outcome = admin
        .gateway
        .review_role_request(request.id, ReviewDecision::Approve, None)
        .await;
    assert!(!outcome.is_success());
    assert_eq!(outcome.code(), Some("not_found"));

    let stored = admin.store.get(request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RoleRequestStatus::Pending);
    assert!(stored.reviewer_id.is_none());
    assert!(stored.reviewed_at.is_none());
    assert!(
        admin
            .store
            .activities_of_type("role_request_approved")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_rejection_allows_a_new_request() {
    let config = test_config();
    let (student, student_id) = sign_up(&config, "kid@school.test", Role::Student).await;
    let (admin, _) = sign_up(&config, "boss@school.test", Role::Admin).await;

    let request = student
        .gateway
        .submit_role_request(Role::Teacher, json!({}))
        .await
        .into_data()
        .unwrap();

    let reviewed = admin
        .gateway
        .review_role_request(request.id, ReviewDecision::Reject, Some("Need a school email".to_string()))
        .await
        .into_data()
        .unwrap();
    assert_eq!(reviewed.status, RoleRequestStatus::Rejected);

    let profile = admin.store.fetch(&student_id).await.unwrap().unwrap();
    assert_eq!(profile.role, Role::Student);

    let retry = student
        .gateway
        .submit_role_request(Role::Teacher, json!({"email": "kid@hillside.edu"}))
        .await;
    assert!(retry.is_success());
    let retry = retry.into_data().unwrap();
    assert_ne!(retry.id, request.id);

    let history = student.gateway.my_role_requests().await.into_data().unwrap();
    let statuses: Vec<_> = history.iter().map(|r| (r.id, r.status)).collect();
    assert_eq!(
        statuses,
        vec![
            (retry.id, RoleRequestStatus::Pending),
            (request.id, RoleRequestStatus::Rejected),
        ]
    );

    // other people's requests stay out of the history
    let admin_history = admin.gateway.my_role_requests().await.into_data().unwrap();
    assert!(admin_history.is_empty());
}

#[tokio::test]
async fn test_admin_features_denied_to_other_roles() {
    let config = test_config();
    let (student, _) = sign_up(&config, "kid@school.test", Role::Student).await;
    let (teacher, _) = sign_up(&config, "teach@school.test", Role::Teacher).await;
    let (admin, _) = sign_up(&config, "boss@school.test", Role::Admin).await;

    for state in [&student, &teacher] {
        let outcome = state.gateway.list_profiles(ProfileFilter::default()).await;
        assert_eq!(outcome.code(), Some("insufficient_role"));

        let permissions = state.gateway.permissions().await.into_data().unwrap();
        assert!(!permissions.can_manage_users);
        assert!(!permissions.can_review_role_requests);
    }

    let everyone = admin
        .gateway
        .list_profiles(ProfileFilter::default())
        .await
        .into_data()
        .unwrap();
    assert_eq!(everyone.len(), 3);
}
