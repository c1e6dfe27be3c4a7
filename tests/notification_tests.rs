//! Integration tests for the notification feed.

use futures::StreamExt;
use std::time::Duration;
use wordventure::config::Config;
use wordventure::domain::PrincipalId;
use wordventure::domain::events::NotificationChange;
use wordventure::models::NewNotification;
use wordventure::services::Notifier;
use wordventure::SharedState;

fn test_config() -> Config {
    let db_path = std::env::temp_dir().join(format!(
        "wordventure-notification-test-{}.db",
        uuid::Uuid::new_v4()
    ));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn signed_in(config: &Config, email: &str) -> (SharedState, PrincipalId) {
    let state = SharedState::new(config.clone())
        .await
        .expect("Failed to create shared state");
    let session = state
        .sessions
        .sign_up(email, "Correct-horse1")
        .await
        .expect("Sign up failed");
    let id = session.profile.id.clone();
    (state, id)
}

fn note(recipient: &PrincipalId, title: &str) -> NewNotification {
    NewNotification {
        recipient_id: recipient.clone(),
        sender_id: None,
        kind: "system".to_string(),
        title: title.to_string(),
        message: format!("{title} body"),
        related_id: None,
    }
}

#[tokio::test]
async fn test_feed_is_filtered_per_recipient() {
    let config = test_config();
    let (alice, alice_id) = signed_in(&config, "alice@school.test").await;
    let (_bob, bob_id) = signed_in(&config, "bob@school.test").await;

    let mut feed = alice
        .gateway
        .subscribe_notifications()
        .await
        .into_data()
        .unwrap();

    alice.notifications.notify(note(&bob_id, "for bob")).await.unwrap();
    let mine = alice
        .notifications
        .notify(note(&alice_id, "for alice"))
        .await
        .unwrap();

    let change = tokio::time::timeout(Duration::from_secs(2), feed.next())
        .await
        .expect("feed timed out")
        .expect("feed ended");
    assert_eq!(change, NotificationChange::Inserted(mine.clone()));

    let read = alice
        .gateway
        .mark_notification_read(mine.id)
        .await
        .into_data()
        .unwrap();
    assert!(read.is_read);

    let change = tokio::time::timeout(Duration::from_secs(2), feed.next())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(change, NotificationChange::Updated(n) if n.is_read));

    alice
        .gateway
        .delete_notification(mine.id)
        .await
        .into_data()
        .unwrap();
    let change = tokio::time::timeout(Duration::from_secs(2), feed.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        change,
        NotificationChange::Deleted {
            id: mine.id,
            recipient_id: alice_id,
        }
    );

    feed.unsubscribe();
    assert!(!feed.is_active());
    assert!(feed.next().await.is_none());
}

#[tokio::test]
async fn test_only_recipient_touches_notification() {
    let config = test_config();
    let (alice, alice_id) = signed_in(&config, "alice@school.test").await;
    let (bob, _) = signed_in(&config, "bob@school.test").await;

    let stored = alice
        .notifications
        .notify(note(&alice_id, "private"))
        .await
        .unwrap();

    let outcome = bob.gateway.mark_notification_read(stored.id).await;
    assert_eq!(outcome.code(), Some("not_owner"));
    let outcome = bob.gateway.delete_notification(stored.id).await;
    assert_eq!(outcome.code(), Some("not_owner"));

    let outcome = bob.gateway.mark_notification_read(9_999).await;
    assert_eq!(outcome.code(), Some("not_found"));

    let bobs = bob.gateway.notifications(false).await.into_data().unwrap();
    assert!(bobs.is_empty());

    let unread = alice.gateway.notifications(true).await.into_data().unwrap();
    assert_eq!(unread.len(), 1);
    alice
        .gateway
        .mark_notification_read(stored.id)
        .await
        .into_data()
        .unwrap();
    assert!(alice.gateway.notifications(true).await.into_data().unwrap().is_empty());
    assert_eq!(alice.gateway.notifications(false).await.into_data().unwrap().len(), 1);
}

#[tokio::test]
async fn test_signed_out_cannot_subscribe() {
    let state = SharedState::new(test_config()).await.unwrap();
    let outcome = state.gateway.subscribe_notifications().await;
    assert_eq!(outcome.code(), Some("unauthenticated"));
}

#[tokio::test]
async fn test_mark_all_read_touches_only_own_unread() {
    let config = test_config();
    let (alice, alice_id) = signed_in(&config, "alice@school.test").await;
    let (bob, bob_id) = signed_in(&config, "bob@school.test").await;

    let first = alice.notifications.notify(note(&alice_id, "one")).await.unwrap();
    let second = alice.notifications.notify(note(&alice_id, "two")).await.unwrap();
    alice.notifications.notify(note(&bob_id, "bob's")).await.unwrap();
    alice
        .gateway
        .mark_notification_read(first.id)
        .await
        .into_data()
        .unwrap();

    let count = alice.gateway.unread_notification_count().await.into_data();
    assert_eq!(count, Some(1));

    let mut feed = alice
        .gateway
        .subscribe_notifications()
        .await
        .into_data()
        .unwrap();

    let flipped = alice
        .gateway
        .mark_all_notifications_read()
        .await
        .into_data()
        .unwrap();
    assert_eq!(flipped.len(), 1);
    assert_eq!(flipped[0].id, second.id);
    assert!(flipped[0].is_read);

    let change = tokio::time::timeout(Duration::from_secs(2), feed.next())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(change, NotificationChange::Updated(n) if n.id == second.id && n.is_read));

    assert_eq!(alice.gateway.unread_notification_count().await.into_data(), Some(0));
    assert_eq!(bob.gateway.unread_notification_count().await.into_data(), Some(1));

    // nothing left to flip
    let again = alice
        .gateway
        .mark_all_notifications_read()
        .await
        .into_data()
        .unwrap();
    assert!(again.is_empty());
}
