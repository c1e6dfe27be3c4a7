//! Per-user notifications with a realtime change feed.
//!
//! Changes are fanned out over a `tokio::sync::broadcast` bus. A
//! [`Subscription`] is a `Stream` filtered to one recipient; dropping it or
//! calling [`Subscription::unsubscribe`] ends delivery.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::db::Store;
use crate::domain::PrincipalId;
use crate::domain::events::NotificationChange;
use crate::error::{AccessError, StoreError};
use crate::models::{NewNotification, Notification, Profile};
use crate::policy::DenyReason;

/// Delivers a notification to its recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> Result<Notification, AccessError>;
}

pub struct NotificationService {
    store: Store,
    bus: broadcast::Sender<NotificationChange>,
}

impl NotificationService {
    #[must_use]
    pub fn new(store: Store, buffer_size: usize) -> Self {
        let (bus, _) = broadcast::channel(buffer_size.max(1));
        Self { store, bus }
    }

    fn publish(&self, change: NotificationChange) {
        // No receivers is the normal state when nobody is listening.
        if self.bus.send(change).is_err() {
            debug!("No notification subscribers");
        }
    }

    pub async fn list(
        &self,
        recipient: &PrincipalId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AccessError> {
        Ok(self
            .store
            .list_notifications(recipient, unread_only)
            .await
            .map_err(StoreError::from)?)
    }

    async fn owned(&self, actor: &Profile, id: i32) -> Result<Notification, AccessError> {
        let notification = self
            .store
            .get_notification(id)
            .await
            .map_err(StoreError::from)?
            .ok_or_else(|| AccessError::not_found("Notification", id))?;

        if notification.recipient_id != actor.id {
            return Err(DenyReason::NotOwner.into());
        }
        Ok(notification)
    }

    /// Only the recipient may mark a notification read.
    pub async fn mark_read(&self, actor: &Profile, id: i32) -> Result<Notification, AccessError> {
        self.owned(actor, id).await?;

        let updated = self
            .store
            .mark_notification_read(id)
            .await
            .map_err(StoreError::from)?
            .ok_or_else(|| AccessError::not_found("Notification", id))?;

        self.publish(NotificationChange::Updated(updated.clone()));
        Ok(updated)
    }

    pub async fn unread_count(&self, recipient: &PrincipalId) -> Result<u64, AccessError> {
        Ok(self
            .store
            .unread_notification_count(recipient)
            .await
            .map_err(StoreError::from)?)
    }

    /// Publishes an `Updated` change for every notification it flips.
    pub async fn mark_all_read(&self, actor: &Profile) -> Result<Vec<Notification>, AccessError> {
        let updated = self
            .store
            .mark_all_notifications_read(&actor.id)
            .await
            .map_err(StoreError::from)?;

        debug!(recipient = %actor.id, count = updated.len(), "Marked notifications read");
        for notification in &updated {
            self.publish(NotificationChange::Updated(notification.clone()));
        }
        Ok(updated)
    }

    pub async fn delete(&self, actor: &Profile, id: i32) -> Result<(), AccessError> {
        let notification = self.owned(actor, id).await?;

        let removed = self
            .store
            .delete_notification(id)
            .await
            .map_err(StoreError::from)?;
        if removed {
            self.publish(NotificationChange::Deleted {
                id,
                recipient_id: notification.recipient_id,
            });
        }
        Ok(())
    }

    /// Change feed for one recipient. Only changes published after this call
    /// are delivered.
    #[must_use]
    pub fn subscribe(&self, recipient: PrincipalId) -> Subscription {
        let rx = self.bus.subscribe();

        let stream = stream::unfold((rx, recipient), |(mut rx, recipient)| async move {
            loop {
                match rx.recv().await {
                    Ok(change) if *change.recipient() == recipient => {
                        return Some((change, (rx, recipient)));
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        warn!(%recipient, "Notification subscriber lagged by {} messages", count);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Subscription {
            inner: Some(stream.boxed()),
        }
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn notify(&self, notification: NewNotification) -> Result<Notification, AccessError> {
        let stored = self
            .store
            .insert_notification(notification)
            .await
            .map_err(StoreError::from)?;

        self.publish(NotificationChange::Inserted(stored.clone()));
        Ok(stored)
    }
}

/// A live, recipient-filtered notification feed.
pub struct Subscription {
    inner: Option<BoxStream<'static, NotificationChange>>,
}

impl Subscription {
    /// Stops delivery. The stream yields `None` from now on.
    pub fn unsubscribe(&mut self) {
        self.inner = None;
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.inner.is_some()
    }
}

impl Stream for Subscription {
    type Item = NotificationChange;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut() {
            Some(inner) => inner.poll_next_unpin(cx),
            None => Poll::Ready(None),
        }
    }
}
