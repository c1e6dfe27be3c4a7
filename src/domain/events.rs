//! Change events emitted by the notification feed.
//!
//! Every insert, update and delete of a notification row is published on the
//! event bus; subscribers receive only the events addressed to them.

use serde::Serialize;

use crate::domain::PrincipalId;
use crate::models::Notification;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationChange {
    Inserted(Notification),
    Updated(Notification),
    Deleted { id: i32, recipient_id: PrincipalId },
}

impl NotificationChange {
    #[must_use]
    pub const fn recipient(&self) -> &PrincipalId {
        match self {
            Self::Inserted(n) | Self::Updated(n) => &n.recipient_id,
            Self::Deleted { recipient_id, .. } => recipient_id,
        }
    }
}
