use serde::Serialize;

use crate::domain::PrincipalId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: i32,
    pub recipient_id: PrincipalId,
    pub sender_id: Option<PrincipalId>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub related_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: PrincipalId,
    pub sender_id: Option<PrincipalId>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub related_id: Option<String>,
}
