use serde::{Deserialize, Serialize};

use crate::domain::{PrincipalId, Role, RoleRequestId, RoleRequestStatus};

/// A lower-privilege profile asking to be elevated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleRequest {
    pub id: RoleRequestId,
    pub requester_id: PrincipalId,
    pub requested_role: Role,
    pub request_data: serde_json::Value,
    pub status: RoleRequestStatus,
    pub reviewer_id: Option<PrincipalId>,
    pub review_notes: Option<String>,
    pub created_at: String,
    pub reviewed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRoleRequest {
    pub requester_id: PrincipalId,
    pub requested_role: Role,
    pub request_data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    #[must_use]
    pub const fn resulting_status(self) -> RoleRequestStatus {
        match self {
            Self::Approve => RoleRequestStatus::Approved,
            Self::Reject => RoleRequestStatus::Rejected,
        }
    }
}

/// An admin's verdict on a pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub request_id: RoleRequestId,
    pub reviewer_id: PrincipalId,
    pub decision: ReviewDecision,
    pub notes: Option<String>,
}
