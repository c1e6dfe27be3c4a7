use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::domain::{PrincipalId, Role, RoleRequestId, RoleRequestStatus};
use crate::entities::{prelude::*, profiles, role_requests};
use crate::models::{NewRoleRequest, Review, ReviewDecision, RoleRequest};

/// Result of applying a review inside a transaction.
#[derive(Debug)]
pub enum ReviewOutcome {
    Reviewed(RoleRequest),
    RequestMissing,
    /// The request exists but is no longer pending. Nothing was written.
    NotPending(RoleRequest),
    /// The requester has no profile row. Nothing was written.
    RequesterMissing,
}

pub struct RoleRequestRepository {
    conn: DatabaseConnection,
}

impl RoleRequestRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: role_requests::Model) -> Result<RoleRequest> {
        let requested_role = model
            .requested_role
            .parse::<Role>()
            .with_context(|| format!("Role request {} has an unknown role", model.id))?;
        let status = model
            .status
            .parse::<RoleRequestStatus>()
            .with_context(|| format!("Role request {} has an unknown status", model.id))?;
        let request_data = serde_json::from_str(&model.request_data)
            .with_context(|| format!("Role request {} has malformed data", model.id))?;

        Ok(RoleRequest {
            id: RoleRequestId::new(model.id),
            requester_id: PrincipalId::from(model.requester_id),
            requested_role,
            request_data,
            status,
            reviewer_id: model.reviewer_id.map(PrincipalId::from),
            review_notes: model.review_notes,
            created_at: model.created_at,
            reviewed_at: model.reviewed_at,
        })
    }

    async fn find<C: ConnectionTrait>(conn: &C, id: RoleRequestId) -> Result<Option<RoleRequest>> {
        let row = RoleRequests::find_by_id(id.value())
            .one(conn)
            .await
            .context("Failed to query role request")?;

        row.map(Self::map_model).transpose()
    }

    pub async fn get(&self, id: RoleRequestId) -> Result<Option<RoleRequest>> {
        Self::find(&self.conn, id).await
    }

    pub async fn find_pending(&self, requester: &PrincipalId) -> Result<Option<RoleRequest>> {
        let row = RoleRequests::find()
            .filter(role_requests::Column::RequesterId.eq(requester.as_str()))
            .filter(role_requests::Column::Status.eq(RoleRequestStatus::Pending.as_str()))
            .one(&self.conn)
            .await
            .context("Failed to query pending role request")?;

        row.map(Self::map_model).transpose()
    }

    /// Fails with a unique violation if the requester already has a pending
    /// request.
    pub async fn insert(&self, request: NewRoleRequest) -> Result<RoleRequest> {
        let result = RoleRequests::insert(role_requests::ActiveModel {
            requester_id: Set(request.requester_id.to_string()),
            requested_role: Set(request.requested_role.as_str().to_string()),
            request_data: Set(request.request_data.to_string()),
            status: Set(RoleRequestStatus::Pending.as_str().to_string()),
            reviewer_id: Set(None),
            review_notes: Set(None),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            reviewed_at: Set(None),
            ..Default::default()
        })
        .exec(&self.conn)
        .await
        .context("Failed to insert role request")?;

        let id = RoleRequestId::new(result.last_insert_id);
        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Role request {id} missing after insert"))
    }

    pub async fn list(&self, status: Option<RoleRequestStatus>) -> Result<Vec<RoleRequest>> {
        let mut query = RoleRequests::find();
        if let Some(status) = status {
            query = query.filter(role_requests::Column::Status.eq(status.as_str()));
        }

        let rows = query
            .order_by_desc(role_requests::Column::CreatedAt)
            .order_by_desc(role_requests::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list role requests")?;

        rows.into_iter().map(Self::map_model).collect()
    }

    pub async fn list_for_requester(&self, requester: &PrincipalId) -> Result<Vec<RoleRequest>> {
        let rows = RoleRequests::find()
            .filter(role_requests::Column::RequesterId.eq(requester.as_str()))
            .order_by_desc(role_requests::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list role requests for requester")?;

        rows.into_iter().map(Self::map_model).collect()
    }

    /// Moves a pending request to its terminal status. On approval the
    /// requester's role is updated in the same transaction; if either write
    /// does not land, the transaction is rolled back.
    pub async fn review(&self, review: &Review) -> Result<ReviewOutcome> {
        let txn = self.conn.begin().await?;

        let Some(current) = Self::find(&txn, review.request_id).await? else {
            txn.rollback().await?;
            return Ok(ReviewOutcome::RequestMissing);
        };

        let status = review.decision.resulting_status();
        let transitioned = RoleRequests::update_many()
            .col_expr(role_requests::Column::Status, Expr::value(status.as_str()))
            .col_expr(
                role_requests::Column::ReviewerId,
                Expr::value(review.reviewer_id.to_string()),
            )
            .col_expr(
                role_requests::Column::ReviewNotes,
                Expr::value(review.notes.clone()),
            )
            .col_expr(
                role_requests::Column::ReviewedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(role_requests::Column::Id.eq(review.request_id.value()))
            .filter(role_requests::Column::Status.eq(RoleRequestStatus::Pending.as_str()))
            .exec(&txn)
            .await
            .context("Failed to update role request status")?;

        if transitioned.rows_affected != 1 {
            txn.rollback().await?;
            return Ok(ReviewOutcome::NotPending(current));
        }

        if review.decision == ReviewDecision::Approve {
            let promoted = Profiles::update_many()
                .col_expr(
                    profiles::Column::Role,
                    Expr::value(current.requested_role.as_str()),
                )
                .col_expr(
                    profiles::Column::UpdatedAt,
                    Expr::value(chrono::Utc::now().to_rfc3339()),
                )
                .filter(profiles::Column::Id.eq(current.requester_id.as_str()))
                .exec(&txn)
                .await
                .context("Failed to update requester role")?;

            if promoted.rows_affected != 1 {
                txn.rollback().await?;
                return Ok(ReviewOutcome::RequesterMissing);
            }
        }

        let reviewed = Self::find(&txn, review.request_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Role request {} vanished", review.request_id))?;

        txn.commit().await.context("Failed to commit review")?;

        Ok(ReviewOutcome::Reviewed(reviewed))
    }
}
