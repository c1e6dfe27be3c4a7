use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "role_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub requester_id: String,

    pub requested_role: String,

    /// Free-form JSON submitted with the request
    pub request_data: String,

    /// `pending`, `approved` or `rejected`
    pub status: String,

    pub reviewer_id: Option<String>,

    pub review_notes: Option<String>,

    pub created_at: String,

    pub reviewed_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
