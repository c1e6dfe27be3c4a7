use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "system_activities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub actor_id: String,

    pub activity_type: String,

    pub description: String,

    /// JSON blob with operation details
    pub metadata: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
