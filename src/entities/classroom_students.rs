use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "classroom_students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub classroom_id: String,

    pub student_id: String,

    /// `active` or `inactive`
    pub status: String,

    pub joined_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
