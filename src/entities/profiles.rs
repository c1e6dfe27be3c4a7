use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Same value as the principal id; one profile per principal.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub email: String,

    pub display_name: String,

    /// `student`, `teacher` or `admin`
    pub role: String,

    pub is_active: bool,

    pub teacher_id: Option<String>,

    pub notifications_enabled: bool,

    pub sound_enabled: bool,

    pub dark_mode: bool,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
