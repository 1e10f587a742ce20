use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "announcements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub parish_id: Uuid,
    pub author_id: Option<Uuid>,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub category: String,
    pub priority: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub published_at: Option<DateTime>,
    pub expires_at: Option<DateTime>,
    pub views_count: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::parish::Entity",
        from = "Column::ParishId",
        to = "super::parish::Column::Id",
        on_delete = "Cascade"
    )]
    Parish,
}

impl Related<super::parish::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parish.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
