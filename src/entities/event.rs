use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A one-off happening with a start and optional end.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub parish_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub date: DateTime,
    pub end_date: Option<DateTime>,
    pub location: Option<String>,
    pub event_type: String,
    pub image_url: Option<String>,
    pub organizer: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub max_participants: Option<i32>,
    pub registered_count: i32,
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
