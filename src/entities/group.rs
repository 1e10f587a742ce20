use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A parish group with up to two weekly meeting slots and two admins.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub parish_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub group_type: String,
    pub meeting_day: Option<i16>,
    pub meeting_time: Option<Time>,
    pub meeting_day2: Option<i16>,
    pub meeting_time2: Option<Time>,
    pub meeting_location: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub members_count: i32,
    pub admin1_id: Option<Uuid>,
    pub admin2_id: Option<Uuid>,
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
