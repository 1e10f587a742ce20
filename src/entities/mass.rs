use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A weekly recurring mass. `day_of_week` counts from Sunday = 0.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "masses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub parish_id: Uuid,
    pub day_of_week: i16,
    pub time_of_day: Time,
    pub description: Option<String>,
    pub location: Option<String>,
    pub celebrant: Option<String>,
    pub lang: Option<String>,
    pub is_exceptional: bool,
    pub valid_from: Option<Date>,
    pub valid_until: Option<Date>,
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
