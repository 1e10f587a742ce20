use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A tenant. Nearly every other row is scoped by `parish_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parishes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub diocese: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub history: Option<String>,
    pub founding_date: Option<Date>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub website: Option<String>,
    pub image_url: Option<String>,
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::profile::Entity")]
    Profile,
    #[sea_orm(has_many = "super::event::Entity")]
    Event,
    #[sea_orm(has_many = "super::mass::Entity")]
    Mass,
    #[sea_orm(has_many = "super::announcement::Entity")]
    Announcement,
    #[sea_orm(has_many = "super::group::Entity")]
    Group,
    #[sea_orm(has_many = "super::pastoral_member::Entity")]
    PastoralMember,
    #[sea_orm(has_many = "super::notification::Entity")]
    Notification,
    #[sea_orm(has_many = "super::mass_intention::Entity")]
    MassIntention,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::mass::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mass.def()
    }
}

impl Related<super::announcement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Announcement.def()
    }
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::pastoral_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PastoralMember.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notification.def()
    }
}

impl Related<super::mass_intention::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MassIntention.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
