use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create Event Table
        let table = table_auto(Event::Table)
            .col(pk_uuid(Event::Id))
            .col(uuid(Event::ParishId))
            .col(string(Event::Title))
            .col(text_null(Event::Description))
            .col(timestamp(Event::Date))
            .col(timestamp_null(Event::EndDate))
            .col(string_null(Event::Location))
            .col(string(Event::EventType).default("other"))
            .col(string_null(Event::ImageUrl))
            .col(string_null(Event::Organizer))
            .col(string_null(Event::ContactEmail))
            .col(string_null(Event::ContactPhone))
            .col(integer_null(Event::MaxParticipants))
            .col(integer(Event::RegisteredCount).default(0))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_event_parish")
                    .from(Event::Table, Event::ParishId)
                    .to(Parish::Table, Parish::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(
                Expr::col(Event::EndDate)
                    .is_null()
                    .or(Expr::col(Event::EndDate).gte(Expr::col(Event::Date))),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Mass Table
        let table = table_auto(Mass::Table)
            .col(pk_uuid(Mass::Id))
            .col(uuid(Mass::ParishId))
            .col(small_integer(Mass::DayOfWeek))
            .col(time(Mass::TimeOfDay))
            .col(string_null(Mass::Description))
            .col(string_null(Mass::Location))
            .col(string_null(Mass::Celebrant))
            .col(string_null(Mass::Lang))
            .col(boolean(Mass::IsExceptional).default(false))
            .col(date_null(Mass::ValidFrom))
            .col(date_null(Mass::ValidUntil))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_mass_parish")
                    .from(Mass::Table, Mass::ParishId)
                    .to(Parish::Table, Parish::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(Expr::col(Mass::DayOfWeek).between(0, 6))
            .to_owned();
        manager.create_table(table).await?;

        // Create Announcement Table
        let table = table_auto(Announcement::Table)
            .col(pk_uuid(Announcement::Id))
            .col(uuid(Announcement::ParishId))
            .col(uuid_null(Announcement::AuthorId))
            .col(string(Announcement::Title))
            .col(text(Announcement::Content))
            .col(string(Announcement::Category).default("general"))
            .col(string(Announcement::Priority).default("normal"))
            .col(string_null(Announcement::ImageUrl))
            .col(boolean(Announcement::IsActive).default(true))
            .col(timestamp_null(Announcement::PublishedAt))
            .col(timestamp_null(Announcement::ExpiresAt))
            .col(integer(Announcement::ViewsCount).default(0))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_announcement_parish")
                    .from(Announcement::Table, Announcement::ParishId)
                    .to(Parish::Table, Parish::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_announcement_author")
                    .from(Announcement::Table, Announcement::AuthorId)
                    .to(Profile::Table, Profile::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Group Table
        let table = table_auto(Group::Table)
            .col(pk_uuid(Group::Id))
            .col(uuid(Group::ParishId))
            .col(string(Group::Name))
            .col(text_null(Group::Description))
            .col(string(Group::GroupType).default("other"))
            .col(small_integer_null(Group::MeetingDay))
            .col(time_null(Group::MeetingTime))
            .col(small_integer_null(Group::MeetingDay2))
            .col(time_null(Group::MeetingTime2))
            .col(string_null(Group::MeetingLocation))
            .col(string_null(Group::ImageUrl))
            .col(boolean(Group::IsActive).default(true))
            .col(integer(Group::MembersCount).default(0))
            .col(uuid_null(Group::Admin1Id))
            .col(uuid_null(Group::Admin2Id))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_group_parish")
                    .from(Group::Table, Group::ParishId)
                    .to(Parish::Table, Parish::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_group_admin1")
                    .from(Group::Table, Group::Admin1Id)
                    .to(Profile::Table, Profile::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_group_admin2")
                    .from(Group::Table, Group::Admin2Id)
                    .to(Profile::Table, Profile::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .check(
                Expr::col(Group::MeetingDay)
                    .is_null()
                    .or(Expr::col(Group::MeetingDay).between(0, 6)),
            )
            .check(
                Expr::col(Group::MeetingDay2)
                    .is_null()
                    .or(Expr::col(Group::MeetingDay2).between(0, 6)),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create PastoralMember Table
        let table = table_auto(PastoralMember::Table)
            .col(pk_uuid(PastoralMember::Id))
            .col(uuid(PastoralMember::ParishId))
            .col(string(PastoralMember::FullName))
            .col(string(PastoralMember::Role))
            .col(text_null(PastoralMember::Bio))
            .col(string_null(PastoralMember::ImageUrl))
            .col(integer(PastoralMember::RankOrder).default(0))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_pastoral_member_parish")
                    .from(PastoralMember::Table, PastoralMember::ParishId)
                    .to(Parish::Table, Parish::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Notification Table
        let table = table_auto(Notification::Table)
            .col(pk_uuid(Notification::Id))
            .col(uuid(Notification::ParishId))
            .col(uuid_null(Notification::UserId))
            .col(string(Notification::Title))
            .col(text(Notification::Body))
            .col(string(Notification::Type).default("info"))
            .col(string_null(Notification::ActionUrl))
            .col(json_binary_null(Notification::Data))
            .col(boolean(Notification::IsRead).default(false))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_notification_parish")
                    .from(Notification::Table, Notification::ParishId)
                    .to(Parish::Table, Parish::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_notification_user")
                    .from(Notification::Table, Notification::UserId)
                    .to(Profile::Table, Profile::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create MassIntention Table
        let table = table_auto(MassIntention::Table)
            .col(pk_uuid(MassIntention::Id))
            .col(uuid(MassIntention::ParishId))
            .col(uuid_null(MassIntention::UserId))
            .col(text(MassIntention::IntentionText))
            .col(date_null(MassIntention::RequestedDate))
            .col(string(MassIntention::Status).default("pending"))
            .col(string_null(MassIntention::TransactionId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_mass_intention_parish")
                    .from(MassIntention::Table, MassIntention::ParishId)
                    .to(Parish::Table, Parish::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_mass_intention_user")
                    .from(MassIntention::Table, MassIntention::UserId)
                    .to(Profile::Table, Profile::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .check(Expr::col(MassIntention::Status).is_in(["pending", "approved", "rejected"]))
            .to_owned();
        manager.create_table(table).await?;

        // Create indices for parish-scoped lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_event_parish")
                    .table(Event::Table)
                    .col(Event::ParishId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_mass_parish")
                    .table(Mass::Table)
                    .col(Mass::ParishId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_announcement_parish")
                    .table(Announcement::Table)
                    .col(Announcement::ParishId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_parish")
                    .table(Group::Table)
                    .col(Group::ParishId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pastoral_member_parish")
                    .table(PastoralMember::Table)
                    .col(PastoralMember::ParishId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notification_parish")
                    .table(Notification::Table)
                    .col(Notification::ParishId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_mass_intention_parish")
                    .table(MassIntention::Table)
                    .col(MassIntention::ParishId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop all tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(MassIntention::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Notification::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(PastoralMember::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Group::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Announcement::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Mass::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Event::Table).to_owned())
            .await?;

        Ok(())
    }
}
