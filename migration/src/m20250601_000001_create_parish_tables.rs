use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create Parish Table
        let table = table_auto(Parish::Table)
            .col(pk_uuid(Parish::Id))
            .col(string(Parish::Name))
            .col(string(Parish::Address).default(""))
            .col(string(Parish::City).default(""))
            .col(string(Parish::Country).default(""))
            .col(text_null(Parish::Description))
            .col(string_null(Parish::Diocese))
            .col(text_null(Parish::History))
            .col(date_null(Parish::FoundingDate))
            .col(string_null(Parish::ContactEmail))
            .col(string_null(Parish::ContactPhone))
            .col(string_null(Parish::Website))
            .col(string_null(Parish::ImageUrl))
            .col(string_null(Parish::LogoUrl))
            .col(string_null(Parish::PrimaryColor))
            .col(string_null(Parish::SecondaryColor))
            .to_owned();
        manager.create_table(table).await?;

        // Create Profile Table
        let table = table_auto(Profile::Table)
            .col(pk_uuid(Profile::Id))
            .col(string_uniq(Profile::AuthSubject))
            .col(uuid_null(Profile::ParishId))
            .col(string(Profile::Email))
            .col(string_null(Profile::FullName))
            .col(string_null(Profile::AvatarUrl))
            .col(string_null(Profile::PhoneNumber))
            .col(string_null(Profile::Role))
            .col(string(Profile::AccessToken))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_profile_parish")
                    .from(Profile::Table, Profile::ParishId)
                    .to(Parish::Table, Parish::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profile_parish")
                    .table(Profile::Table)
                    .col(Profile::ParishId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profile::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Parish::Table).to_owned())
            .await?;

        Ok(())
    }
}
