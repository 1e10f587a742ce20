use sea_orm_migration::prelude::*;

// Define table names
#[derive(DeriveIden)]
pub enum Parish {
    #[sea_orm(iden = "parishes")]
    Table,
    Id,
    Name,
    Address,
    City,
    Country,
    Description,
    Diocese,
    History,
    FoundingDate,
    ContactEmail,
    ContactPhone,
    Website,
    ImageUrl,
    LogoUrl,
    PrimaryColor,
    SecondaryColor,
}

#[derive(DeriveIden)]
pub enum Profile {
    #[sea_orm(iden = "profiles")]
    Table,
    Id,
    AuthSubject,
    ParishId,
    Email,
    FullName,
    AvatarUrl,
    PhoneNumber,
    Role,
    AccessToken,
}

#[derive(DeriveIden)]
pub enum Event {
    #[sea_orm(iden = "events")]
    Table,
    Id,
    ParishId,
    Title,
    Description,
    Date,
    EndDate,
    Location,
    EventType,
    ImageUrl,
    Organizer,
    ContactEmail,
    ContactPhone,
    MaxParticipants,
    RegisteredCount,
}

#[derive(DeriveIden)]
pub enum Mass {
    #[sea_orm(iden = "masses")]
    Table,
    Id,
    ParishId,
    DayOfWeek,
    TimeOfDay,
    Description,
    Location,
    Celebrant,
    Lang,
    IsExceptional,
    ValidFrom,
    ValidUntil,
}

#[derive(DeriveIden)]
pub enum Announcement {
    #[sea_orm(iden = "announcements")]
    Table,
    Id,
    ParishId,
    AuthorId,
    Title,
    Content,
    Category,
    Priority,
    ImageUrl,
    IsActive,
    PublishedAt,
    ExpiresAt,
    ViewsCount,
}

#[derive(DeriveIden)]
pub enum Group {
    #[sea_orm(iden = "groups")]
    Table,
    Id,
    ParishId,
    Name,
    Description,
    GroupType,
    MeetingDay,
    MeetingTime,
    MeetingDay2,
    MeetingTime2,
    MeetingLocation,
    ImageUrl,
    IsActive,
    MembersCount,
    Admin1Id,
    Admin2Id,
}

#[derive(DeriveIden)]
pub enum PastoralMember {
    #[sea_orm(iden = "pastoral_members")]
    Table,
    Id,
    ParishId,
    FullName,
    Role,
    Bio,
    ImageUrl,
    RankOrder,
}

#[derive(DeriveIden)]
pub enum Notification {
    #[sea_orm(iden = "notifications")]
    Table,
    Id,
    ParishId,
    UserId,
    Title,
    Body,
    Type,
    ActionUrl,
    Data,
    IsRead,
}

#[derive(DeriveIden)]
pub enum MassIntention {
    #[sea_orm(iden = "mass_intentions")]
    Table,
    Id,
    ParishId,
    UserId,
    IntentionText,
    RequestedDate,
    Status,
    TransactionId,
}
