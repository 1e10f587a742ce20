pub use super::announcement::Entity as Announcement;
pub use super::event::Entity as Event;
pub use super::group::Entity as Group;
pub use super::mass::Entity as Mass;
pub use super::mass_intention::Entity as MassIntention;
pub use super::notification::Entity as Notification;
pub use super::parish::Entity as Parish;
pub use super::pastoral_member::Entity as PastoralMember;
pub use super::profile::Entity as Profile;
