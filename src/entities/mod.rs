//! `SeaORM` entities mirroring the schema in the `migration` crate.

pub mod prelude;

pub mod announcement;
pub mod event;
pub mod group;
pub mod mass;
pub mod mass_intention;
pub mod notification;
pub mod parish;
pub mod pastoral_member;
pub mod profile;
