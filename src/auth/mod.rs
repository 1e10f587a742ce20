pub mod router;
pub mod user;
