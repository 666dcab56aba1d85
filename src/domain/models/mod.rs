pub mod auth;
pub mod identity;
pub mod password_change;
pub mod password_reset;
pub mod user;
