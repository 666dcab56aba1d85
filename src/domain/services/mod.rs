pub mod auth_service;
pub mod credential_store;
pub mod password_change_service;
pub mod password_service;
pub mod passwords;
