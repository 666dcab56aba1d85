pub mod sqlite_user_repo;
pub mod sqlite_password_reset_repo;
pub mod sqlite_password_change_repo;

pub mod postgres_user_repo;
pub mod postgres_password_reset_repo;
pub mod postgres_password_change_repo;
