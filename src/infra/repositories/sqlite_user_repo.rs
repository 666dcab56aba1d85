use crate::domain::{models::user::{Role, User}, ports::UserRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::error;

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepo {
    async fn create(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, email, password_hash, role, designation, department, employer_id, is_active, must_reset_password, identity_provider_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id, name, email, password_hash, role, designation, department, employer_id, is_active, must_reset_password, identity_provider_id, created_at, updated_at",
        )
            .bind(&user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.designation)
            .bind(&user.department)
            .bind(&user.employer_id)
            .bind(user.is_active)
            .bind(user.must_reset_password)
            .bind(&user.identity_provider_id)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, designation, department, employer_id, is_active, must_reset_password, identity_provider_id, created_at, updated_at
             FROM users WHERE id = ?",
        )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, designation, department, employer_id, is_active, must_reset_password, identity_provider_id, created_at, updated_at
             FROM users WHERE email = ? LIMIT 1",
        )
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, role: Option<Role>) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, designation, department, employer_id, is_active, must_reset_password, identity_provider_id, created_at, updated_at
             FROM users WHERE (? IS NULL OR role = ?) ORDER BY created_at DESC",
        )
            .bind(role.map(|r| r.as_str()))
            .bind(role.map(|r| r.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_unlinked(&self) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, designation, department, employer_id, is_active, must_reset_password, identity_provider_id, created_at, updated_at
             FROM users WHERE identity_provider_id IS NULL ORDER BY created_at ASC",
        )
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update_profile(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET name = ?, email = ?, role = ?, designation = ?, department = ?, employer_id = ?, updated_at = ?
             WHERE id = ?
             RETURNING id, name, email, password_hash, role, designation, department, employer_id, is_active, must_reset_password, identity_provider_id, created_at, updated_at",
        )
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.role.as_str())
            .bind(&user.designation)
            .bind(&user.department)
            .bind(&user.employer_id)
            .bind(Utc::now())
            .bind(&user.id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update_password(&self, id: &str, password_hash: &str, clear_must_reset: bool) -> Result<(), AppError> {
        let query = if clear_must_reset {
            "UPDATE users SET password_hash = ?, must_reset_password = 0, updated_at = ? WHERE id = ?"
        } else {
            "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?"
        };

        sqlx::query(query)
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("SQLite password update failed for {}: {:?}", id, e);
                AppError::Database(e)
            })?;
        Ok(())
    }

    async fn set_active(&self, id: &str, is_active: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(is_active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn set_identity_provider_id(&self, id: &str, provider_id: Option<&str>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET identity_provider_id = ?, updated_at = ? WHERE id = ?")
            .bind(provider_id)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("SQLite User Deletion Failed: {:?}", e);
                AppError::Database(e)
            })?;
        Ok(())
    }
}
