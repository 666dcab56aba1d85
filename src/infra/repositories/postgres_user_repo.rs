use crate::domain::{models::user::{Role, User}, ports::UserRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::error;

pub struct PostgresUserRepo {
    pool: PgPool,
}

impl PostgresUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepo {
    async fn create(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, email, password_hash, role, designation, department, employer_id, is_active, must_reset_password, identity_provider_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
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
             FROM users WHERE id = $1",
        )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, designation, department, employer_id, is_active, must_reset_password, identity_provider_id, created_at, updated_at
             FROM users WHERE email = $1 LIMIT 1",
        )
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, role: Option<Role>) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, designation, department, employer_id, is_active, must_reset_password, identity_provider_id, created_at, updated_at
             FROM users WHERE ($1::TEXT IS NULL OR role = $1) ORDER BY created_at DESC",
        )
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
            "UPDATE users SET name = $1, email = $2, role = $3, designation = $4, department = $5, employer_id = $6, updated_at = $7
             WHERE id = $8
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
            "UPDATE users SET password_hash = $1, must_reset_password = FALSE, updated_at = $2 WHERE id = $3"
        } else {
            "UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3"
        };

        sqlx::query(query)
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Postgres password update failed for {}: {:?}", id, e);
                AppError::Database(e)
            })?;
        Ok(())
    }

    async fn set_active(&self, id: &str, is_active: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET is_active = $1, updated_at = $2 WHERE id = $3")
            .bind(is_active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn set_identity_provider_id(&self, id: &str, provider_id: Option<&str>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET identity_provider_id = $1, updated_at = $2 WHERE id = $3")
            .bind(provider_id)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Postgres User Deletion Failed: {:?}", e);
                AppError::Database(e)
            })?;
        Ok(())
    }
}
