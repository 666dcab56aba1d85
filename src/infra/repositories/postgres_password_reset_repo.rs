use crate::domain::{models::password_reset::PasswordResetToken, ports::PasswordResetRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresPasswordResetRepo {
    pool: PgPool,
}

impl PostgresPasswordResetRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordResetRepository for PostgresPasswordResetRepo {
    async fn create(&self, token: &PasswordResetToken) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at, used, created_at) VALUES ($1, $2, $3, $4, $5, $6)"
        )
            .bind(&token.id)
            .bind(&token.user_id)
            .bind(&token.token_hash)
            .bind(token.expires_at)
            .bind(token.used)
            .bind(token.created_at)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<PasswordResetToken>, AppError> {
        sqlx::query_as::<_, PasswordResetToken>(
            "SELECT id, user_id, token_hash, expires_at, used, created_at
             FROM password_reset_tokens WHERE token_hash = $1"
        )
            .bind(token_hash)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn mark_used(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE id = $1 AND used = FALSE")
            .bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}
