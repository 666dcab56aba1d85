use crate::domain::{
    models::password_change::{ChangeRequestStatus, PasswordChangeRequest, PasswordChangeRequestView},
    ports::PasswordChangeRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const VIEW_SELECT: &str = "SELECT r.id, r.user_id, r.status, r.requested_at, r.reviewed_at, r.reviewed_by, r.reason,
        u.name AS user_name, u.email AS user_email, u.role AS user_role,
        rv.name AS reviewer_name, rv.email AS reviewer_email
     FROM password_change_requests r
     LEFT JOIN users u ON u.id = r.user_id
     LEFT JOIN users rv ON rv.id = r.reviewed_by";

pub struct PostgresPasswordChangeRepo {
    pool: PgPool,
}

impl PostgresPasswordChangeRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordChangeRepository for PostgresPasswordChangeRepo {
    async fn create(&self, request: &PasswordChangeRequest) -> Result<PasswordChangeRequest, AppError> {
        sqlx::query_as::<_, PasswordChangeRequest>(
            "INSERT INTO password_change_requests (id, user_id, new_password_hash, status, requested_at, reviewed_at, reviewed_by, reason)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id, user_id, new_password_hash, status, requested_at, reviewed_at, reviewed_by, reason",
        )
            .bind(&request.id)
            .bind(&request.user_id)
            .bind(&request.new_password_hash)
            .bind(request.status.as_str())
            .bind(request.requested_at)
            .bind(request.reviewed_at)
            .bind(&request.reviewed_by)
            .bind(&request.reason)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PasswordChangeRequest>, AppError> {
        sqlx::query_as::<_, PasswordChangeRequest>(
            "SELECT id, user_id, new_password_hash, status, requested_at, reviewed_at, reviewed_by, reason
             FROM password_change_requests WHERE id = $1",
        )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_pending_for_user(&self, user_id: &str) -> Result<Option<PasswordChangeRequest>, AppError> {
        sqlx::query_as::<_, PasswordChangeRequest>(
            "SELECT id, user_id, new_password_hash, status, requested_at, reviewed_at, reviewed_by, reason
             FROM password_change_requests WHERE user_id = $1 AND status = 'Pending' LIMIT 1",
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_view(&self, id: &str) -> Result<Option<PasswordChangeRequestView>, AppError> {
        let sql = format!("{} WHERE r.id = $1", VIEW_SELECT);
        sqlx::query_as::<_, PasswordChangeRequestView>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, status: Option<ChangeRequestStatus>) -> Result<Vec<PasswordChangeRequestView>, AppError> {
        let sql = format!("{} WHERE ($1::TEXT IS NULL OR r.status = $1) ORDER BY r.requested_at DESC", VIEW_SELECT);
        sqlx::query_as::<_, PasswordChangeRequestView>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<PasswordChangeRequestView>, AppError> {
        let sql = format!("{} WHERE r.user_id = $1 ORDER BY r.requested_at DESC", VIEW_SELECT);
        sqlx::query_as::<_, PasswordChangeRequestView>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn review(
        &self,
        id: &str,
        status: ChangeRequestStatus,
        reviewer_id: &str,
        reason: Option<&str>,
        reviewed_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE password_change_requests SET status = $1, reviewed_by = $2, reviewed_at = $3, reason = $4 WHERE id = $5 AND status = 'Pending'",
        )
            .bind(status.as_str())
            .bind(reviewer_id)
            .bind(reviewed_at)
            .bind(reason)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM password_change_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
