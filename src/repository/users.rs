//! Users repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{map_unique_violation, AppError, AppResult},
    models::user::{NewUser, UpdateUser, User},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Exact-match, case-sensitive lookup (documented limitation).
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Find by reset-token digest, only while the window is still open.
    pub async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE password_reset_token = $1 AND password_reset_expires > $2",
        )
        .bind(digest)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_verification_digest(&self, digest: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE verification_token = $1")
            .bind(digest)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn email_exists(&self, email: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id != $2)")
                .bind(email)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// List all users
    pub async fn list(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Insert a fully-resolved user record
    pub async fn create(&self, user: &NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, first_name, last_name, email, phone,
                password_hash, external_id, auth_method,
                membership_tier, is_admin, status,
                library_card, membership_start, membership_end, borrowing_limit,
                email_verified, verification_token,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, false, 'active',
                    $10, $11, $12, $13, false, $14, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(&user.external_id)
        .bind(user.auth_method)
        .bind(user.membership_tier)
        .bind(&user.library_card)
        .bind(user.membership_start)
        .bind(user.membership_end)
        .bind(user.borrowing_limit)
        .bind(&user.verification_token)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(created)
    }

    /// Partial update. Callers resolve authorization and email-change
    /// semantics; `verification_token` is set when the email changed.
    pub async fn update(
        &self,
        id: Uuid,
        update: &UpdateUser,
        new_verification_token: Option<&str>,
    ) -> AppResult<User> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                membership_tier = COALESCE($6, membership_tier),
                status = COALESCE($7, status),
                borrowing_limit = COALESCE($8, borrowing_limit),
                email_verified = CASE WHEN $9::text IS NULL THEN email_verified ELSE false END,
                verification_token = COALESCE($9, verification_token),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.email)
        .bind(&update.phone)
        .bind(update.membership_tier)
        .bind(update.status)
        .bind(update.borrowing_limit)
        .bind(new_verification_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        Ok(updated)
    }

    /// Delete a user and their lending history. Refused while open loans
    /// exist unless forced; loan rows reference the member, so both deletes
    /// run in one transaction.
    pub async fn delete(&self, id: Uuid, force: bool) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        if !force {
            let active: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM loans WHERE borrower_id = $1 AND returned_at IS NULL",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if active > 0 {
                return Err(AppError::Conflict(
                    "USER_HAS_ACTIVE_LOANS",
                    format!("User has {} active loans", active),
                ));
            }
        }

        sqlx::query("DELETE FROM loans WHERE borrower_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn set_last_login(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replace the password hash. Bumps `password_changed_at`, which
    /// invalidates every token and session issued before this instant, and
    /// clears any outstanding reset token (single use).
    pub async fn set_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                password_hash = $2,
                auth_method = 'local',
                password_changed_at = NOW(),
                password_reset_token = NULL,
                password_reset_expires = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn set_reset_token(
        &self,
        id: Uuid,
        digest: &str,
        expires: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                password_reset_token = $2,
                password_reset_expires = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(digest)
        .bind(expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_email_verified(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                email_verified = true,
                verification_token = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Link an external identity. The partial unique index backs the
    /// at-most-one-account-per-external-id invariant.
    pub async fn link_external_id(&self, id: Uuid, external_id: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                external_id = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(external_id)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;
        Ok(())
    }
}
