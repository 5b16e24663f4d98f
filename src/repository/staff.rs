//! Staff repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{map_unique_violation, AppError, AppResult},
    models::staff::{NewStaff, Staff, UpdateStaff},
};

#[derive(Clone)]
pub struct StaffRepository {
    pool: Pool<Postgres>,
}

impl StaffRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get staff member by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Staff> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Staff member with id {} not found", id)))
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Staff>> {
        let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(staff)
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Staff>> {
        let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(staff)
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<Staff>> {
        let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(staff)
    }

    pub async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Staff>> {
        let staff = sqlx::query_as::<_, Staff>(
            "SELECT * FROM staff WHERE password_reset_token = $1 AND password_reset_expires > $2",
        )
        .bind(digest)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(staff)
    }

    pub async fn email_exists(&self, email: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM staff WHERE email = $1 AND id != $2)")
                .bind(email)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM staff WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// List all staff members
    pub async fn list(&self) -> AppResult<Vec<Staff>> {
        let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(staff)
    }

    /// Insert a fully-resolved staff record
    pub async fn create(&self, staff: &NewStaff) -> AppResult<Staff> {
        let created = sqlx::query_as::<_, Staff>(
            r#"
            INSERT INTO staff (
                id, first_name, last_name, email, phone,
                position, department, hire_date,
                password_hash, auth_method, is_admin, status,
                employee_code, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'active',
                    $12, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&staff.first_name)
        .bind(&staff.last_name)
        .bind(&staff.email)
        .bind(&staff.phone)
        .bind(&staff.position)
        .bind(&staff.department)
        .bind(staff.hire_date)
        .bind(&staff.password_hash)
        .bind(staff.auth_method)
        .bind(staff.is_admin)
        .bind(&staff.employee_code)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(created)
    }

    /// Partial update
    pub async fn update(&self, id: Uuid, update: &UpdateStaff) -> AppResult<Staff> {
        let updated = sqlx::query_as::<_, Staff>(
            r#"
            UPDATE staff SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                position = COALESCE($6, position),
                department = COALESCE($7, department),
                status = COALESCE($8, status),
                is_admin = COALESCE($9, is_admin),
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
        .bind(&update.position)
        .bind(&update.department)
        .bind(update.status)
        .bind(update.is_admin)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?
        .ok_or_else(|| AppError::NotFound(format!("Staff member with id {} not found", id)))?;

        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM staff WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Staff member with id {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Replace the password hash; same token-invalidation semantics as the
    /// users table.
    pub async fn set_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE staff SET
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
            return Err(AppError::NotFound(format!(
                "Staff member with id {} not found",
                id
            )));
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
            UPDATE staff SET
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

    pub async fn link_external_id(&self, id: Uuid, external_id: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE staff SET
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
