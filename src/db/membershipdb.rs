// db/membershipdb.rs
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::db::DBClient;

use crate::models::membershipmodel::{
    derive_certificate_number, subscription_bounds, Membership, MembershipType,
};

pub const MEMBERSHIP_COLUMNS: &str = r#"
    id, user_id, membership_id, certificate_number, membership_type, status,
    registration_paid, registration_payment_date,
    annual_dues_paid_for_year, subscription_start_date, subscription_end_date,
    last_annual_dues_payment_date,
    has_platform_access, access_suspended, access_suspended_reason,
    can_download_certificate, can_download_id_card,
    created_at, updated_at
"#;

#[async_trait]
pub trait MembershipExt {
    async fn get_membership(&self, id: Uuid) -> Result<Option<Membership>, sqlx::Error>;

    async fn get_membership_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Membership>, sqlx::Error>;

    /// Ensure a membership row exists for the user, creating a pending one
    /// if absent. An existing membership has its type updated when the
    /// caller selected a different tier at checkout.
    async fn get_or_create_membership(
        &self,
        user_id: Uuid,
        membership_type: MembershipType,
    ) -> Result<Membership, sqlx::Error>;

    async fn list_active_members(
        &self,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Membership>, sqlx::Error>;

    // Administrative overrides. These write membership fields directly and
    // deliberately bypass the payment reconciliation path.
    async fn force_activate_membership(&self, id: Uuid) -> Result<Membership, sqlx::Error>;

    async fn suspend_membership_access(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<Membership, sqlx::Error>;

    async fn restore_membership_access(&self, id: Uuid) -> Result<Membership, sqlx::Error>;

    async fn mark_annual_dues_paid(&self, id: Uuid, year: i32) -> Result<Membership, sqlx::Error>;

    /// Expiry sweep: flip active memberships to expired once their
    /// subscription end date has passed. Returns the number of rows flipped.
    async fn expire_lapsed_memberships(&self) -> Result<u64, sqlx::Error>;
}

#[async_trait]
impl MembershipExt for DBClient {
    async fn get_membership(&self, id: Uuid) -> Result<Option<Membership>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_membership_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Membership>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_or_create_membership(
        &self,
        user_id: Uuid,
        membership_type: MembershipType,
    ) -> Result<Membership, sqlx::Error> {
        if let Some(existing) = self.get_membership_by_user(user_id).await? {
            if existing.membership_type == membership_type {
                return Ok(existing);
            }

            return sqlx::query_as::<_, Membership>(&format!(
                r#"
                UPDATE memberships
                SET membership_type = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING {MEMBERSHIP_COLUMNS}
                "#
            ))
            .bind(existing.id)
            .bind(membership_type)
            .fetch_one(&self.pool)
            .await;
        }

        let membership_token = Uuid::new_v4();
        let certificate_number = derive_certificate_number(membership_token, Utc::now());

        sqlx::query_as::<_, Membership>(&format!(
            r#"
            INSERT INTO memberships (user_id, membership_id, certificate_number, membership_type)
            VALUES ($1, $2, $3, $4)
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(membership_token)
        .bind(certificate_number)
        .bind(membership_type)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_active_members(
        &self,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Membership>, sqlx::Error> {
        let offset = (page.saturating_sub(1) as usize) * limit;

        sqlx::query_as::<_, Membership>(&format!(
            r#"
            SELECT {MEMBERSHIP_COLUMNS} FROM memberships
            WHERE status = 'active' AND access_suspended = FALSE
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
    }

    async fn force_activate_membership(&self, id: Uuid) -> Result<Membership, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            r#"
            UPDATE memberships
            SET status = 'active',
                registration_paid = TRUE,
                registration_payment_date = COALESCE(registration_payment_date, NOW()),
                has_platform_access = TRUE,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
    }

    async fn suspend_membership_access(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<Membership, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            r#"
            UPDATE memberships
            SET access_suspended = TRUE,
                access_suspended_reason = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(reason)
        .fetch_one(&self.pool)
        .await
    }

    async fn restore_membership_access(&self, id: Uuid) -> Result<Membership, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            r#"
            UPDATE memberships
            SET access_suspended = FALSE,
                access_suspended_reason = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
    }

    async fn mark_annual_dues_paid(&self, id: Uuid, year: i32) -> Result<Membership, sqlx::Error> {
        let (start_date, end_date) = subscription_bounds(year);

        sqlx::query_as::<_, Membership>(&format!(
            r#"
            UPDATE memberships
            SET annual_dues_paid_for_year = $2,
                subscription_start_date = $3,
                subscription_end_date = $4,
                last_annual_dues_payment_date = NOW(),
                status = 'active',
                access_suspended = FALSE,
                access_suspended_reason = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(year)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await
    }

    async fn expire_lapsed_memberships(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE memberships
            SET status = 'expired', updated_at = NOW()
            WHERE status = 'active'
            AND subscription_end_date IS NOT NULL
            AND subscription_end_date < CURRENT_DATE
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
