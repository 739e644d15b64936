// db/paymentdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;

use crate::models::membershipmodel::{
    MembershipPricing, MembershipType, Payment, PaymentMethod, PaymentPurpose, PaymentStatus,
};

pub const PAYMENT_COLUMNS: &str = r#"
    id, payment_id, membership_id, amount, currency, payment_method, status,
    payment_purpose, subscription_year, gateway_reference, gateway_response,
    description, paid_at, created_at, updated_at
"#;

#[async_trait]
pub trait PaymentExt {
    #[allow(clippy::too_many_arguments)]
    async fn create_pending_payment(
        &self,
        membership_id: Uuid,
        amount: i64,
        payment_method: PaymentMethod,
        payment_purpose: PaymentPurpose,
        subscription_year: Option<i32>,
        gateway_reference: String,
        description: Option<String>,
    ) -> Result<Payment, sqlx::Error>;

    async fn get_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, sqlx::Error>;

    /// Mark a payment failed/cancelled after an unsuccessful gateway answer,
    /// attaching the raw payload when it has not been stored yet. Successful
    /// transitions go through the reconciliation service instead.
    async fn mark_payment_unsuccessful(
        &self,
        id: Uuid,
        status: PaymentStatus,
        gateway_response: Option<serde_json::Value>,
    ) -> Result<Payment, sqlx::Error>;

    async fn get_membership_payments(
        &self,
        membership_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Payment>, sqlx::Error>;

    // Pricing catalog
    async fn get_active_price(
        &self,
        purpose: PaymentPurpose,
        membership_type: MembershipType,
    ) -> Result<Option<MembershipPricing>, sqlx::Error>;

    async fn list_pricing(&self) -> Result<Vec<MembershipPricing>, sqlx::Error>;

    async fn upsert_pricing(
        &self,
        purpose: PaymentPurpose,
        membership_type: MembershipType,
        amount: i64,
        is_active: bool,
    ) -> Result<MembershipPricing, sqlx::Error>;
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn create_pending_payment(
        &self,
        membership_id: Uuid,
        amount: i64,
        payment_method: PaymentMethod,
        payment_purpose: PaymentPurpose,
        subscription_year: Option<i32>,
        gateway_reference: String,
        description: Option<String>,
    ) -> Result<Payment, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments
                (membership_id, amount, payment_method, payment_purpose,
                 subscription_year, gateway_reference, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(membership_id)
        .bind(amount)
        .bind(payment_method)
        .bind(payment_purpose)
        .bind(subscription_year)
        .bind(gateway_reference)
        .bind(description)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_payment_unsuccessful(
        &self,
        id: Uuid,
        status: PaymentStatus,
        gateway_response: Option<serde_json::Value>,
    ) -> Result<Payment, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $2,
                gateway_response = COALESCE(gateway_response, $3),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(gateway_response)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_membership_payments(
        &self,
        membership_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE membership_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(membership_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_active_price(
        &self,
        purpose: PaymentPurpose,
        membership_type: MembershipType,
    ) -> Result<Option<MembershipPricing>, sqlx::Error> {
        sqlx::query_as::<_, MembershipPricing>(
            r#"
            SELECT id, payment_purpose, membership_type, amount, is_active, created_at, updated_at
            FROM membership_pricing
            WHERE payment_purpose = $1 AND membership_type = $2 AND is_active = TRUE
            "#,
        )
        .bind(purpose)
        .bind(membership_type)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_pricing(&self) -> Result<Vec<MembershipPricing>, sqlx::Error> {
        sqlx::query_as::<_, MembershipPricing>(
            r#"
            SELECT id, payment_purpose, membership_type, amount, is_active, created_at, updated_at
            FROM membership_pricing
            ORDER BY payment_purpose, membership_type
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn upsert_pricing(
        &self,
        purpose: PaymentPurpose,
        membership_type: MembershipType,
        amount: i64,
        is_active: bool,
    ) -> Result<MembershipPricing, sqlx::Error> {
        sqlx::query_as::<_, MembershipPricing>(
            r#"
            INSERT INTO membership_pricing (payment_purpose, membership_type, amount, is_active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (payment_purpose, membership_type)
            DO UPDATE SET amount = EXCLUDED.amount,
                          is_active = EXCLUDED.is_active,
                          updated_at = NOW()
            RETURNING id, payment_purpose, membership_type, amount, is_active, created_at, updated_at
            "#,
        )
        .bind(purpose)
        .bind(membership_type)
        .bind(amount)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
    }
}
