// service/reconciliation.rs
//
// Single entry point for marking a payment successful and applying its
// effect on the owning membership. Both rows are updated inside one
// transaction with row locks, so concurrent webhook and verify callbacks
// cannot double-apply a payment.
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::db::db::DBClient;
use crate::db::membershipdb::MEMBERSHIP_COLUMNS;
use crate::db::paymentdb::PAYMENT_COLUMNS;
use crate::models::membershipmodel::{
    subscription_bounds, Membership, Payment, PaymentPurpose, PaymentStatus,
};

use super::error::ServiceError;

/// What a successful-payment transition should do to the membership.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconciliationAction {
    /// The payment was already successful (or the transition is not into
    /// the successful state). Nothing to apply.
    NoOp,
    ActivateRegistration,
    ActivateAnnualDues { year: i32 },
    /// Dues payment with no subscription year recorded. The payment is
    /// still persisted as successful but the membership is left alone.
    SkipMissingYear,
}

/// Pure decision table for the status transition. Only the transition
/// into `Successful` from a non-successful state has membership effects;
/// everything else is a no-op, which makes re-delivered webhooks and
/// repeated verify calls harmless.
pub fn plan_reconciliation(
    previous_status: PaymentStatus,
    new_status: PaymentStatus,
    purpose: PaymentPurpose,
    subscription_year: Option<i32>,
) -> ReconciliationAction {
    if new_status != PaymentStatus::Successful || previous_status == PaymentStatus::Successful {
        return ReconciliationAction::NoOp;
    }

    match purpose {
        PaymentPurpose::Registration => ReconciliationAction::ActivateRegistration,
        PaymentPurpose::AnnualDues => match subscription_year {
            Some(year) => ReconciliationAction::ActivateAnnualDues { year },
            None => ReconciliationAction::SkipMissingYear,
        },
    }
}

#[derive(Debug)]
pub struct ReconciliationOutcome {
    pub payment: Payment,
    pub membership: Option<Membership>,
    pub action: ReconciliationAction,
}

/// The first successful reconciliation stamps `paid_at`; the timestamp
/// never moves afterwards.
fn resolve_paid_at(existing: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    existing.unwrap_or(now)
}

/// The raw gateway payload is write-once: whichever delivery arrives
/// first wins, later payloads are discarded.
fn resolve_gateway_response(existing: Option<Value>, incoming: Option<Value>) -> Option<Value> {
    existing.or(incoming)
}

/// Mark a payment successful and activate the membership accordingly.
///
/// The payment row is locked first, then the membership row, and every
/// write happens in the same transaction. `paid_at` is only set when it
/// is still NULL, so the first successful reconciliation wins and the
/// timestamp never moves afterwards.
pub async fn reconcile_payment_success(
    db: &DBClient,
    payment_id: Uuid,
    gateway_response: Option<Value>,
) -> Result<ReconciliationOutcome, ServiceError> {
    let mut tx = db.pool.begin().await?;

    let payment = sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 OR payment_id = $1 FOR UPDATE"
    ))
    .bind(payment_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ServiceError::PaymentNotFound(payment_id))?;

    let action = plan_reconciliation(
        payment.status,
        PaymentStatus::Successful,
        payment.payment_purpose,
        payment.subscription_year,
    );

    if action == ReconciliationAction::NoOp {
        tx.commit().await?;
        tracing::info!(
            "Payment {} already reconciled, nothing to do",
            payment.gateway_reference
        );
        return Ok(ReconciliationOutcome {
            payment,
            membership: None,
            action,
        });
    }

    // The row is locked, so resolving these in code is race-free.
    let paid_at = resolve_paid_at(payment.paid_at, Utc::now());
    let gateway_response =
        resolve_gateway_response(payment.gateway_response.clone(), gateway_response);

    let payment = sqlx::query_as::<_, Payment>(&format!(
        r#"
        UPDATE payments
        SET status = 'successful',
            paid_at = $2,
            gateway_response = $3,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {PAYMENT_COLUMNS}
        "#
    ))
    .bind(payment.id)
    .bind(paid_at)
    .bind(gateway_response)
    .fetch_one(&mut *tx)
    .await?;

    let membership = match action {
        ReconciliationAction::ActivateRegistration => {
            lock_membership(&mut tx, payment.membership_id)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Reconciliation failed for payment {} (membership {}): {}",
                        payment.payment_id,
                        payment.membership_id,
                        e
                    );
                    e
                })?;

            let membership = sqlx::query_as::<_, Membership>(&format!(
                r#"
                UPDATE memberships
                SET registration_paid = TRUE,
                    registration_payment_date = $2,
                    status = 'active',
                    updated_at = NOW()
                WHERE id = $1
                RETURNING {MEMBERSHIP_COLUMNS}
                "#
            ))
            .bind(payment.membership_id)
            .bind(payment.paid_at)
            .fetch_one(&mut *tx)
            .await?;

            tracing::info!(
                "Registration payment {} activated membership {}",
                payment.gateway_reference,
                membership.membership_id
            );
            Some(membership)
        }
        ReconciliationAction::ActivateAnnualDues { year } => {
            lock_membership(&mut tx, payment.membership_id)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Reconciliation failed for payment {} (membership {}): {}",
                        payment.payment_id,
                        payment.membership_id,
                        e
                    );
                    e
                })?;

            let (start_date, end_date) = subscription_bounds(year);
            let membership = sqlx::query_as::<_, Membership>(&format!(
                r#"
                UPDATE memberships
                SET annual_dues_paid_for_year = $2,
                    subscription_start_date = $3,
                    subscription_end_date = $4,
                    last_annual_dues_payment_date = $5,
                    status = 'active',
                    access_suspended = FALSE,
                    access_suspended_reason = NULL,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING {MEMBERSHIP_COLUMNS}
                "#
            ))
            .bind(payment.membership_id)
            .bind(year)
            .bind(start_date)
            .bind(end_date)
            .bind(payment.paid_at)
            .fetch_one(&mut *tx)
            .await?;

            tracing::info!(
                "Annual dues payment {} renewed membership {} for {}",
                payment.gateway_reference,
                membership.membership_id,
                year
            );
            Some(membership)
        }
        ReconciliationAction::SkipMissingYear => {
            tracing::warn!(
                "Annual dues payment {} has no subscription year, membership left untouched",
                payment.gateway_reference
            );
            None
        }
        ReconciliationAction::NoOp => unreachable!("handled before any write"),
    };

    tx.commit().await?;

    Ok(ReconciliationOutcome {
        payment,
        membership,
        action,
    })
}

async fn lock_membership(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    membership_id: Uuid,
) -> Result<(), ServiceError> {
    sqlx::query("SELECT id FROM memberships WHERE id = $1 FOR UPDATE")
        .bind(membership_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(ServiceError::MembershipNotFound(membership_id))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_success_activates_registration() {
        let action = plan_reconciliation(
            PaymentStatus::Pending,
            PaymentStatus::Successful,
            PaymentPurpose::Registration,
            None,
        );
        assert_eq!(action, ReconciliationAction::ActivateRegistration);
    }

    #[test]
    fn annual_dues_success_carries_the_year() {
        let action = plan_reconciliation(
            PaymentStatus::Processing,
            PaymentStatus::Successful,
            PaymentPurpose::AnnualDues,
            Some(2026),
        );
        assert_eq!(action, ReconciliationAction::ActivateAnnualDues { year: 2026 });
    }

    #[test]
    fn repeated_success_is_a_noop() {
        let action = plan_reconciliation(
            PaymentStatus::Successful,
            PaymentStatus::Successful,
            PaymentPurpose::Registration,
            None,
        );
        assert_eq!(action, ReconciliationAction::NoOp);
    }

    #[test]
    fn non_success_transitions_do_nothing() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Processing,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
            PaymentStatus::Refunded,
        ] {
            let action = plan_reconciliation(
                PaymentStatus::Pending,
                status,
                PaymentPurpose::AnnualDues,
                Some(2025),
            );
            assert_eq!(action, ReconciliationAction::NoOp);
        }
    }

    #[test]
    fn paid_at_is_stamped_once_and_never_moves() {
        let first = Utc::now();
        let later = first + chrono::Duration::hours(3);

        let stamped = resolve_paid_at(None, first);
        assert_eq!(stamped, first);

        // A redelivered success must not touch the original timestamp
        assert_eq!(resolve_paid_at(Some(stamped), later), first);
    }

    #[test]
    fn gateway_response_is_write_once() {
        let first = serde_json::json!({ "status": "success", "channel": "card" });
        let second = serde_json::json!({ "status": "success", "channel": "bank" });

        assert_eq!(
            resolve_gateway_response(None, Some(first.clone())),
            Some(first.clone())
        );
        assert_eq!(
            resolve_gateway_response(Some(first.clone()), Some(second)),
            Some(first.clone())
        );
        assert_eq!(resolve_gateway_response(Some(first.clone()), None), Some(first));
    }

    #[test]
    fn dues_without_year_skips_membership() {
        let action = plan_reconciliation(
            PaymentStatus::Pending,
            PaymentStatus::Successful,
            PaymentPurpose::AnnualDues,
            None,
        );
        assert_eq!(action, ReconciliationAction::SkipMissingYear);
    }
}
