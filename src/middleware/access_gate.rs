// middleware/access_gate.rs
//
// Membership gate for member-only routes. The decision logic is a pure
// function over the user's role and membership row so the precedence of
// the checks can be tested without a database.
use std::sync::Arc;

use axum::{extract::Request, middleware::Next, response::IntoResponse, Extension};

use crate::{
    db::membershipdb::MembershipExt,
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddeware,
    models::membershipmodel::Membership,
    AppState,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccessPolicy {
    /// Registration paid, not suspended, and dues current for this year.
    Full,
    /// Registration paid is enough. Used for routes a lapsed member may
    /// still reach, like checking their certificate status.
    RegistrationOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccessDecision {
    Allow,
    RegistrationRequired,
    PaymentRequired,
    Suspended(Option<String>),
    RenewalRequired,
}

/// Checks run in a fixed order and the first failure wins:
/// missing membership, unpaid registration, suspension, lapsed dues.
/// Admins and staff bypass the gate entirely.
pub fn evaluate_access(
    is_admin: bool,
    membership: Option<&Membership>,
    policy: AccessPolicy,
) -> AccessDecision {
    if is_admin {
        return AccessDecision::Allow;
    }

    let membership = match membership {
        Some(membership) => membership,
        None => return AccessDecision::RegistrationRequired,
    };

    if !membership.registration_paid {
        return AccessDecision::PaymentRequired;
    }

    if policy == AccessPolicy::RegistrationOnly {
        return AccessDecision::Allow;
    }

    if membership.access_suspended {
        return AccessDecision::Suspended(membership.access_suspended_reason.clone());
    }

    if !membership.has_active_subscription() {
        return AccessDecision::RenewalRequired;
    }

    AccessDecision::Allow
}

impl AccessDecision {
    pub fn into_result(self) -> Result<(), HttpError> {
        match self {
            AccessDecision::Allow => Ok(()),
            AccessDecision::RegistrationRequired => Err(HttpError::forbidden(
                ErrorMessage::MembershipNotFound.to_string(),
            )),
            AccessDecision::PaymentRequired => Err(HttpError::payment_required(
                ErrorMessage::RegistrationPaymentRequired.to_string(),
            )),
            AccessDecision::Suspended(reason) => {
                let message = match reason {
                    Some(reason) => format!("Your access has been suspended: {}", reason),
                    None => ErrorMessage::AccessSuspended.to_string(),
                };
                Err(HttpError::forbidden(message))
            }
            AccessDecision::RenewalRequired => Err(HttpError::payment_required(
                ErrorMessage::SubscriptionExpired.to_string(),
            )),
        }
    }
}

async fn gate(
    app_state: Arc<AppState>,
    req: Request,
    next: Next,
    policy: AccessPolicy,
) -> Result<impl IntoResponse, HttpError> {
    let auth = req
        .extensions()
        .get::<JWTAuthMiddeware>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    let membership = app_state
        .db_client
        .get_membership_by_user(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    evaluate_access(auth.user.role.is_admin(), membership.as_ref(), policy).into_result()?;

    Ok(next.run(req).await)
}

pub async fn require_active_membership(
    Extension(app_state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    gate(app_state, req, next, AccessPolicy::Full).await
}

pub async fn require_registered_membership(
    Extension(app_state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    gate(app_state, req, next, AccessPolicy::RegistrationOnly).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::membershipmodel::{
        subscription_bounds, MembershipStatus, MembershipType,
    };
    use chrono::{Datelike, Utc};
    use uuid::Uuid;

    fn membership(registration_paid: bool, dues_year: Option<i32>, suspended: bool) -> Membership {
        let now = Utc::now();
        Membership {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            membership_id: Uuid::new_v4(),
            certificate_number: "AGC-2025-0A1B2C3D".to_string(),
            membership_type: MembershipType::Individual,
            status: MembershipStatus::Active,
            registration_paid,
            registration_payment_date: registration_paid.then_some(now),
            annual_dues_paid_for_year: dues_year,
            subscription_start_date: dues_year.map(|y| subscription_bounds(y).0),
            subscription_end_date: dues_year.map(|y| subscription_bounds(y).1),
            last_annual_dues_payment_date: dues_year.map(|_| now),
            has_platform_access: true,
            access_suspended: suspended,
            access_suspended_reason: suspended.then(|| "dues dispute".to_string()),
            can_download_certificate: false,
            can_download_id_card: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn missing_membership_requires_registration() {
        assert_eq!(
            evaluate_access(false, None, AccessPolicy::Full),
            AccessDecision::RegistrationRequired
        );
    }

    #[test]
    fn unpaid_registration_requires_payment() {
        let m = membership(false, None, false);
        assert_eq!(
            evaluate_access(false, Some(&m), AccessPolicy::Full),
            AccessDecision::PaymentRequired
        );
    }

    #[test]
    fn suspension_beats_lapsed_dues() {
        let m = membership(true, None, true);
        assert_eq!(
            evaluate_access(false, Some(&m), AccessPolicy::Full),
            AccessDecision::Suspended(Some("dues dispute".to_string()))
        );
    }

    #[test]
    fn lapsed_dues_require_renewal() {
        let m = membership(true, Some(Utc::now().year() - 1), false);
        assert_eq!(
            evaluate_access(false, Some(&m), AccessPolicy::Full),
            AccessDecision::RenewalRequired
        );
    }

    #[test]
    fn current_dues_allow_access() {
        let m = membership(true, Some(Utc::now().year()), false);
        assert_eq!(
            evaluate_access(false, Some(&m), AccessPolicy::Full),
            AccessDecision::Allow
        );
    }

    #[test]
    fn registration_only_policy_ignores_dues_and_suspension() {
        let m = membership(true, None, true);
        assert_eq!(
            evaluate_access(false, Some(&m), AccessPolicy::RegistrationOnly),
            AccessDecision::Allow
        );
    }

    #[test]
    fn admins_bypass_every_check() {
        assert_eq!(
            evaluate_access(true, None, AccessPolicy::Full),
            AccessDecision::Allow
        );

        let m = membership(false, None, true);
        assert_eq!(
            evaluate_access(true, Some(&m), AccessPolicy::Full),
            AccessDecision::Allow
        );
    }
}
