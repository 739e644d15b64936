// handler/admin.rs
//
// Administrative overrides. Every route here is wrapped by the auth and
// role-check middleware in routes.rs, so handlers can assume an admin or
// staff caller. These endpoints write membership state directly and skip
// the payment reconciliation path on purpose, except the manual payment
// fix which funnels through it.
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{membershipdb::MembershipExt, paymentdb::PaymentExt, userdb::UserExt},
    dtos::{
        membershipdtos::{
            FilterMembershipDto, FilterPaymentDto, ManualPaymentFixDto, MarkDuesPaidDto,
            MembershipData, MembershipResponseDto, PaymentResponseDto, PricingDto,
            PricingListResponseDto, PricingResponseDto, SuspendAccessDto, UpsertPricingDto,
        },
        userdtos::{FilterUserDto, RequestQueryDto, RoleUpdateDto, UserListResponseDto},
    },
    error::{ErrorMessage, HttpError},
    models::membershipmodel::PaymentStatus,
    service::reconciliation::reconcile_payment_success,
    utils::currency,
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:user_id/role", put(update_user_role))
        .route("/memberships/:membership_id/activate", post(force_activate))
        .route("/memberships/:membership_id/suspend", post(suspend_access))
        .route("/memberships/:membership_id/restore", post(restore_access))
        .route("/memberships/:membership_id/mark-dues", post(mark_dues_paid))
        .route("/pricing", get(list_pricing).put(upsert_pricing))
        .route("/payments/fix", post(fix_payment))
}

pub async fn list_users(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query_params): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query_params.page.unwrap_or(1) as u32;
    let limit = query_params.limit.unwrap_or(20);

    let users = app_state
        .db_client
        .get_users(page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let user_count = app_state
        .db_client
        .get_user_count()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        users: users.iter().map(FilterUserDto::filter_user).collect(),
        results: user_count,
    }))
}

pub async fn update_user_role(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<RoleUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .update_user_role(user_id, body.role)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "user": FilterUserDto::filter_user(&user) }
    })))
}

pub async fn force_activate(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(membership_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    require_membership(&app_state, membership_id).await?;

    let membership = app_state
        .db_client
        .force_activate_membership(membership_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!("Membership {} force activated by admin", membership.membership_id);

    Ok(Json(MembershipResponseDto {
        status: "success".to_string(),
        data: MembershipData {
            membership: FilterMembershipDto::filter_membership(&membership),
        },
    }))
}

pub async fn suspend_access(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(membership_id): Path<Uuid>,
    Json(body): Json<SuspendAccessDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    require_membership(&app_state, membership_id).await?;

    let membership = app_state
        .db_client
        .suspend_membership_access(membership_id, body.reason)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!("Membership {} access suspended", membership.membership_id);

    Ok(Json(MembershipResponseDto {
        status: "success".to_string(),
        data: MembershipData {
            membership: FilterMembershipDto::filter_membership(&membership),
        },
    }))
}

pub async fn restore_access(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(membership_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    require_membership(&app_state, membership_id).await?;

    let membership = app_state
        .db_client
        .restore_membership_access(membership_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!("Membership {} access restored", membership.membership_id);

    Ok(Json(MembershipResponseDto {
        status: "success".to_string(),
        data: MembershipData {
            membership: FilterMembershipDto::filter_membership(&membership),
        },
    }))
}

pub async fn mark_dues_paid(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(membership_id): Path<Uuid>,
    Json(body): Json<MarkDuesPaidDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    require_membership(&app_state, membership_id).await?;

    let membership = app_state
        .db_client
        .mark_annual_dues_paid(membership_id, body.year)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!(
        "Membership {} marked dues-paid for {} by admin",
        membership.membership_id,
        body.year
    );

    Ok(Json(MembershipResponseDto {
        status: "success".to_string(),
        data: MembershipData {
            membership: FilterMembershipDto::filter_membership(&membership),
        },
    }))
}

pub async fn list_pricing(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let catalog = app_state
        .db_client
        .list_pricing()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(PricingListResponseDto {
        status: "success".to_string(),
        pricing: catalog.iter().map(PricingDto::from_pricing).collect(),
    }))
}

pub async fn upsert_pricing(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<UpsertPricingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let amount = currency::parse_amount_to_kobo(&body.amount)?;

    let pricing = app_state
        .db_client
        .upsert_pricing(
            body.payment_purpose,
            body.membership_type,
            amount,
            body.is_active.unwrap_or(true),
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!(
        "Pricing updated: {} {} -> {}",
        pricing.payment_purpose.to_str(),
        pricing.membership_type.to_str(),
        pricing.amount
    );

    Ok(Json(PricingResponseDto {
        status: "success".to_string(),
        pricing: PricingDto::from_pricing(&pricing),
    }))
}

/// Repair a stuck payment. Re-verifies with the gateway first; `force`
/// reconciles without gateway confirmation for payments settled out of
/// band.
pub async fn fix_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ManualPaymentFixDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let payment = app_state
        .db_client
        .get_payment_by_reference(&body.reference)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or(HttpError::not_found(
            ErrorMessage::PaymentNotFound.to_string(),
        ))?;

    if payment.status == PaymentStatus::Successful {
        return Ok(Json(PaymentResponseDto {
            status: "success".to_string(),
            payment: FilterPaymentDto::filter_payment(&payment),
        }));
    }

    let force = body.force.unwrap_or(false);
    let outcome = app_state.paystack.verify_transaction(&body.reference).await;

    if !outcome.success && !force {
        return Err(HttpError::bad_request(format!(
            "Gateway does not report {} as paid. Pass force=true to reconcile anyway",
            body.reference
        )));
    }

    let gateway_response = outcome.success.then_some(outcome.raw);
    let result = reconcile_payment_success(&app_state.db_client, payment.id, gateway_response)
        .await
        .map_err(HttpError::from)?;

    tracing::info!(
        "Payment {} manually reconciled (force: {})",
        body.reference,
        force
    );

    Ok(Json(PaymentResponseDto {
        status: "success".to_string(),
        payment: FilterPaymentDto::filter_payment(&result.payment),
    }))
}

async fn require_membership(
    app_state: &Arc<AppState>,
    membership_id: Uuid,
) -> Result<(), HttpError> {
    app_state
        .db_client
        .get_membership(membership_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or(HttpError::not_found(
            ErrorMessage::MembershipNotFound.to_string(),
        ))?;

    Ok(())
}
