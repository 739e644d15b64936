// handler/membership.rs
use std::sync::Arc;

use axum::{
    extract::Query, response::IntoResponse, routing::get, Extension, Json, Router,
};
use validator::Validate;

use crate::{
    db::{membershipdb::MembershipExt, paymentdb::PaymentExt},
    dtos::{
        membershipdtos::{
            FilterMembershipDto, MembershipData, MembershipListResponseDto, MembershipResponseDto,
            PricingDto, PricingListResponseDto,
        },
        userdtos::RequestQueryDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddeware,
    models::membershipmodel::{default_price, MembershipType, PaymentPurpose},
    AppState,
};

/// Routes that only need a logged-in user. The gated routers are wired
/// separately so the access-gate middleware can wrap them.
pub fn membership_handler() -> Router {
    Router::new().route("/me", get(get_my_membership))
}

pub fn pricing_handler() -> Router {
    Router::new().route("/", get(get_pricing))
}

pub fn directory_handler() -> Router {
    Router::new().route("/", get(member_directory))
}

pub fn certificate_handler() -> Router {
    Router::new().route("/", get(certificate_status))
}

pub async fn get_my_membership(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let membership = app_state
        .db_client
        .get_membership_by_user(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or(HttpError::not_found(
            ErrorMessage::MembershipNotFound.to_string(),
        ))?;

    Ok(Json(MembershipResponseDto {
        status: "success".to_string(),
        data: MembershipData {
            membership: FilterMembershipDto::filter_membership(&membership),
        },
    }))
}

/// Public pricing catalog. Falls back to the built-in defaults for any
/// purpose and tier combination without an active catalog row.
pub async fn get_pricing(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let catalog = app_state
        .db_client
        .list_pricing()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let mut pricing: Vec<PricingDto> = catalog
        .iter()
        .filter(|p| p.is_active)
        .map(PricingDto::from_pricing)
        .collect();

    for purpose in [PaymentPurpose::Registration, PaymentPurpose::AnnualDues] {
        for membership_type in [MembershipType::Individual, MembershipType::Organization] {
            let covered = pricing.iter().any(|p| {
                p.payment_purpose == purpose.to_str()
                    && p.membership_type == membership_type.to_str()
            });

            if !covered {
                let amount = default_price(purpose, membership_type);
                pricing.push(PricingDto {
                    payment_purpose: purpose.to_str().to_string(),
                    membership_type: membership_type.to_str().to_string(),
                    amount,
                    amount_display: crate::utils::currency::format_kobo_as_naira(amount),
                    is_active: true,
                });
            }
        }
    }

    Ok(Json(PricingListResponseDto {
        status: "success".to_string(),
        pricing,
    }))
}

pub async fn member_directory(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query_params): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query_params.page.unwrap_or(1) as u32;
    let limit = query_params.limit.unwrap_or(20);

    let memberships = app_state
        .db_client
        .list_active_members(page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let results = memberships.len() as i64;

    Ok(Json(MembershipListResponseDto {
        status: "success".to_string(),
        memberships: memberships
            .iter()
            .map(FilterMembershipDto::filter_membership)
            .collect(),
        results,
    }))
}

/// Reachable by any registered member, even with lapsed dues, so a member
/// whose subscription expired can still see their certificate details.
pub async fn certificate_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let membership = app_state
        .db_client
        .get_membership_by_user(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or(HttpError::not_found(
            ErrorMessage::MembershipNotFound.to_string(),
        ))?;

    Ok(Json(MembershipResponseDto {
        status: "success".to_string(),
        data: MembershipData {
            membership: FilterMembershipDto::filter_membership(&membership),
        },
    }))
}
