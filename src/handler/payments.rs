// handler/payments.rs
use std::sync::Arc;

use axum::{
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Datelike, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use validator::Validate;

use crate::{
    db::{membershipdb::MembershipExt, paymentdb::PaymentExt, userdb::UserExt},
    dtos::{
        membershipdtos::{
            FilterPaymentDto, InitiatePaymentDto, InitiatePaymentResponseDto,
            PaymentListResponseDto, VerifyPaymentQueryDto,
        },
        userdtos::RequestQueryDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddeware,
    models::membershipmodel::{default_price, PaymentMethod, PaymentPurpose, PaymentStatus},
    service::reconciliation::reconcile_payment_success,
    utils::{currency, reference},
    AppState,
};

pub fn payments_handler() -> Router {
    Router::new()
        .route("/initiate", post(initiate_payment))
        .route("/history", get(payment_history))
}

/// Callback and webhook endpoints. Paystack calls these, so they carry no
/// auth middleware; the webhook is protected by its signature and the
/// callback only redirects.
pub fn payments_public_handler() -> Router {
    Router::new()
        .route("/verify", get(verify_payment))
        .route("/webhook/paystack", post(paystack_webhook))
}

pub async fn initiate_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<InitiatePaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let membership_type = match body.membership_type {
        Some(membership_type) => membership_type,
        None => match app_state
            .db_client
            .get_membership_by_user(auth.user.id)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?
        {
            Some(existing) => existing.membership_type,
            None => crate::models::membershipmodel::MembershipType::Individual,
        },
    };

    let membership = app_state
        .db_client
        .get_or_create_membership(auth.user.id, membership_type)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let subscription_year = match body.payment_purpose {
        PaymentPurpose::Registration => {
            if membership.registration_paid {
                return Err(HttpError::bad_request(
                    "Registration has already been paid for this membership",
                ));
            }
            None
        }
        PaymentPurpose::AnnualDues => {
            if !membership.registration_paid {
                return Err(HttpError::payment_required(
                    ErrorMessage::RegistrationPaymentRequired.to_string(),
                ));
            }

            let year = body.subscription_year.unwrap_or_else(|| Utc::now().year());
            if membership.annual_dues_paid_for_year == Some(year) {
                return Err(HttpError::bad_request(format!(
                    "Annual dues already paid for {}",
                    year
                )));
            }
            Some(year)
        }
    };

    let amount = match &body.amount {
        Some(amount_str) => currency::parse_amount_to_kobo(amount_str)?,
        None => {
            let catalog_price = app_state
                .db_client
                .get_active_price(body.payment_purpose, membership_type)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?;

            catalog_price
                .map(|p| p.amount)
                .unwrap_or_else(|| default_price(body.payment_purpose, membership_type))
        }
    };

    let payment_reference =
        reference::generate_payment_reference(body.payment_purpose, membership_type);

    let description = match subscription_year {
        Some(year) => format!(
            "{} membership annual dues for {}",
            membership_type.to_str(),
            year
        ),
        None => format!("{} membership registration", membership_type.to_str()),
    };

    let payment = app_state
        .db_client
        .create_pending_payment(
            membership.id,
            amount,
            body.payment_method.unwrap_or(PaymentMethod::Card),
            body.payment_purpose,
            subscription_year,
            payment_reference.clone(),
            Some(description),
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let callback_url = format!("{}/api/payments/verify", app_state.env.app_url);
    let metadata = json!({
        "membership_id": membership.membership_id,
        "payment_purpose": body.payment_purpose.to_str(),
        "subscription_year": subscription_year,
    });

    let session = match app_state
        .paystack
        .initialize_transaction(
            &auth.user.email,
            amount,
            &payment_reference,
            &callback_url,
            Some(metadata),
        )
        .await
    {
        Ok(session) => session,
        Err(e) => {
            // The pending row stays; the member can retry and verification
            // will settle its final state.
            tracing::error!("Paystack initialization failed for {}: {}", payment_reference, e);
            return Err(HttpError::bad_gateway(e.to_string()));
        }
    };

    Ok(Json(InitiatePaymentResponseDto {
        status: "success".to_string(),
        message: "Payment initialized. Redirect the member to the checkout URL".to_string(),
        checkout_url: session.checkout_url,
        reference: session.reference,
        payment: FilterPaymentDto::filter_payment(&payment),
    }))
}

/// Paystack redirect target. Verifies the transaction against the gateway
/// and sends the member to the frontend success or retry page. Safe to hit
/// repeatedly: an already-successful payment short-circuits to success.
pub async fn verify_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query_params): Query<VerifyPaymentQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let frontend = &app_state.env.frontend_url;

    let payment_reference = match query_params.reference() {
        Some(r) => r.to_string(),
        None => {
            return Ok(Redirect::to(&format!("{}/payment/retry", frontend)).into_response());
        }
    };

    if !reference::looks_like_payment_reference(&payment_reference) {
        tracing::warn!("Rejected malformed payment reference: {}", payment_reference);
        return Ok(Redirect::to(&format!("{}/payment/retry", frontend)).into_response());
    }

    let payment = match app_state
        .db_client
        .get_payment_by_reference(&payment_reference)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
    {
        Some(payment) => payment,
        None => {
            tracing::warn!("Verification for unknown reference: {}", payment_reference);
            return Ok(Redirect::to(&format!("{}/payment/retry", frontend)).into_response());
        }
    };

    if payment.status == PaymentStatus::Successful {
        return Ok(Redirect::to(&format!(
            "{}/payment/success?reference={}",
            frontend,
            urlencoding::encode(&payment_reference)
        ))
        .into_response());
    }

    let outcome = app_state.paystack.verify_transaction(&payment_reference).await;

    if outcome.success {
        let result = reconcile_payment_success(&app_state.db_client, payment.id, Some(outcome.raw))
            .await
            .map_err(HttpError::from)?;

        send_receipt_email(&app_state, &result.payment).await;

        Ok(Redirect::to(&format!(
            "{}/payment/success?reference={}",
            frontend,
            urlencoding::encode(&payment_reference)
        ))
        .into_response())
    } else {
        if let Err(e) = app_state
            .db_client
            .mark_payment_unsuccessful(payment.id, PaymentStatus::Failed, Some(outcome.raw))
            .await
        {
            // The member still lands on the retry page; the row stays
            // pending until the webhook or a later verify settles it.
            tracing::error!(
                "Failed to mark payment {} as failed: {}",
                payment.payment_id,
                e
            );
        }

        Ok(Redirect::to(&format!(
            "{}/payment/retry?reference={}",
            frontend,
            urlencoding::encode(&payment_reference)
        ))
        .into_response())
    }
}

pub async fn paystack_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("x-paystack-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            HttpError::new(
                "Missing or invalid Paystack signature".to_string(),
                StatusCode::BAD_REQUEST,
            )
        })?;

    if !verify_paystack_signature(&body, signature, &app_state.env.paystack_secret_key) {
        tracing::warn!("Invalid Paystack webhook signature received");
        return Err(HttpError::new(
            "Invalid webhook signature".to_string(),
            StatusCode::UNAUTHORIZED,
        ));
    }

    let event = body["event"].as_str().unwrap_or("");
    let payment_reference = body["data"]["reference"].as_str().unwrap_or("");

    match event {
        "charge.success" => {
            let payment = app_state
                .db_client
                .get_payment_by_reference(payment_reference)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?;

            match payment {
                Some(payment) => {
                    let result = reconcile_payment_success(
                        &app_state.db_client,
                        payment.id,
                        Some(body["data"].clone()),
                    )
                    .await
                    .map_err(HttpError::from)?;

                    send_receipt_email(&app_state, &result.payment).await;
                }
                None => {
                    tracing::warn!("Webhook for unknown payment reference: {}", payment_reference);
                }
            }
        }
        "charge.failed" => {
            if let Some(payment) = app_state
                .db_client
                .get_payment_by_reference(payment_reference)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?
            {
                if payment.status != PaymentStatus::Successful {
                    // Propagating the error makes Paystack redeliver the
                    // event instead of leaving the row pending forever
                    app_state
                        .db_client
                        .mark_payment_unsuccessful(
                            payment.id,
                            PaymentStatus::Failed,
                            Some(body["data"].clone()),
                        )
                        .await
                        .map_err(|e| {
                            tracing::error!(
                                "Failed to mark payment {} as failed: {}",
                                payment.payment_id,
                                e
                            );
                            HttpError::server_error(e.to_string())
                        })?;
                }
            }
        }
        other => {
            tracing::debug!("Ignoring Paystack event: {}", other);
        }
    }

    // Paystack retries anything that is not a 200
    Ok(StatusCode::OK)
}

pub async fn payment_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query_params): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let membership = app_state
        .db_client
        .get_membership_by_user(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or(HttpError::not_found(
            ErrorMessage::MembershipNotFound.to_string(),
        ))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(20);
    let offset = page.saturating_sub(1) * limit;

    let payments = app_state
        .db_client
        .get_membership_payments(membership.id, limit, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let results = payments.len() as i64;

    Ok(Json(PaymentListResponseDto {
        status: "success".to_string(),
        payments: payments.iter().map(FilterPaymentDto::filter_payment).collect(),
        results,
    }))
}

/// Best effort: a receipt that fails to send never fails the payment.
async fn send_receipt_email(app_state: &Arc<AppState>, payment: &crate::models::membershipmodel::Payment) {
    let membership = match app_state.db_client.get_membership(payment.membership_id).await {
        Ok(Some(membership)) => membership,
        _ => return,
    };

    let user = match app_state
        .db_client
        .get_user(Some(membership.user_id), None, None, None)
        .await
    {
        Ok(Some(user)) => user,
        _ => return,
    };

    if let Err(e) = app_state
        .mailer
        .send_payment_receipt(&user.email, &user.username, payment)
        .await
    {
        tracing::warn!("Failed to send payment receipt to {}: {}", user.email, e);
    }
}

fn verify_paystack_signature(payload: &Value, signature: &str, secret: &str) -> bool {
    let payload_string = payload.to_string();

    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload_string.as_bytes());

    let expected_signature = mac.finalize().into_bytes();
    let expected_signature_hex = hex::encode(expected_signature);

    ConstantTimeEq::ct_eq(signature.as_bytes(), expected_signature_hex.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &Value, secret: &str) -> String {
        let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_correctly_signed_payload() {
        let payload = json!({ "event": "charge.success", "data": { "reference": "AGC-X" } });
        let signature = sign(&payload, "secret");
        assert!(verify_paystack_signature(&payload, &signature, "secret"));
    }

    #[test]
    fn rejects_wrong_secret_or_tampered_payload() {
        let payload = json!({ "event": "charge.success", "data": { "reference": "AGC-X" } });
        let signature = sign(&payload, "secret");

        assert!(!verify_paystack_signature(&payload, &signature, "other-secret"));

        let tampered = json!({ "event": "charge.success", "data": { "reference": "AGC-Y" } });
        assert!(!verify_paystack_signature(&tampered, &signature, "secret"));
    }
}
