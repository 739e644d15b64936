// dtos/membershipdtos.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::membershipmodel::{
    Membership, MembershipPricing, MembershipType, Payment, PaymentMethod, PaymentPurpose,
};
use crate::utils::currency::format_kobo_as_naira;

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentDto {
    pub payment_purpose: PaymentPurpose,

    /// Tier being paid for. Defaults to the membership's current type.
    pub membership_type: Option<MembershipType>,

    pub payment_method: Option<PaymentMethod>,

    /// Dues year. Required for annual dues, ignored for registration.
    #[validate(range(min = 2000, max = 2100, message = "Subscription year is out of range"))]
    pub subscription_year: Option<i32>,

    /// Optional user-entered amount in naira, e.g. "10,000.00". When absent
    /// the catalog price for the purpose and tier is charged.
    pub amount: Option<String>,
}

/// Paystack redirects back with either `reference` or `trxref`.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentQueryDto {
    pub reference: Option<String>,
    pub trxref: Option<String>,
}

impl VerifyPaymentQueryDto {
    pub fn reference(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .or(self.trxref.as_deref())
            .filter(|r| !r.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterMembershipDto {
    pub id: String,
    pub membership_id: String,
    pub certificate_number: String,
    pub membership_type: String,
    pub status: String,
    pub registration_paid: bool,
    pub registration_payment_date: Option<DateTime<Utc>>,
    pub annual_dues_paid_for_year: Option<i32>,
    pub subscription_start_date: Option<NaiveDate>,
    pub subscription_end_date: Option<NaiveDate>,
    pub last_annual_dues_payment_date: Option<DateTime<Utc>>,
    pub has_active_subscription: bool,
    pub access_suspended: bool,
    pub access_suspended_reason: Option<String>,
    pub can_download_certificate: bool,
    pub can_download_id_card: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl FilterMembershipDto {
    pub fn filter_membership(membership: &Membership) -> Self {
        FilterMembershipDto {
            id: membership.id.to_string(),
            membership_id: membership.membership_id.to_string(),
            certificate_number: membership.certificate_number.clone(),
            membership_type: membership.membership_type.to_str().to_string(),
            status: format!("{:?}", membership.status).to_lowercase(),
            registration_paid: membership.registration_paid,
            registration_payment_date: membership.registration_payment_date,
            annual_dues_paid_for_year: membership.annual_dues_paid_for_year,
            subscription_start_date: membership.subscription_start_date,
            subscription_end_date: membership.subscription_end_date,
            last_annual_dues_payment_date: membership.last_annual_dues_payment_date,
            has_active_subscription: membership.has_active_subscription(),
            access_suspended: membership.access_suspended,
            access_suspended_reason: membership.access_suspended_reason.clone(),
            can_download_certificate: membership.can_download_certificate,
            can_download_id_card: membership.can_download_id_card,
            created_at: membership.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MembershipData {
    pub membership: FilterMembershipDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MembershipResponseDto {
    pub status: String,
    pub data: MembershipData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MembershipListResponseDto {
    pub status: String,
    pub memberships: Vec<FilterMembershipDto>,
    pub results: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterPaymentDto {
    pub id: String,
    pub payment_id: String,
    pub reference: String,
    pub amount: i64,
    pub amount_display: String,
    pub currency: String,
    pub payment_method: String,
    pub status: String,
    pub payment_purpose: String,
    pub subscription_year: Option<i32>,
    pub description: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl FilterPaymentDto {
    pub fn filter_payment(payment: &Payment) -> Self {
        FilterPaymentDto {
            id: payment.id.to_string(),
            payment_id: payment.payment_id.to_string(),
            reference: payment.gateway_reference.clone(),
            amount: payment.amount,
            amount_display: format_kobo_as_naira(payment.amount),
            currency: payment.currency.clone(),
            payment_method: format!("{:?}", payment.payment_method).to_lowercase(),
            status: format!("{:?}", payment.status).to_lowercase(),
            payment_purpose: payment.payment_purpose.to_str().to_string(),
            subscription_year: payment.subscription_year,
            description: payment.description.clone(),
            paid_at: payment.paid_at,
            created_at: payment.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitiatePaymentResponseDto {
    pub status: String,
    pub message: String,
    pub checkout_url: String,
    pub reference: String,
    pub payment: FilterPaymentDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponseDto {
    pub status: String,
    pub payment: FilterPaymentDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentListResponseDto {
    pub status: String,
    pub payments: Vec<FilterPaymentDto>,
    pub results: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PricingDto {
    pub payment_purpose: String,
    pub membership_type: String,
    pub amount: i64,
    pub amount_display: String,
    pub is_active: bool,
}

impl PricingDto {
    pub fn from_pricing(pricing: &MembershipPricing) -> Self {
        PricingDto {
            payment_purpose: pricing.payment_purpose.to_str().to_string(),
            membership_type: pricing.membership_type.to_str().to_string(),
            amount: pricing.amount,
            amount_display: format_kobo_as_naira(pricing.amount),
            is_active: pricing.is_active,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PricingListResponseDto {
    pub status: String,
    pub pricing: Vec<PricingDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PricingResponseDto {
    pub status: String,
    pub pricing: PricingDto,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct UpsertPricingDto {
    pub payment_purpose: PaymentPurpose,
    pub membership_type: MembershipType,

    /// Amount in naira, e.g. "25,000.00".
    #[validate(length(min = 1, message = "Amount is required"))]
    pub amount: String,

    pub is_active: Option<bool>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SuspendAccessDto {
    #[validate(length(max = 255, message = "Reason must be at most 255 characters"))]
    pub reason: Option<String>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct MarkDuesPaidDto {
    #[validate(range(min = 2000, max = 2100, message = "Subscription year is out of range"))]
    pub year: i32,
}

/// Admin repair tool: re-run gateway verification for a stuck reference and
/// reconcile the payment when Paystack reports it paid. `force` skips the
/// gateway check for payments confirmed out of band, e.g. bank transfers
/// reconciled by hand.
#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct ManualPaymentFixDto {
    #[validate(length(min = 1, message = "Reference is required"))]
    pub reference: String,

    pub force: Option<bool>,
}
