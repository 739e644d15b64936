// models/membershipmodel.rs
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "membership_type", rename_all = "snake_case")]
pub enum MembershipType {
    Individual,
    Organization,
}

impl MembershipType {
    pub fn to_str(&self) -> &str {
        match self {
            MembershipType::Individual => "individual",
            MembershipType::Organization => "organization",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "membership_status", rename_all = "snake_case")]
pub enum MembershipStatus {
    Pending,
    Active,
    Expired,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Successful,
    Failed,
    Cancelled,
    Refunded,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payment_purpose", rename_all = "snake_case")]
pub enum PaymentPurpose {
    Registration,
    AnnualDues,
}

impl PaymentPurpose {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentPurpose::Registration => "registration",
            PaymentPurpose::AnnualDues => "annual_dues",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    Ussd,
    Qr,
    MobileMoney,
}

/// Per-user membership record. Mutated only by admin operations, the
/// reconciliation handler and the expiry sweep.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub membership_id: Uuid,
    pub certificate_number: String,
    pub membership_type: MembershipType,
    pub status: MembershipStatus,

    // Registration state
    pub registration_paid: bool,
    pub registration_payment_date: Option<DateTime<Utc>>,

    // Annual dues state
    pub annual_dues_paid_for_year: Option<i32>,
    pub subscription_start_date: Option<NaiveDate>,
    pub subscription_end_date: Option<NaiveDate>,
    pub last_annual_dues_payment_date: Option<DateTime<Utc>>,

    // Access state
    pub has_platform_access: bool,
    pub access_suspended: bool,
    pub access_suspended_reason: Option<String>,
    pub can_download_certificate: bool,
    pub can_download_id_card: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// Subscription is active for `year` iff dues are paid for that exact
    /// year and access is not suspended.
    pub fn has_active_subscription_for(&self, year: i32) -> bool {
        self.annual_dues_paid_for_year == Some(year) && !self.access_suspended
    }

    pub fn has_active_subscription(&self) -> bool {
        self.has_active_subscription_for(Utc::now().year())
    }
}

/// Certificate numbers are derived from the membership token so they stay
/// stable and unique without a separate sequence.
pub fn derive_certificate_number(membership_id: Uuid, joined: DateTime<Utc>) -> String {
    let token = membership_id.simple().to_string().to_uppercase();
    format!("AGC-{}-{}", joined.year(), &token[..8])
}

/// Calendar bounds of a dues subscription: Jan 1 to Dec 31 of the paid year.
pub fn subscription_bounds(year: i32) -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(year, 1, 1).expect("valid start of year"),
        NaiveDate::from_ymd_opt(year, 12, 31).expect("valid end of year"),
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub membership_id: Uuid,
    pub amount: i64, // in kobo
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub payment_purpose: PaymentPurpose,
    pub subscription_year: Option<i32>,
    pub gateway_reference: String,
    pub gateway_response: Option<serde_json::Value>,
    pub description: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MembershipPricing {
    pub id: Uuid,
    pub payment_purpose: PaymentPurpose,
    pub membership_type: MembershipType,
    pub amount: i64, // in kobo
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fallback prices (kobo) used when no active pricing row exists.
pub fn default_price(purpose: PaymentPurpose, membership_type: MembershipType) -> i64 {
    match (purpose, membership_type) {
        (PaymentPurpose::Registration, MembershipType::Individual) => 5_000_00,
        (PaymentPurpose::Registration, MembershipType::Organization) => 25_000_00,
        (PaymentPurpose::AnnualDues, MembershipType::Individual) => 10_000_00,
        (PaymentPurpose::AnnualDues, MembershipType::Organization) => 50_000_00,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn membership_with_dues(year: Option<i32>, suspended: bool) -> Membership {
        let now = Utc::now();
        Membership {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            membership_id: Uuid::new_v4(),
            certificate_number: "AGC-2025-ABCDEF01".to_string(),
            membership_type: MembershipType::Individual,
            status: MembershipStatus::Active,
            registration_paid: true,
            registration_payment_date: Some(now),
            annual_dues_paid_for_year: year,
            subscription_start_date: year.map(|y| subscription_bounds(y).0),
            subscription_end_date: year.map(|y| subscription_bounds(y).1),
            last_annual_dues_payment_date: year.map(|_| now),
            has_platform_access: true,
            access_suspended: suspended,
            access_suspended_reason: None,
            can_download_certificate: false,
            can_download_id_card: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn subscription_active_only_for_exact_paid_year() {
        let m = membership_with_dues(Some(2025), false);
        assert!(m.has_active_subscription_for(2025));
        assert!(!m.has_active_subscription_for(2024));
        assert!(!m.has_active_subscription_for(2026));
    }

    #[test]
    fn suspension_kills_active_subscription() {
        let m = membership_with_dues(Some(2025), true);
        assert!(!m.has_active_subscription_for(2025));
    }

    #[test]
    fn no_dues_year_means_no_subscription() {
        let m = membership_with_dues(None, false);
        assert!(!m.has_active_subscription_for(2025));
    }

    #[test]
    fn subscription_bounds_cover_full_year() {
        let (start, end) = subscription_bounds(2025);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn certificate_number_embeds_join_year() {
        let joined = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let id = Uuid::new_v4();
        let number = derive_certificate_number(id, joined);
        assert!(number.starts_with("AGC-2024-"));
        assert_eq!(number.len(), "AGC-2024-".len() + 8);
    }
}
