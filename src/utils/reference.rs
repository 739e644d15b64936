// utils/reference.rs
use uuid::Uuid;

use crate::models::membershipmodel::{MembershipType, PaymentPurpose};

pub const REFERENCE_PREFIX: &str = "AGC-";

/// Generate an opaque, collision-resistant payment reference that still
/// reads back the purpose and membership type for human traceability,
/// e.g. "AGC-ANNUAL_DUES-INDIVIDUAL-9F2C41AB".
pub fn generate_payment_reference(purpose: PaymentPurpose, membership_type: MembershipType) -> String {
    let token = Uuid::new_v4().simple().to_string().to_uppercase();
    format!(
        "{}{}-{}-{}",
        REFERENCE_PREFIX,
        purpose.to_str().to_uppercase(),
        membership_type.to_str().to_uppercase(),
        &token[..8]
    )
}

/// Cheap shape check applied before hitting the database on the public
/// verification endpoint, to keep random reference guessing out.
pub fn looks_like_payment_reference(reference: &str) -> bool {
    reference.starts_with(REFERENCE_PREFIX) && reference.len() >= 16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_embeds_purpose_and_type() {
        let reference =
            generate_payment_reference(PaymentPurpose::AnnualDues, MembershipType::Individual);
        assert!(reference.starts_with("AGC-ANNUAL_DUES-INDIVIDUAL-"));
        assert!(looks_like_payment_reference(&reference));
    }

    #[test]
    fn references_are_unique() {
        let a = generate_payment_reference(PaymentPurpose::Registration, MembershipType::Individual);
        let b = generate_payment_reference(PaymentPurpose::Registration, MembershipType::Individual);
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_foreign_references() {
        assert!(!looks_like_payment_reference("VRN_ABCDEF0123456789"));
        assert!(!looks_like_payment_reference("AGC-short"));
    }
}
