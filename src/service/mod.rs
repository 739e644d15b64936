pub mod error;
pub mod paystack;
pub mod reconciliation;
pub mod subscriptions;
