pub mod admin;
pub mod auth;
pub mod membership;
pub mod payments;
pub mod users;
