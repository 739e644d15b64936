pub mod membershipmodel;
pub mod usermodel;
