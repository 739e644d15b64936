pub mod db;
pub mod membershipdb;
pub mod paymentdb;
pub mod userdb;
