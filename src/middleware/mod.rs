pub mod access_gate;
pub mod main_middleware;

pub use main_middleware::JWTAuthMiddeware;
