pub mod handlers;
pub mod models;
pub mod router;

pub use models::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};
pub use router::auth_routes;
