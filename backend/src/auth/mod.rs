pub mod jwt_service;
pub mod middleware;

pub use jwt_service::{JwtConfig, JwtService};
pub use middleware::{AuthMiddleware, AuthUser};
