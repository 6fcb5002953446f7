//! Authentication Module
//! Mission: Secure API access with hashed credentials, JWT sessions and role-based policy

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod policy;
pub mod session;

pub use jwt::JwtHandler;
pub use middleware::auth_middleware;
pub use password::PasswordHasher;
pub use session::SessionConfig;
