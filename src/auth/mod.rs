//! Authentication and authorization module

pub mod guard;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use guard::{require_role, Role};
pub use jwt::{AccessToken, Claims, JwtService};
pub use middleware::{extract_token, jwt_auth_middleware, Actor};
pub use password::{PasswordHasher, PasswordPolicy};
