//! Authentication and authorization

pub mod identity;
pub mod jwt;
pub mod password;

pub use identity::{perms, Identity, ADMIN_ROLE};
pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
pub use password::{hash_password, verify_password};
