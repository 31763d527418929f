//! JWT authentication
//!
//! Tokens are issued at registration and carry the user id in `sub`.
//! Protected routes run behind [`middleware::jwt_auth_middleware`], which
//! injects an [`AuthenticatedUser`] extension trusted by the handlers.

pub mod handlers;
pub mod middleware;
pub mod service;

pub use service::{AuthenticatedUser, Claims, JwtManager};
