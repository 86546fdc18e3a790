//! `gasdesk-auth`: session tokens, roles and access policy.
//!
//! Tokens are issued elsewhere; this crate only validates them and answers
//! "may this session do that". Decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod roles;

pub use authorize::{authorize_subscription, can_access_agency, require_role, AuthzError};
pub use claims::{validate_claims, SessionClaims, TokenValidationError};
pub use jwt::{Hs256JwtValidator, JwtValidator, TokenError};
pub use roles::{Role, UnknownRole};
