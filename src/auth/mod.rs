//! Authentication and authorization module

pub mod clock;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod revocation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gate::{AuthDecision, AuthGate, DenyReason, Identity};
pub use jwt::{Claims, IssuedToken, JwtService};
pub use middleware::{extract_tokens, jwt_auth_middleware, AuthContext, TOKEN_COOKIE};
pub use password::{meets_password_policy, PasswordHasher};
pub use revocation::RevocationList;
