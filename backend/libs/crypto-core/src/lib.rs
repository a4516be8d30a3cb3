//! Stateless security primitives shared by Ridehail services.
//!
//! - `jwt`: HS256 access/refresh token issuance and verification with injected keys
//! - `hash`: SHA-256 digests for secrets that must never be stored in clear form
//! - `clock`: time source used by every expiry decision

pub mod clock;
pub mod hash;
pub mod jwt;

pub use clock::{Clock, ManualClock, SystemClock};
pub use jwt::{AccessClaims, RefreshClaims, TokenConfig, TokenError, TokenIssuer, TokenPair};
