//! Authentication module
//!
//! Session tokens, credential hashing, refresh rotation and request gates.

mod gate;
mod jwt;
mod middleware;
mod password;
mod rotation;
mod session;

pub use gate::{
    extract_token, AdminOnly, Authenticated, Authenticator, Denial, Gate, GateDecision,
    GatePipeline, VerifiedRequest, Verifier,
};
pub use jwt::{SessionClaims, TokenCodec, TokenError, TokenKind};
pub use middleware::{enforce_gates, AuthUser};
pub use password::{HashError, PasswordService};
pub use rotation::{RefreshRotator, RotationError, RotationStage};
pub use session::{SessionIssuer, TokenPair};
