//! Request authorization gates
//!
//! Every protected request runs the same fixed sequence:
//!
//! 1. [`Verifier`] pulls a token from the request and checks it against the
//!    access secret, producing a [`VerifiedRequest`];
//! 2. [`Authenticator`] turns a request carrying valid claims into an
//!    [`Authenticated`] value and denies everything else with `Unauthorized`;
//! 3. each configured [`Gate`] inspects the `Authenticated` value in order.
//!
//! [`GatePipeline::admit`] stops at the first denial, so later gates and the
//! handler never see a request an earlier stage refused.

use super::jwt::{SessionClaims, TokenCodec, TokenError};
use crate::error::ApiError;
use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cookie consulted when no bearer header is present
pub const TOKEN_COOKIE: &str = "jwt";

/// Outcome of the verifier stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifiedRequest {
    /// No token was presented
    Missing,
    /// A token was presented but did not verify
    Invalid(TokenError),
    /// A token was presented and verified
    Valid(SessionClaims),
}

/// A request that passed authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub claims: SessionClaims,
}

impl Authenticated {
    pub fn user_id(&self) -> i64 {
        self.claims.user_id
    }

    pub fn role(&self) -> &str {
        &self.claims.role
    }
}

/// Why a gate refused a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthorized,
    /// Used for role checks so non-members cannot discover which routes exist
    NotFound,
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthorized => ApiError::Unauthorized("Unauthorized".to_string()),
            Denial::NotFound => ApiError::NotFound("Not found".to_string()),
        }
    }
}

/// Decision returned by a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Deny(Denial),
}

/// A check applied to authenticated requests
pub trait Gate: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, request: &Authenticated) -> GateDecision;
}

/// Extracts the raw token from a request
///
/// `Authorization: Bearer <token>` wins (scheme matched case-insensitively);
/// otherwise the `jwt` cookie is used.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn cookie_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Verifies the presented token under one codec
#[derive(Clone)]
pub struct Verifier {
    codec: TokenCodec,
}

impl Verifier {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    #[inline]
    pub fn verify(&self, headers: &HeaderMap) -> VerifiedRequest {
        self.verify_at(headers, Utc::now())
    }

    pub fn verify_at(&self, headers: &HeaderMap, now: DateTime<Utc>) -> VerifiedRequest {
        match extract_token(headers) {
            None => VerifiedRequest::Missing,
            Some(token) => match self.codec.parse_at(token, now) {
                Ok(claims) => VerifiedRequest::Valid(claims),
                Err(e) => VerifiedRequest::Invalid(e),
            },
        }
    }
}

/// Requires a verified token
pub struct Authenticator;

impl Authenticator {
    pub fn authenticate(verified: VerifiedRequest) -> Result<Authenticated, Denial> {
        match verified {
            VerifiedRequest::Valid(claims) => Ok(Authenticated { claims }),
            VerifiedRequest::Missing => {
                debug!("Request carried no token");
                Err(Denial::Unauthorized)
            }
            VerifiedRequest::Invalid(e) => {
                warn!(error = %e, "Request token failed verification");
                Err(Denial::Unauthorized)
            }
        }
    }
}

/// Admits only tokens whose role claim is exactly `admin`
pub struct AdminOnly;

impl Gate for AdminOnly {
    fn name(&self) -> &'static str {
        "admin_only"
    }

    fn check(&self, request: &Authenticated) -> GateDecision {
        if request.role() == "admin" {
            GateDecision::Allow
        } else {
            GateDecision::Deny(Denial::NotFound)
        }
    }
}

/// Verifier, authenticator and an ordered list of gates
#[derive(Clone)]
pub struct GatePipeline {
    verifier: Verifier,
    gates: Arc<Vec<Arc<dyn Gate>>>,
}

impl GatePipeline {
    /// A pipeline that only requires authentication
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            verifier: Verifier::new(codec),
            gates: Arc::new(Vec::new()),
        }
    }

    /// Append a gate; gates run in the order they were added
    pub fn with_gate(mut self, gate: impl Gate + 'static) -> Self {
        let mut gates: Vec<Arc<dyn Gate>> = self.gates.iter().cloned().collect();
        gates.push(Arc::new(gate));
        self.gates = Arc::new(gates);
        self
    }

    pub fn gate_names(&self) -> Vec<&'static str> {
        self.gates.iter().map(|gate| gate.name()).collect()
    }

    #[inline]
    pub fn admit(&self, headers: &HeaderMap) -> Result<Authenticated, Denial> {
        self.admit_at(headers, Utc::now())
    }

    pub fn admit_at(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<Authenticated, Denial> {
        let verified = self.verifier.verify_at(headers, now);
        let authenticated = Authenticator::authenticate(verified)?;

        for gate in self.gates.iter() {
            if let GateDecision::Deny(denial) = gate.check(&authenticated) {
                warn!(
                    gate = gate.name(),
                    user_id = authenticated.user_id(),
                    role = authenticated.role(),
                    "Gate denied request"
                );
                return Err(denial);
            }
        }

        Ok(authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenKind;
    use axum::http::HeaderValue;
    use chrono::Duration;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn codec() -> TokenCodec {
        TokenCodec::new(TokenKind::Access, "gate-access-secret")
    }

    fn headers_with(name: axum::http::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn bearer(token: &str) -> HeaderMap {
        headers_with(AUTHORIZATION, &format!("Bearer {}", token))
    }

    fn admin_pipeline() -> GatePipeline {
        GatePipeline::new(codec()).with_gate(AdminOnly)
    }

    struct CountingGate(Arc<AtomicUsize>);

    impl Gate for CountingGate {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn check(&self, _request: &Authenticated) -> GateDecision {
            self.0.fetch_add(1, Ordering::SeqCst);
            GateDecision::Allow
        }
    }

    #[rstest]
    #[case("Bearer abc.def.ghi", Some("abc.def.ghi"))]
    #[case("bearer abc.def.ghi", Some("abc.def.ghi"))]
    #[case("BEARER abc.def.ghi", Some("abc.def.ghi"))]
    #[case("Basic dXNlcjpwYXNz", None)]
    #[case("Bearer ", None)]
    #[case("abc.def.ghi", None)]
    fn test_bearer_extraction(#[case] header: &str, #[case] expected: Option<&str>) {
        let headers = headers_with(AUTHORIZATION, header);
        assert_eq!(extract_token(&headers), expected);
    }

    #[test]
    fn test_cookie_fallback() {
        let headers = headers_with(COOKIE, "theme=dark; jwt=cookie.token.value; lang=en");
        assert_eq!(extract_token(&headers), Some("cookie.token.value"));
    }

    #[test]
    fn test_header_preferred_over_cookie() {
        let mut headers = bearer("header.token.value");
        headers.insert(COOKIE, HeaderValue::from_static("jwt=cookie.token.value"));
        assert_eq!(extract_token(&headers), Some("header.token.value"));
    }

    #[test]
    fn test_verifier_outcomes() {
        let verifier = Verifier::new(codec());
        let token = codec().sign(3, "user", Duration::minutes(5)).unwrap();

        assert_eq!(verifier.verify(&HeaderMap::new()), VerifiedRequest::Missing);
        assert!(matches!(
            verifier.verify(&bearer("garbage")),
            VerifiedRequest::Invalid(TokenError::Malformed(_))
        ));
        assert!(matches!(
            verifier.verify(&bearer(&token)),
            VerifiedRequest::Valid(claims) if claims.user_id == 3
        ));
    }

    #[test]
    fn test_authenticated_request_passes_plain_pipeline() {
        let token = codec().sign(8, "creator", Duration::minutes(5)).unwrap();
        let admitted = GatePipeline::new(codec()).admit(&bearer(&token)).unwrap();

        assert_eq!(admitted.user_id(), 8);
        assert_eq!(admitted.role(), "creator");
    }

    #[test]
    fn test_admin_admitted() {
        let token = codec().sign(1, "admin", Duration::minutes(5)).unwrap();
        assert!(admin_pipeline().admit(&bearer(&token)).is_ok());
    }

    #[rstest]
    #[case("user")]
    #[case("creator")]
    #[case("combined")]
    #[case("Admin")]
    #[case("")]
    fn test_non_admin_gets_not_found(#[case] role: &str) {
        let token = codec().sign(2, role, Duration::minutes(5)).unwrap();
        assert_eq!(admin_pipeline().admit(&bearer(&token)), Err(Denial::NotFound));
    }

    #[test]
    fn test_unverified_request_is_unauthorized_before_role_check() {
        let foreign = TokenCodec::new(TokenKind::Access, "someone-elses-secret")
            .sign(1, "admin", Duration::minutes(5))
            .unwrap();

        assert_eq!(admin_pipeline().admit(&HeaderMap::new()), Err(Denial::Unauthorized));
        assert_eq!(admin_pipeline().admit(&bearer(&foreign)), Err(Denial::Unauthorized));
    }

    #[test]
    fn test_expired_admin_token_is_unauthorized() {
        let now = Utc::now();
        let token = codec()
            .sign_at(1, "admin", Duration::minutes(15), now - Duration::minutes(20))
            .unwrap();

        assert_eq!(
            admin_pipeline().admit_at(&bearer(&token), now),
            Err(Denial::Unauthorized)
        );
    }

    #[test]
    fn test_denial_stops_later_gates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = GatePipeline::new(codec())
            .with_gate(AdminOnly)
            .with_gate(CountingGate(calls.clone()));
        assert_eq!(pipeline.gate_names(), vec!["admin_only", "counting"]);

        let user = codec().sign(4, "user", Duration::minutes(5)).unwrap();
        assert_eq!(pipeline.admit(&bearer(&user)), Err(Denial::NotFound));
        assert_eq!(pipeline.admit(&HeaderMap::new()), Err(Denial::Unauthorized));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let admin = codec().sign(5, "admin", Duration::minutes(5)).unwrap();
        assert!(pipeline.admit(&bearer(&admin)).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_denials_translate_to_api_errors() {
        assert_eq!(
            ApiError::from(Denial::Unauthorized).status(),
            axum::http::StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(Denial::NotFound).status(),
            axum::http::StatusCode::NOT_FOUND
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_arbitrary_tokens_are_unauthorized(token in "[A-Za-z0-9_.-]{1,80}") {
            prop_assert_eq!(
                admin_pipeline().admit(&bearer(&token)),
                Err(Denial::Unauthorized)
            );
        }
    }
}
