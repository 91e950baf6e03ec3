//! Authorization gate
//!
//! Turns an incoming token artifact into an allow/deny decision. Each step is a
//! hard gate and the first failure decides the outcome:
//!
//! 1. the token is present and has the shape of a compact JWS
//! 2. the signature verifies under the server secret
//! 3. the current time is strictly before `exp`
//! 4. the identity has not been revoked (only when a revocation list is set)
//!
//! The credential store is never consulted.

use crate::{
    auth::{clock::Clock, jwt::JwtService, revocation::RevocationList},
    models::user::Role,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt, sync::Arc};

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Missing,
    Malformed,
    InvalidSignature,
    Expired,
    Revoked,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::Missing => "missing credential",
            DenyReason::Malformed => "malformed token",
            DenyReason::InvalidSignature => "invalid signature",
            DenyReason::Expired => "expired",
            DenyReason::Revoked => "revoked",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity carried by a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub username: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of [`AuthGate::authorize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed(Identity),
    Denied(DenyReason),
}

impl AuthDecision {
    pub fn into_result(self) -> Result<Identity, DenyReason> {
        match self {
            AuthDecision::Allowed(identity) => Ok(identity),
            AuthDecision::Denied(reason) => Err(reason),
        }
    }
}

pub struct AuthGate {
    jwt: Arc<JwtService>,
    clock: Arc<dyn Clock>,
    revocations: Option<Arc<RevocationList>>,
}

impl AuthGate {
    pub fn new(jwt: Arc<JwtService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            jwt,
            clock,
            revocations: None,
        }
    }

    /// Also consult a revocation list on every request
    pub fn with_revocations(mut self, revocations: Arc<RevocationList>) -> Self {
        self.revocations = Some(revocations);
        self
    }

    pub fn revocations(&self) -> Option<&Arc<RevocationList>> {
        self.revocations.as_ref()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn authorize(&self, token: Option<&str>) -> AuthDecision {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return AuthDecision::Denied(DenyReason::Missing),
        };

        if !is_well_formed(token) {
            return AuthDecision::Denied(DenyReason::Malformed);
        }

        let claims = match self.jwt.verify_signature(token) {
            Ok(claims) => claims,
            Err(reason) => return AuthDecision::Denied(reason),
        };

        let now = self.clock.now();
        if now.timestamp() >= claims.exp {
            return AuthDecision::Denied(DenyReason::Expired);
        }

        let identity = Identity {
            username: claims.username.clone(),
            role: claims.role,
            issued_at: claims.issued_at(),
            expires_at: claims.expires_at(),
        };

        if let Some(revocations) = &self.revocations {
            if revocations.is_revoked(&identity.username, identity.issued_at, now) {
                return AuthDecision::Denied(DenyReason::Revoked);
            }
        }

        AuthDecision::Allowed(identity)
    }

    /// Authorize whichever candidate passes first. With no passing candidate
    /// the first one's denial is reported, and no candidates at all is
    /// `Missing`.
    pub fn authorize_any<S: AsRef<str>>(&self, tokens: &[S]) -> AuthDecision {
        let mut first_denial = None;
        for token in tokens {
            match self.authorize(Some(token.as_ref())) {
                AuthDecision::Allowed(identity) => return AuthDecision::Allowed(identity),
                AuthDecision::Denied(reason) => {
                    first_denial.get_or_insert(reason);
                }
            }
        }
        AuthDecision::Denied(first_denial.unwrap_or(DenyReason::Missing))
    }
}

/// A compact token is dot-separated. Anything past that (segment count,
/// alphabet, JSON, signature) is judged by the decoder, so a single altered
/// byte in an issued token always reads as a bad signature.
fn is_well_formed(token: &str) -> bool {
    token.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use chrono::{Duration, TimeZone};
    use secrecy::Secret;

    fn setup() -> (Arc<ManualClock>, Arc<JwtService>, AuthGate) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let jwt = Arc::new(
            JwtService::new(
                &Secret::new("gate_test_secret_32_characters_long!".to_string()),
                1800,
                clock.clone(),
            )
            .unwrap(),
        );
        let gate = AuthGate::new(jwt.clone(), clock.clone());
        (clock, jwt, gate)
    }

    #[test]
    fn test_missing_token() {
        let (_, _, gate) = setup();
        assert_eq!(gate.authorize(None), AuthDecision::Denied(DenyReason::Missing));
        assert_eq!(gate.authorize(Some("  ")), AuthDecision::Denied(DenyReason::Missing));
    }

    #[test]
    fn test_malformed_token() {
        let (_, _, gate) = setup();
        for token in ["abc", "not-a-token", "eyJhbGciOiJIUzI1NiJ9"] {
            assert_eq!(
                gate.authorize(Some(token)),
                AuthDecision::Denied(DenyReason::Malformed),
                "{token}"
            );
        }
    }

    #[test]
    fn test_bad_segments_are_invalid_signature() {
        let (_, _, gate) = setup();
        for token in ["a.b", "a..c", "a.b.c.d", "a.b!.c", "a+b.c/d.e="] {
            assert_eq!(
                gate.authorize(Some(token)),
                AuthDecision::Denied(DenyReason::InvalidSignature),
                "{token}"
            );
        }
    }

    #[test]
    fn test_valid_token_allowed() {
        let (_, jwt, gate) = setup();
        let issued = jwt.issue("alice", Role::User).unwrap();

        match gate.authorize(Some(&issued.token)) {
            AuthDecision::Allowed(identity) => {
                assert_eq!(identity.username, "alice");
                assert_eq!(identity.role, Role::User);
                assert_eq!(identity.expires_at - identity.issued_at, Duration::minutes(30));
            }
            other => panic!("expected Allowed, got {other:?}"),
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let (clock, jwt, gate) = setup();
        let issued = jwt.issue("alice", Role::User).unwrap();

        clock.advance(Duration::minutes(30) - Duration::seconds(1));
        assert!(matches!(gate.authorize(Some(&issued.token)), AuthDecision::Allowed(_)));

        clock.advance(Duration::seconds(1));
        assert_eq!(
            gate.authorize(Some(&issued.token)),
            AuthDecision::Denied(DenyReason::Expired)
        );

        clock.advance(Duration::hours(5));
        assert_eq!(
            gate.authorize(Some(&issued.token)),
            AuthDecision::Denied(DenyReason::Expired)
        );
    }

    #[test]
    fn test_any_single_byte_tamper_is_invalid_signature() {
        let (_, jwt, gate) = setup();
        let token = jwt.issue("alice", Role::User).unwrap().token;

        // base64url letters plus bytes outside the alphabet and the separator
        let replacements = [b'A', b'B', b'+', b'/', b'=', b'.', b'!', b'%'];
        for (i, original) in token.bytes().enumerate() {
            for replacement in replacements {
                if replacement == original {
                    continue;
                }
                let mut tampered = token.clone().into_bytes();
                tampered[i] = replacement;
                let tampered = String::from_utf8(tampered).unwrap();

                assert_eq!(
                    gate.authorize(Some(&tampered)),
                    AuthDecision::Denied(DenyReason::InvalidSignature),
                    "byte {i} set to {:?}",
                    replacement as char
                );
            }
        }
    }

    #[test]
    fn test_signature_checked_before_expiry() {
        let (clock, jwt, gate) = setup();
        let token = jwt.issue("alice", Role::User).unwrap().token;
        clock.advance(Duration::hours(1));

        let mut tampered = token.into_bytes();
        let last = tampered.len() - 2;
        tampered[last] = if tampered[last] == b'x' { b'y' } else { b'x' };
        let tampered = String::from_utf8(tampered).unwrap();

        assert_eq!(
            gate.authorize(Some(&tampered)),
            AuthDecision::Denied(DenyReason::InvalidSignature)
        );
    }

    #[test]
    fn test_revoked_identity_denied() {
        let (clock, jwt, gate) = setup();
        let revocations = Arc::new(RevocationList::new(jwt.token_ttl()));
        let gate = gate.with_revocations(revocations.clone());

        let old = jwt.issue("alice", Role::User).unwrap().token;
        clock.advance(Duration::seconds(10));
        revocations.revoke("alice", clock.now());

        assert_eq!(gate.authorize(Some(&old)), AuthDecision::Denied(DenyReason::Revoked));

        clock.advance(Duration::seconds(1));
        let fresh = jwt.issue("alice", Role::User).unwrap().token;
        assert!(matches!(gate.authorize(Some(&fresh)), AuthDecision::Allowed(_)));
    }

    #[test]
    fn test_same_second_relogin_allowed() {
        let (clock, jwt, gate) = setup();
        let revocations = Arc::new(RevocationList::new(jwt.token_ttl()));
        let gate = gate.with_revocations(revocations.clone());

        let old = jwt.issue("alice", Role::User).unwrap().token;
        clock.advance(Duration::milliseconds(100));
        revocations.revoke("alice", clock.now());

        clock.advance(Duration::milliseconds(250));
        let fresh = jwt.issue("alice", Role::User).unwrap().token;

        assert_eq!(gate.authorize(Some(&old)), AuthDecision::Denied(DenyReason::Revoked));
        assert!(matches!(gate.authorize(Some(&fresh)), AuthDecision::Allowed(_)));
    }

    #[test]
    fn test_authorize_any_falls_back_to_later_candidate() {
        let (clock, jwt, gate) = setup();
        let stale = jwt.issue("alice", Role::User).unwrap().token;
        clock.advance(Duration::minutes(31));
        let fresh = jwt.issue("alice", Role::User).unwrap().token;

        match gate.authorize_any(&[stale.clone(), fresh]) {
            AuthDecision::Allowed(identity) => assert_eq!(identity.username, "alice"),
            other => panic!("expected allowed, got {other:?}"),
        }

        assert_eq!(
            gate.authorize_any(&[stale, "garbage".to_string()]),
            AuthDecision::Denied(DenyReason::Expired)
        );
        assert_eq!(
            gate.authorize_any::<String>(&[]),
            AuthDecision::Denied(DenyReason::Missing)
        );
    }

    #[test]
    fn test_deny_reason_text() {
        assert_eq!(DenyReason::Missing.to_string(), "missing credential");
        assert_eq!(DenyReason::InvalidSignature.to_string(), "invalid signature");
        assert_eq!(DenyReason::Expired.to_string(), "expired");
    }
}
