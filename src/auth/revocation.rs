//! Optional denylist for immediate revocation
//!
//! Tokens are stateless, so a logout or account change normally takes effect
//! only when the token expires. When enabled, a revocation marks every token
//! issued to that username at or before the revocation instant as dead. An
//! entry only needs to live as long as the longest token it can kill.

use chrono::{DateTime, Duration, TimeZone, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone, Copy)]
struct Revocation {
    revoked_at: DateTime<Utc>,
    forget_after: DateTime<Utc>,
}

/// Per-username revocation entries with a TTL
#[derive(Debug)]
pub struct RevocationList {
    entries: DashMap<String, Revocation>,
    ttl: Duration,
}

impl RevocationList {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Revoke every token issued to `username` up to `now`.
    ///
    /// Stored at millisecond precision, the same precision tokens carry, so
    /// a token minted later in the same second is not caught.
    pub fn revoke(&self, username: &str, now: DateTime<Utc>) {
        let revoked_at = Utc
            .timestamp_millis_opt(now.timestamp_millis())
            .single()
            .unwrap_or(now);
        self.entries.insert(
            username.to_string(),
            Revocation {
                revoked_at,
                forget_after: now + self.ttl,
            },
        );
        tracing::info!(username = %username, "Identity revoked");
    }

    /// Whether a token for `username` issued at `issued_at` has been revoked
    pub fn is_revoked(&self, username: &str, issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.entries.get(username) {
            Some(entry) if now < entry.forget_after => issued_at <= entry.revoked_at,
            _ => false,
        }
    }

    /// Drop entries whose TTL has passed; returns how many were removed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.forget_after);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
