use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use subtle::ConstantTimeEq;
use tracing::debug;
use uuid::Uuid;

/// Constant-time string comparison to prevent timing attacks
/// Use this for comparing API keys, anti-forgery tokens, and other sensitive values
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Check an `Authorization` header value against the admin API key.
pub fn is_authorized_admin(authorization: Option<&str>, api_key: &str) -> bool {
    authorization
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| constant_time_compare(token.trim(), api_key))
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
struct IssuedNonce {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Issues anti-forgery tokens scoped to a named action.
///
/// Tokens stay valid until they expire, so a page can submit several times
/// with the same token. Issuing a new token for an action keeps older ones
/// until their expiry.
#[derive(Debug)]
pub struct NonceIssuer {
    ttl: Duration,
    issued: Mutex<HashMap<String, Vec<IssuedNonce>>>,
}

impl NonceIssuer {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            issued: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh token for `action`.
    pub fn issue(&self, action: &str) -> String {
        let value = Uuid::new_v4().simple().to_string();
        let now = Utc::now();

        let mut issued = self
            .issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let tokens = issued.entry(action.to_string()).or_default();
        tokens.retain(|t| t.expires_at > now);
        tokens.push(IssuedNonce {
            value: value.clone(),
            expires_at: now + self.ttl,
        });

        debug!("Issued nonce for action {}", action);
        value
    }

    /// Whether `candidate` is an unexpired token issued for `action`.
    pub fn verify(&self, action: &str, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        let now = Utc::now();
        let issued = self
            .issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Compare against every live token so the scan length does not depend
        // on where the match is.
        issued
            .get(action)
            .map(|tokens| {
                tokens
                    .iter()
                    .filter(|t| t.expires_at > now)
                    .fold(false, |found, t| {
                        constant_time_compare(&t.value, candidate) | found
                    })
            })
            .unwrap_or(false)
    }
}
