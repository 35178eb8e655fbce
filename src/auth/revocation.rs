//! Refresh token denylist
//! Mission: Make rotated and logged-out refresh tokens single-use
//!
//! Entries live only until the token they name would have expired anyway,
//! so the set is bounded by the number of refresh tokens in flight.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const DEFAULT_CAPACITY: usize = 100_000;

pub struct RevocationList {
    entries: Mutex<HashMap<String, i64>>, // jti -> token exp (unix seconds)
    capacity: usize,
}

impl Default for RevocationList {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RevocationList {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Denylist `jti` until `expires_at`. Returns false if it was already
    /// denylisted, which is how a replayed refresh token is detected.
    pub fn revoke(&self, jti: &str, expires_at: i64, now: i64) -> bool {
        if expires_at <= now {
            // already dead, validation rejects it as Expired
            return true;
        }

        let mut entries = self.entries.lock();
        if let Some(&exp) = entries.get(jti) {
            if exp > now {
                return false;
            }
        }

        if entries.len() >= self.capacity {
            entries.retain(|_, exp| *exp > now);
        }
        if entries.len() >= self.capacity {
            // drop whichever entry would have expired first
            if let Some(victim) = entries
                .iter()
                .min_by_key(|(_, exp)| **exp)
                .map(|(k, _)| k.clone())
            {
                warn!(jti = %victim, "Revocation list full, evicting soonest-expiring entry");
                entries.remove(&victim);
            }
        }

        entries.insert(jti.to_string(), expires_at);
        true
    }

    pub fn is_revoked(&self, jti: &str, now: i64) -> bool {
        self.entries
            .lock()
            .get(jti)
            .map(|exp| *exp > now)
            .unwrap_or(false)
    }

    /// Drop entries whose token has expired. Returns how many were removed.
    pub fn purge_expired(&self, now: i64) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, exp| *exp > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Purged expired revocations");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
