//! Per-session usage quota seam.
//!
//! The turn runner checks the gate before contacting the provider and
//! increments it once the provider stream is open.

use dashmap::DashMap;
use tracing::debug;

/// Result of a quota check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed,
    Exceeded { message: String },
    /// The gate could not decide (backing store unavailable, race). Treated
    /// as allowed.
    Unknown { reason: String },
}

/// Checked/incremented usage counter, keyed by session.
pub trait QuotaGate: Send + Sync {
    fn check(&self, session_id: uuid::Uuid) -> QuotaDecision;
    fn increment(&self, session_id: uuid::Uuid);
}

/// Gate that never limits.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unlimited;

impl QuotaGate for Unlimited {
    fn check(&self, _session_id: uuid::Uuid) -> QuotaDecision {
        QuotaDecision::Allowed
    }

    fn increment(&self, _session_id: uuid::Uuid) {}
}

/// Fixed per-session turn limit held in process memory.
#[derive(Debug)]
pub struct InMemoryQuota {
    limit: u32,
    used: DashMap<uuid::Uuid, u32>,
}

impl InMemoryQuota {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            used: DashMap::new(),
        }
    }

    pub fn used(&self, session_id: uuid::Uuid) -> u32 {
        self.used.get(&session_id).map(|count| *count).unwrap_or(0)
    }

    /// Forgets every recorded count.
    pub fn reset(&self) {
        self.used.clear();
    }
}

impl QuotaGate for InMemoryQuota {
    fn check(&self, session_id: uuid::Uuid) -> QuotaDecision {
        let used = self.used(session_id);
        if used >= self.limit {
            return QuotaDecision::Exceeded {
                message: format!("session used {used} of {} turns", self.limit),
            };
        }
        QuotaDecision::Allowed
    }

    fn increment(&self, session_id: uuid::Uuid) {
        let mut count = self.used.entry(session_id).or_insert(0);
        *count = count.saturating_add(1);
        debug!(session_id = %session_id, used = *count, limit = self.limit, "quota incremented");
    }
}
