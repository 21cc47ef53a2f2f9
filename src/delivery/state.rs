//! Delivery state tracking.
//!
//! # Status Transitions
//! ```text
//! Pending → Simulated → Sent → Confirmed
//!    └──────────┴────────┴───→ Failed | Expired
//! ```
//! Confirmed, Failed and Expired are terminal.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::unix_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Simulated,
    Sent,
    Confirmed,
    Failed,
    Expired,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Confirmed | DeliveryStatus::Failed | DeliveryStatus::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Simulated => "simulated",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Confirmed => "confirmed",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Expired => "expired",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            DeliveryStatus::Pending => 0,
            DeliveryStatus::Simulated => 1,
            DeliveryStatus::Sent => 2,
            DeliveryStatus::Confirmed | DeliveryStatus::Failed | DeliveryStatus::Expired => 3,
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            DeliveryStatus::Failed | DeliveryStatus::Expired => true,
            _ => next.rank() >= self.rank(),
        }
    }
}

/// Lifecycle record for one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryState {
    pub id: String,
    pub status: DeliveryStatus,
    pub attempts: u32,
    /// ms since epoch.
    pub start_time: u64,
    pub last_attempt_time: Option<u64>,
    pub confirmed_at: Option<u64>,
    pub signature: Option<String>,
    pub error: Option<String>,
}

impl DeliveryState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: DeliveryStatus::Pending,
            attempts: 0,
            start_time: unix_millis(),
            last_attempt_time: None,
            confirmed_at: None,
            signature: None,
            error: None,
        }
    }
}

/// Keyed store of delivery states, shared by clones.
///
/// Each record has a single writer: the engine call that created it.
#[derive(Debug, Clone, Default)]
pub struct DeliveryStore {
    inner: Arc<DashMap<String, DeliveryState>>,
}

impl DeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, state: DeliveryState) {
        self.inner.insert(state.id.clone(), state);
    }

    pub fn get(&self, id: &str) -> Option<DeliveryState> {
        self.inner.get(id).map(|r| r.value().clone())
    }

    /// Apply `f` to the record for `id`. Returns false if there is none.
    pub fn update<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut DeliveryState),
    {
        match self.inner.get_mut(id) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    /// Move `id` to `next`, ignoring transitions the state machine forbids.
    pub fn transition(&self, id: &str, next: DeliveryStatus) -> bool {
        let mut applied = false;
        self.update(id, |state| {
            if state.status.can_transition_to(next) {
                state.status = next;
                applied = true;
            } else {
                tracing::warn!(
                    delivery_id = %state.id,
                    from = ?state.status,
                    to = ?next,
                    "Ignoring invalid delivery state transition"
                );
            }
        });
        applied
    }

    pub fn all(&self) -> Vec<DeliveryState> {
        self.inner.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop records with `now - start_time > max_age`. Returns how many were removed.
    pub fn clear_old_states(&self, max_age: Duration) -> usize {
        self.clear_older_than(unix_millis(), max_age)
    }

    fn clear_older_than(&self, now_ms: u64, max_age: Duration) -> usize {
        let max_age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        let before = self.inner.len();
        self.inner
            .retain(|_, state| now_ms.saturating_sub(state.start_time) <= max_age_ms);
        let removed = before.saturating_sub(self.inner.len());
        if removed > 0 {
            tracing::debug!(removed, "Evicted old delivery states");
        }
        removed
    }
}
