//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Calculate the backoff delay before retry `attempt` (1-based).
///
/// `min(base * 2^(attempt-1) + jitter, max)`, with jitter drawn from
/// `[0, 10%)` of the exponential term. The result never exceeds `max_ms`
/// and is non-decreasing in `attempt` for any jitter draw.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);

    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 && delay_ms < max_ms {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms.saturating_add(jitter).min(max_ms))
}
