//! Retry timing for throttled requests
//!
//! Google APIs answer quota exhaustion with HTTP 429, sometimes with a
//! `Retry-After` header. When the header is missing the client backs off
//! exponentially.

use std::time::Duration;

use tracing::warn;

/// Upper bound for a single wait, whatever the server asks for
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// First backoff step when no `Retry-After` header is present
const BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Largest exponential backoff step
const MAX_BACKOFF: Duration = Duration::from_secs(64);

/// Parses a `Retry-After` header value.
///
/// Accepts either integer seconds or an HTTP-date (RFC 2822). Values that
/// cannot be parsed, dates in the past and waits longer than
/// [`MAX_RETRY_AFTER`] fall back to `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds).min(MAX_RETRY_AFTER);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            if let Some(secs) = (target - now)
                .num_seconds()
                .try_into()
                .ok()
                .filter(|&s: &u64| s <= MAX_RETRY_AFTER.as_secs())
            {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

/// Exponential backoff for the given zero-based attempt: 1s, 2s, 4s, ...
/// capped at 64s.
pub fn backoff(attempt: u32) -> Duration {
    BASE_BACKOFF
        .checked_mul(2u32.saturating_pow(attempt))
        .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
}
