//! Per-client quota on recorded clicks.
//!
//! The redirect route never rejects a visitor. Clicks beyond the quota are
//! still redirected but are not queued for recording, which keeps a single
//! client from flooding the click store.

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::IpAddr;
use std::num::NonZeroU32;

/// Sustained clicks recorded per client IP.
const CLICKS_PER_SECOND: NonZeroU32 = NonZeroU32::new(20).expect("non-zero");

/// Bursts absorb a whole group scanning the same QR code from one NAT.
const CLICK_BURST: NonZeroU32 = NonZeroU32::new(200).expect("non-zero");

/// Keyed token bucket over client IPs.
///
/// # Limits
///
/// - **Rate**: 20 clicks per second
/// - **Burst**: 200 clicks
///
/// Idle keys are dropped by [`ClickRateLimiter::retain_recent`], which the
/// server calls periodically.
pub struct ClickRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
}

impl ClickRateLimiter {
    pub fn new(quota: Quota) -> Self {
        Self {
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// Takes one token for `ip`. Returns `false` when its bucket is empty.
    pub fn allows(&self, ip: IpAddr) -> bool {
        self.limiter.check_key(&ip).is_ok()
    }

    /// Forgets clients whose buckets have refilled completely.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }
}

impl Default for ClickRateLimiter {
    fn default() -> Self {
        Self::new(Quota::per_second(CLICKS_PER_SECOND).allow_burst(CLICK_BURST))
    }
}
