//! Per-client request quota for the `/api` routes.
//!
//! The quota is `max_requests` per `window_secs`, keyed by the peer IP.
//! A client may spend the whole quota at once; after that one request
//! is replenished every `window / max_requests`.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::config::RateLimitConfig;

pub struct ApiRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    clock: DefaultClock,
    max_requests: u32,
}

impl ApiRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        let burst = NonZeroU32::new(config.max_requests)
            .context("server.rate_limit.max_requests must be > 0")?;
        let period = Duration::from_secs(config.window_secs) / config.max_requests;
        let quota = Quota::with_period(period)
            .context("server.rate_limit window is too short for max_requests")?
            .allow_burst(burst);

        Ok(Self {
            limiter: RateLimiter::keyed(quota),
            clock: DefaultClock::default(),
            max_requests: config.max_requests,
        })
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Spend one request for `client`. On rejection, returns how long the
    /// client should wait, rounded up to at least one second.
    pub fn check(&self, client: IpAddr) -> std::result::Result<(), u64> {
        self.limiter.check_key(&client).map_err(|not_until| {
            not_until
                .wait_time_from(self.clock.now())
                .as_secs()
                .max(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn limiter(max_requests: u32, window_secs: u64) -> ApiRateLimiter {
        ApiRateLimiter::new(&RateLimitConfig {
            enabled: true,
            max_requests,
            window_secs,
        })
        .unwrap()
    }

    #[test]
    fn test_quota_is_per_client() {
        let limiter = limiter(2, 900);
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiter.check(a).is_ok());
        assert!(limiter.check(a).is_ok());
        let retry_after = limiter.check(a).unwrap_err();
        assert!(retry_after >= 1 && retry_after <= 450);

        assert!(limiter.check(b).is_ok());
    }

    #[test]
    fn test_zero_quota_rejected() {
        let err = ApiRateLimiter::new(&RateLimitConfig {
            enabled: true,
            max_requests: 0,
            window_secs: 60,
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("max_requests"));
    }
}
