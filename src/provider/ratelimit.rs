//! Per-policy leaky-bucket rate limiter for the OneDrive driver's Graph API
//! calls. Installed as a transport-level wrapper so every call a driver
//! makes for a given policy shares one bucket; non-positive settings
//! disable the limiter entirely.

use governor::{Quota, RateLimiter};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};

type Limiter = RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

#[derive(Default)]
pub struct OnedriveRateLimiters {
	buckets: Mutex<HashMap<i64, Option<Arc<Limiter>>>>,
}

impl OnedriveRateLimiters {
	pub fn new() -> Self {
		Self { buckets: Mutex::new(HashMap::new()) }
	}

	fn build(requests_per_second: u32, burst_size: u32) -> Arc<Limiter> {
		let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::new(1).unwrap());
		let burst = NonZeroU32::new(burst_size).unwrap_or(rps);
		Arc::new(RateLimiter::direct(Quota::per_second(rps).allow_burst(burst)))
	}

	/// Waits until the policy's bucket admits one more call. A policy with
	/// no configured rate (or `requests_per_second == 0`) never waits.
	pub async fn acquire(&self, policy_id: i64, requests_per_second: u32, burst_size: u32) {
		let limiter = {
			let mut buckets = self.buckets.lock().unwrap();
			buckets
				.entry(policy_id)
				.or_insert_with(|| {
					if requests_per_second == 0 {
						None
					} else {
						Some(Self::build(requests_per_second, burst_size))
					}
				})
				.clone()
		};
		if let Some(limiter) = limiter {
			limiter.until_ready().await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Instant;

	#[tokio::test]
	async fn disabled_limiter_never_waits() {
		let limiters = OnedriveRateLimiters::new();
		let start = Instant::now();
		for _ in 0..5 {
			limiters.acquire(1, 0, 0).await;
		}
		assert!(start.elapsed().as_millis() < 50);
	}

	#[tokio::test]
	async fn bucket_throttles_past_burst() {
		let limiters = OnedriveRateLimiters::new();
		let start = Instant::now();
		for _ in 0..4 {
			limiters.acquire(1, 2, 2).await;
		}
		assert!(start.elapsed().as_millis() >= 400);
	}
}
