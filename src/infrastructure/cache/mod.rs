//! A small cache abstraction with a process-local fallback.
//!
//! Production deployments back this with an external cache; if that
//! connection is unavailable at startup the process falls back to the
//! in-memory implementation here rather than failing to boot.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[async_trait]
pub trait Cache: Send + Sync {
	async fn get(&self, key: &str) -> Option<String>;
	async fn set(&self, key: &str, value: String, ttl: Duration);
	async fn delete(&self, key: &str);
}

struct Entry {
	value: String,
	expires_at: Instant,
}

/// In-memory cache with per-key TTL. Entries past their TTL are treated as
/// absent by `get` and swept lazily, never by a background task.
#[derive(Default)]
pub struct MemoryCache {
	entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
	pub fn new() -> Self {
		Self { entries: RwLock::new(HashMap::new()) }
	}
}

#[async_trait]
impl Cache for MemoryCache {
	async fn get(&self, key: &str) -> Option<String> {
		let entries = self.entries.read().unwrap();
		match entries.get(key) {
			Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
			_ => None,
		}
	}

	async fn set(&self, key: &str, value: String, ttl: Duration) {
		let mut entries = self.entries.write().unwrap();
		entries.insert(key.to_string(), Entry { value, expires_at: Instant::now() + ttl });
	}

	async fn delete(&self, key: &str) {
		let mut entries = self.entries.write().unwrap();
		entries.remove(key);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn round_trips_before_ttl_and_misses_after() {
		let cache = MemoryCache::new();
		cache.set("k", "v".into(), Duration::from_millis(50)).await;
		assert_eq!(cache.get("k").await, Some("v".into()));
		tokio::time::sleep(Duration::from_millis(80)).await;
		assert_eq!(cache.get("k").await, None);
	}

	#[tokio::test]
	async fn delete_removes_immediately() {
		let cache = MemoryCache::new();
		cache.set("k", "v".into(), Duration::from_secs(60)).await;
		cache.delete("k").await;
		assert_eq!(cache.get("k").await, None);
	}
}
