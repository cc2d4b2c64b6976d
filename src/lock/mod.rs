//! Per-path serialization lock.
//!
//! A registry of one mutex per distinct virtual path, guarded by an outer
//! mutex. Two callers locking the same path serialize; callers locking
//! different paths never block each other. The registry only grows: it is
//! bounded by the number of distinct paths ever locked, not by wall time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
pub struct PathLocker {
	inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

pub struct PathGuard {
	_guard: OwnedMutexGuard<()>,
}

impl PathLocker {
	pub fn new() -> Self {
		Self { inner: Mutex::new(HashMap::new()) }
	}

	/// Locks `path`, creating its entry if this is the first time it has
	/// been seen. The returned guard releases the lock on drop.
	pub async fn lock(&self, path: &str) -> PathGuard {
		let mutex = {
			let mut map = self.inner.lock().unwrap();
			map.entry(path.to_string()).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))).clone()
		};
		let guard = mutex.lock_owned().await;
		PathGuard { _guard: guard }
	}

	pub fn tracked_paths(&self) -> usize {
		self.inner.lock().unwrap().len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn same_path_serializes() {
		let locker = Arc::new(PathLocker::new());
		let order = Arc::new(Mutex::new(Vec::new()));

		let l1 = locker.clone();
		let o1 = order.clone();
		let t1 = tokio::spawn(async move {
			let _g = l1.lock("/local/a").await;
			tokio::time::sleep(Duration::from_millis(30)).await;
			o1.lock().unwrap().push(1);
		});
		tokio::time::sleep(Duration::from_millis(5)).await;
		let l2 = locker.clone();
		let o2 = order.clone();
		let t2 = tokio::spawn(async move {
			let _g = l2.lock("/local/a").await;
			o2.lock().unwrap().push(2);
		});

		t1.await.unwrap();
		t2.await.unwrap();
		assert_eq!(*order.lock().unwrap(), vec![1, 2]);
	}

	#[tokio::test]
	async fn different_paths_do_not_block() {
		let locker = PathLocker::new();
		let _a = locker.lock("/local/a").await;
		let _b = tokio::time::timeout(Duration::from_millis(50), locker.lock("/local/b")).await;
		assert!(_b.is_ok());
	}
}
