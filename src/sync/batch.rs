//! Batch sizing for the sync engine's creation pass. Smaller batches for
//! smaller directories keep single-transaction latency low; large
//! directories get bigger batches so the pass doesn't spend most of its
//! time on transaction overhead.

pub fn calculate_batch_size(total: usize) -> usize {
	match total {
		0..=200 => 50,
		201..=1000 => 100,
		1001..=5000 => 250,
		_ => 500,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn picks_the_right_tier() {
		assert_eq!(calculate_batch_size(0), 50);
		assert_eq!(calculate_batch_size(200), 50);
		assert_eq!(calculate_batch_size(201), 100);
		assert_eq!(calculate_batch_size(1000), 100);
		assert_eq!(calculate_batch_size(1001), 250);
		assert_eq!(calculate_batch_size(5000), 250);
		assert_eq!(calculate_batch_size(5001), 500);
	}
}
