//! UploadSession — cache-resident resumable-upload state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

pub const SESSION_TTL_HOURS: i64 = 24;
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024; // 5 MiB

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
	pub session_id: Uuid,
	pub owner_id: i64,
	pub policy_id: i64,
	/// Target virtual path.
	pub uri: String,
	pub chunk_size: u64,
	pub file_size: u64,
	/// Pre-created tentative entity id.
	pub temp_entity_id: i64,
	pub uploaded_chunks: HashSet<u32>,
	pub expire_at: DateTime<Utc>,
}

impl UploadSession {
	pub fn cache_key(session_id: Uuid) -> String {
		format!("upload:session:{session_id}")
	}

	pub fn total_chunks(&self) -> u32 {
		if self.chunk_size == 0 {
			return 1;
		}
		((self.file_size + self.chunk_size - 1) / self.chunk_size).max(1) as u32
	}

	pub fn is_complete(&self) -> bool {
		let total = self.total_chunks();
		(0..total).all(|i| self.uploaded_chunks.contains(&i))
	}

	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		now >= self.expire_at
	}

	pub fn is_index_valid(&self, index: u32) -> bool {
		index < self.total_chunks()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn session(file_size: u64, chunk_size: u64) -> UploadSession {
		UploadSession {
			session_id: Uuid::new_v4(),
			owner_id: 1,
			policy_id: 1,
			uri: "/local/x.bin".into(),
			chunk_size,
			file_size,
			temp_entity_id: 1,
			uploaded_chunks: HashSet::new(),
			expire_at: Utc::now() + chrono::Duration::hours(SESSION_TTL_HOURS),
		}
	}

	#[test]
	fn three_chunks_for_twelve_over_five() {
		// 12 MiB over a 5 MiB chunk size -> 5 + 5 + 2
		let s = session(12 * 1024 * 1024, 5 * 1024 * 1024);
		assert_eq!(s.total_chunks(), 3);
	}

	#[test]
	fn completes_regardless_of_upload_order() {
		let mut s = session(12 * 1024 * 1024, 5 * 1024 * 1024);
		assert!(!s.is_complete());
		s.uploaded_chunks.insert(0);
		s.uploaded_chunks.insert(2);
		assert!(!s.is_complete());
		s.uploaded_chunks.insert(1);
		assert!(s.is_complete());
	}
}
