//! FileStorageEntity — a physical backend object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStorageEntity {
	pub id: i64,
	pub policy_id: i64,
	/// Backend-native object key (object stores) or absolute filesystem
	/// path (local). Already includes `base_path` for object stores —
	/// never recomputed by a caller.
	pub source: String,
	pub size: u64,
	pub mime_type: Option<String>,
	/// `"WxH"` for images.
	pub dimension: Option<String>,
	pub etag: Option<String>,
	/// Non-null iff this entity is a tentative reservation not yet
	/// associated with a finalized File.
	pub upload_session_id: Option<uuid::Uuid>,
	pub storage_metadata: Option<serde_json::Value>,
	pub created_by: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl FileStorageEntity {
	pub fn is_tentative(&self) -> bool {
		self.upload_session_id.is_some()
	}

	/// Tentative entities older than `threshold` are GC eligible. Callers
	/// pass a threshold matching the upload session TTL (24h).
	pub fn is_abandoned(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
		self.is_tentative() && now - self.updated_at > threshold
	}
}
