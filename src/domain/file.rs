//! File — a logical node (file or directory) in the unified namespace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FileType {
	File,
	Dir,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
	pub id: i64,
	pub owner_id: i64,
	/// `None` only for the per-user synthetic root.
	pub parent_id: Option<i64>,
	pub name: String,
	pub file_type: FileType,
	pub size: u64,
	/// Only meaningful for `FileType::File`.
	pub primary_entity_id: Option<i64>,
	/// Materialized for `FileType::Dir`.
	pub children_count: u64,
	pub view_config: Option<serde_json::Value>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub deleted_at: Option<DateTime<Utc>>,
}

impl File {
	pub fn is_dir(&self) -> bool {
		self.file_type == FileType::Dir
	}

	pub fn is_file(&self) -> bool {
		self.file_type == FileType::File
	}

	/// A file with no primary entity is a legitimate zero-byte file,
	/// never reaped by the sync engine's deletion pass.
	pub fn is_empty_file(&self) -> bool {
		self.is_file() && self.primary_entity_id.is_none()
	}

	pub fn is_root(&self) -> bool {
		self.parent_id.is_none()
	}

	/// The file's externally-facing id: its row id, hashid-encoded with
	/// its own kind. `hashid::decode` recovers both the id and whether it
	/// names a `File` or a `Dir`.
	pub fn public_id(&self) -> String {
		crate::hashid::encode(self.file_type, self.id)
	}
}
