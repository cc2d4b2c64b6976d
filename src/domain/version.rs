//! FileStorageVersion — the File <-> Entity link.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStorageVersion {
	pub id: i64,
	pub file_id: i64,
	pub entity_id: i64,
	pub is_current: bool,
	pub uploaded_by_user_id: i64,
}
