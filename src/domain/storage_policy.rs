//! StoragePolicy — a named configuration of a storage backend plus its
//! mount location in the virtual namespace.

use crate::path::Mountable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PolicyType {
	Local,
	Onedrive,
	TencentCos,
	AliyunOss,
	AwsS3,
	QiniuKodo,
}

impl PolicyType {
	/// Object-store backends (everything but local) require endpoint +
	/// bucket + credentials at creation time.
	pub fn is_object_store(self) -> bool {
		!matches!(self, PolicyType::Local)
	}
}

/// Upload method for a policy: staged through the server, or a
/// presigned-URL handoff straight to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString, Default)]
#[strum(serialize_all = "snake_case")]
pub enum UploadMethod {
	#[default]
	Server,
	Client,
}

/// Open-ended per-policy settings. Recognized keys are hoisted to typed
/// fields; anything else lands in `extra` only long enough for
/// `validate_for` to reject it — a create/update request naming an
/// unrecognized key fails rather than silently keeping it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoragePolicySettings {
	pub cdn_domain: Option<String>,
	pub source_auth: bool,
	pub style_separator: Option<String>,
	pub chunk_size: Option<u64>,
	pub upload_method: UploadMethod,
	pub drive_type: Option<String>,
	pub drive_id: Option<String>,
	pub requests_per_second: Option<u32>,
	pub burst_size: Option<u32>,
	#[serde(flatten)]
	pub extra: HashMap<String, serde_json::Value>,
}

/// Settings keys every policy type accepts, regardless of whether that
/// type's own rules make further use of them.
const COMMON_KEYS: &[&str] = &["source_auth", "style_separator", "chunk_size", "upload_method"];

/// Settings keys a policy type accepts in addition to `COMMON_KEYS`.
fn type_specific_keys(policy_type: PolicyType) -> &'static [&'static str] {
	match policy_type {
		PolicyType::Local => &[],
		PolicyType::QiniuKodo => &["cdn_domain"],
		PolicyType::Onedrive => &["drive_type", "drive_id"],
		PolicyType::AwsS3 | PolicyType::AliyunOss | PolicyType::TencentCos => &["requests_per_second", "burst_size"],
	}
}

impl StoragePolicySettings {
	/// Qiniu additionally requires `settings.cdn_domain`. Any key that
	/// isn't recognized for `policy_type` — whether common or
	/// type-specific — is rejected rather than silently absorbed.
	pub fn validate_for(&self, policy_type: PolicyType) -> Result<(), String> {
		if policy_type == PolicyType::QiniuKodo && self.cdn_domain.is_none() {
			return Err("qiniu_kodo policies require settings.cdn_domain".into());
		}
		if let Some(unknown) = self.extra.keys().next() {
			let allowed = type_specific_keys(policy_type);
			return Err(format!(
				"unrecognized setting {unknown:?} for policy type {policy_type} (recognized: {COMMON_KEYS:?} + {allowed:?})"
			));
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoragePolicy {
	pub id: i64,
	pub name: String,
	pub policy_type: PolicyType,
	pub flag: Option<String>,
	pub virtual_path: String,
	pub base_path: String,
	pub server: Option<String>,
	pub bucket_name: Option<String>,
	pub access_key: Option<String>,
	pub secret_key: Option<String>,
	pub is_private: bool,
	/// 0 = unlimited.
	pub max_size: u64,
	pub settings: StoragePolicySettings,
	/// Mount-point Directory row id.
	pub node_id: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub deleted_at: Option<DateTime<Utc>>,
}

impl Mountable for StoragePolicy {
	fn virtual_path(&self) -> &str {
		&self.virtual_path
	}
}

impl StoragePolicy {
	pub fn is_deleted(&self) -> bool {
		self.deleted_at.is_some()
	}

	/// Local `base_path` is always rewritten under
	/// `data/storage/<virtual_name>`, independent of whatever was submitted.
	pub fn normalize_local_base_path(virtual_path: &str) -> String {
		let name = virtual_path.trim_start_matches('/');
		format!("data/storage/{name}")
	}

	/// The policy's externally-facing id: its mount directory's id,
	/// hashid-encoded as a `Dir` entity. Decoding it back (`hashid::decode`)
	/// yields `node_id`, which `PolicyRegistry::get_by_node_id` resolves.
	pub fn public_id(&self) -> String {
		crate::hashid::encode(crate::domain::file::FileType::Dir, self.node_id)
	}
}
