//! Driver contract implemented once per storage-policy type, plus the
//! registry that dispatches to the right implementation at runtime.

pub mod cos;
pub mod kodo;
pub mod local;
pub mod onedrive;
pub mod oss;
pub mod ratelimit;
pub mod registry;
pub mod s3;

use crate::domain::storage_policy::StoragePolicy;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Error)]
pub enum DriverError {
	#[error("object not found: {0}")]
	NotFound(String),

	#[error("feature not supported by this backend")]
	FeatureNotSupported,

	#[error("backend request failed: {0}")]
	Backend(String),

	#[error("invalid credentials or endpoint for policy {0}")]
	InvalidConfiguration(i64),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Opendal(#[from] opendal::Error),
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

#[derive(Debug, Clone)]
pub struct UploadResult {
	pub source: String,
	pub size: u64,
	pub mime_type: Option<String>,
	pub dimension: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ListedEntry {
	pub name: String,
	pub size: u64,
	pub mtime: DateTime<Utc>,
	pub is_dir: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DownloadUrlOptions {
	pub public_id: Option<String>,
	pub ttl_seconds: Option<i64>,
	pub query_params: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PresignedUpload {
	pub url: String,
	pub expires_at: DateTime<Utc>,
	pub required_content_type: Option<String>,
}

/// Uniform storage contract. A `virtual_path` argument is a full namespace
/// path (`/<mount>/<sub>/<name>`) and gets `policy.base_path` applied by the
/// driver; a `source` argument is already the finalized object key or
/// absolute path recorded on a `FileStorageEntity` and is used verbatim.
/// Mixing the two up double- or zero-prefixes object keys.
#[async_trait]
pub trait Driver: Send + Sync {
	async fn upload(
		&self,
		policy: &StoragePolicy,
		virtual_path: &str,
		reader: Box<dyn AsyncRead + Send + Unpin>,
		size_hint: Option<u64>,
	) -> DriverResult<UploadResult>;

	async fn get(&self, policy: &StoragePolicy, source: &str) -> DriverResult<Box<dyn AsyncRead + Send + Unpin>>;

	async fn stream_bytes(&self, policy: &StoragePolicy, source: &str) -> DriverResult<Bytes>;

	async fn get_download_url(
		&self,
		policy: &StoragePolicy,
		source: &str,
		opts: &DownloadUrlOptions,
	) -> DriverResult<String>;

	async fn is_exist(&self, policy: &StoragePolicy, source: &str) -> DriverResult<bool>;

	async fn list(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<Vec<ListedEntry>>;

	async fn create_directory(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<()>;

	async fn delete_directory(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<()>;

	async fn delete(&self, policy: &StoragePolicy, sources: &[String]) -> DriverResult<()>;

	async fn rename(&self, policy: &StoragePolicy, old_virtual_path: &str, new_virtual_path: &str) -> DriverResult<()>;

	async fn get_thumbnail(&self, policy: &StoragePolicy, source: &str, size_tag: &str) -> DriverResult<(Bytes, String)> {
		let _ = (policy, source, size_tag);
		Err(DriverError::FeatureNotSupported)
	}

	async fn create_presigned_upload_url(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<PresignedUpload>;
}

/// `virtualPath − policy.virtual_path`, then `join(trim(base_path, "/"),
/// relative)` with the leading slash stripped. Load-bearing: callers must
/// never apply this twice, and must never apply it to an already-resolved
/// `source`.
pub fn object_key_for_virtual_path(policy: &StoragePolicy, virtual_path: &str) -> String {
	let relative = crate::path::strip_prefix(virtual_path, &policy.virtual_path);
	crate::path::join_object_key(&policy.base_path, &relative)
}

/// A query parameter beginning with one of these is a backend-native style
/// separator, appended to the URL verbatim rather than URL-encoded as a
/// query argument.
pub fn is_style_separator(param: &str) -> bool {
	param.starts_with(['!', '/', '|', '-'])
}

pub fn append_query(base_url: &str, params: &[String]) -> String {
	let mut url = base_url.to_string();
	for param in params {
		if is_style_separator(param) {
			url.push_str(param);
		} else if url.contains('?') {
			url.push('&');
			url.push_str(param);
		} else {
			url.push('?');
			url.push_str(param);
		}
	}
	url
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::domain::storage_policy::{PolicyType, StoragePolicySettings};

	fn policy() -> StoragePolicy {
		StoragePolicy {
			id: 1,
			name: "local".into(),
			policy_type: PolicyType::Local,
			flag: None,
			virtual_path: "/local".into(),
			base_path: "data/storage/local".into(),
			server: None,
			bucket_name: None,
			access_key: None,
			secret_key: None,
			is_private: false,
			max_size: 0,
			settings: StoragePolicySettings::default(),
			node_id: 1,
			created_at: Utc::now(),
			updated_at: Utc::now(),
			deleted_at: None,
		}
	}

	#[test]
	fn object_key_applies_base_path_once() {
		let p = policy();
		assert_eq!(object_key_for_virtual_path(&p, "/local/a/b.txt"), "data/storage/local/a/b.txt");
	}

	#[test]
	fn style_separator_is_appended_verbatim() {
		let url = append_query("https://cdn.example.com/a.jpg", &["!thumb200".to_string()]);
		assert_eq!(url, "https://cdn.example.com/a.jpg!thumb200");
	}

	#[test]
	fn plain_param_is_joined_as_query() {
		let url = append_query("https://cdn.example.com/a.jpg", &["w=200".to_string()]);
		assert_eq!(url, "https://cdn.example.com/a.jpg?w=200");
		let url = append_query(&url, &["h=100".to_string()]);
		assert_eq!(url, "https://cdn.example.com/a.jpg?w=200&h=100");
	}
}
