//! Local filesystem driver.
//!
//! `source` is always an absolute filesystem path. Uploads stage to a
//! processing temp file, sniff MIME by magic bytes (with an `.svg`
//! extension override), probe image dimensions when decodable, then
//! rename into place; cross-filesystem renames fall back to copy+unlink.

use super::{Driver, DownloadUrlOptions, DriverError, DriverResult, ListedEntry, PresignedUpload, UploadResult};
use crate::domain::storage_policy::StoragePolicy;
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

pub struct LocalDriver {
	storage_root: PathBuf,
	signing_secret: Option<String>,
}

impl LocalDriver {
	pub fn new(storage_root: PathBuf) -> Self {
		Self { storage_root, signing_secret: None }
	}

	pub fn with_signing_secret(storage_root: PathBuf, signing_secret: String) -> Self {
		Self { storage_root, signing_secret: Some(signing_secret) }
	}

	fn temp_file(&self) -> PathBuf {
		self.storage_root
			.join("..")
			.join("temp")
			.join(format!("anheyu-app-processing-{}.tmp", uuid::Uuid::new_v4()))
	}
}

/// `base64url(HMAC-SHA256(secret, "public_id:expires"))`.
pub fn sign(secret: &str, public_id: &str, expires: i64) -> String {
	let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
	mac.update(format!("{public_id}:{expires}").as_bytes());
	base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

pub fn verify(secret: &str, public_id: &str, expires: i64, signature: &str) -> bool {
	let expected = sign(secret, public_id, expires);
	constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	if a.len() != b.len() {
		return false;
	}
	let mut diff = 0u8;
	for (x, y) in a.iter().zip(b.iter()) {
		diff |= x ^ y;
	}
	diff == 0
}

fn sniff_mime(head: &[u8], name: &str) -> String {
	if name.to_ascii_lowercase().ends_with(".svg") {
		return "image/svg+xml".to_string();
	}
	match infer::get(head) {
		Some(kind) => kind.mime_type().to_string(),
		None => "application/octet-stream".to_string(),
	}
}

fn probe_dimensions(bytes: &[u8]) -> Option<String> {
	let img = image::load_from_memory(bytes).ok()?;
	Some(format!("{}x{}", img.width(), img.height()))
}

#[async_trait]
impl Driver for LocalDriver {
	async fn upload(
		&self,
		policy: &StoragePolicy,
		virtual_path: &str,
		mut reader: Box<dyn AsyncRead + Send + Unpin>,
		_size_hint: Option<u64>,
	) -> DriverResult<UploadResult> {
		let object_key = super::object_key_for_virtual_path(policy, virtual_path);
		let dest = Path::new(&object_key).to_path_buf();
		if let Some(parent) = dest.parent() {
			fs::create_dir_all(parent).await?;
		}

		let temp_path = self.temp_file();
		if let Some(parent) = temp_path.parent() {
			fs::create_dir_all(parent).await?;
		}
		let mut buf = Vec::new();
		reader.read_to_end(&mut buf).await?;
		{
			let mut file = fs::File::create(&temp_path).await?;
			file.write_all(&buf).await?;
			file.flush().await?;
		}

		let name = dest.file_name().and_then(|n| n.to_str()).unwrap_or_default();
		let mime_type = sniff_mime(&buf[..buf.len().min(512)], name);
		let dimension = if mime_type.starts_with("image/") { probe_dimensions(&buf) } else { None };
		let size = buf.len() as u64;

		match fs::rename(&temp_path, &dest).await {
			Ok(()) => {}
			Err(_) => {
				fs::copy(&temp_path, &dest).await?;
				let _ = fs::remove_file(&temp_path).await;
			}
		}

		Ok(UploadResult {
			source: dest.to_string_lossy().into_owned(),
			size,
			mime_type: Some(mime_type),
			dimension,
		})
	}

	async fn get(&self, _policy: &StoragePolicy, source: &str) -> DriverResult<Box<dyn AsyncRead + Send + Unpin>> {
		let file = fs::File::open(source).await.map_err(|e| match e.kind() {
			std::io::ErrorKind::NotFound => DriverError::NotFound(source.to_string()),
			_ => DriverError::Io(e),
		})?;
		Ok(Box::new(file))
	}

	async fn stream_bytes(&self, _policy: &StoragePolicy, source: &str) -> DriverResult<Bytes> {
		let bytes = fs::read(source).await.map_err(|e| match e.kind() {
			std::io::ErrorKind::NotFound => DriverError::NotFound(source.to_string()),
			_ => DriverError::Io(e),
		})?;
		Ok(Bytes::from(bytes))
	}

	async fn get_download_url(&self, _policy: &StoragePolicy, source: &str, opts: &DownloadUrlOptions) -> DriverResult<String> {
		let Some(secret) = &self.signing_secret else {
			return Ok(format!("file://{source}"));
		};
		let public_id = opts.public_id.clone().unwrap_or_else(|| source.to_string());
		let ttl = opts.ttl_seconds.unwrap_or(3600);
		let expires = Utc::now().timestamp() + ttl;
		let signature = sign(secret, &public_id, expires);
		let url = format!("/api/download/local/{public_id}?expires={expires}&sign={signature}");
		Ok(super::append_query(&url, &opts.query_params))
	}

	async fn is_exist(&self, _policy: &StoragePolicy, source: &str) -> DriverResult<bool> {
		Ok(fs::metadata(source).await.is_ok())
	}

	async fn list(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<Vec<ListedEntry>> {
		let object_key = super::object_key_for_virtual_path(policy, virtual_path);
		let dir = Path::new(&object_key);
		if !dir.exists() {
			return Ok(Vec::new());
		}
		let mut entries = Vec::new();
		let mut read_dir = fs::read_dir(dir).await?;
		while let Some(entry) = read_dir.next_entry().await? {
			let name = entry.file_name().to_string_lossy().into_owned();
			if name.starts_with('.') {
				continue;
			}
			let meta = entry.metadata().await?;
			let mtime: DateTime<Utc> = meta.modified().map(DateTime::from).unwrap_or_else(|_| Utc::now());
			entries.push(ListedEntry { name, size: meta.len(), mtime, is_dir: meta.is_dir() });
		}
		Ok(entries)
	}

	async fn create_directory(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<()> {
		let object_key = super::object_key_for_virtual_path(policy, virtual_path);
		fs::create_dir_all(&object_key).await?;
		Ok(())
	}

	async fn delete_directory(&self, _policy: &StoragePolicy, _virtual_path: &str) -> DriverResult<()> {
		// `source` carries the absolute path for local deletes; directory
		// deletes arrive through `delete` with the resolved source instead.
		Ok(())
	}

	async fn delete(&self, _policy: &StoragePolicy, sources: &[String]) -> DriverResult<()> {
		for source in sources {
			let path = Path::new(source);
			let result = if fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
				fs::remove_dir_all(path).await
			} else {
				fs::remove_file(path).await
			};
			if let Err(e) = result {
				if e.kind() != std::io::ErrorKind::NotFound {
					return Err(DriverError::Io(e));
				}
			}
		}
		Ok(())
	}

	async fn rename(&self, policy: &StoragePolicy, old_virtual_path: &str, new_virtual_path: &str) -> DriverResult<()> {
		let old_key = super::object_key_for_virtual_path(policy, old_virtual_path);
		let new_key = super::object_key_for_virtual_path(policy, new_virtual_path);
		if let Some(parent) = Path::new(&new_key).parent() {
			fs::create_dir_all(parent).await?;
		}
		if fs::rename(&old_key, &new_key).await.is_err() {
			fs::copy(&old_key, &new_key).await?;
			fs::remove_file(&old_key).await?;
		}
		Ok(())
	}

	async fn create_presigned_upload_url(&self, _policy: &StoragePolicy, _virtual_path: &str) -> DriverResult<PresignedUpload> {
		Err(DriverError::FeatureNotSupported)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sign_and_verify_round_trip() {
		let sig = sign("secret", "P1", 1000);
		assert!(verify("secret", "P1", 1000, &sig));
	}

	#[test]
	fn verify_rejects_wrong_key() {
		let sig = sign("secret", "P1", 1000);
		assert!(!verify("other", "P1", 1000, &sig));
	}

	#[test]
	fn svg_extension_overrides_sniffing() {
		assert_eq!(sniff_mime(b"<svg></svg>", "icon.svg"), "image/svg+xml");
	}

	#[tokio::test]
	async fn upload_then_exist_then_delete_round_trips() {
		let tmp = tempfile::tempdir().unwrap();
		let storage_root = tmp.path().join("storage").join("local");
		tokio::fs::create_dir_all(&storage_root).await.unwrap();
		let driver = LocalDriver::new(tmp.path().join("storage").join("local"));

		let policy = crate::domain::storage_policy::StoragePolicy {
			id: 1,
			name: "local".into(),
			policy_type: crate::domain::storage_policy::PolicyType::Local,
			flag: None,
			virtual_path: "/local".into(),
			base_path: storage_root.to_string_lossy().into_owned(),
			server: None,
			bucket_name: None,
			access_key: None,
			secret_key: None,
			is_private: false,
			max_size: 0,
			settings: Default::default(),
			node_id: 1,
			created_at: Utc::now(),
			updated_at: Utc::now(),
			deleted_at: None,
		};

		let data = b"hello world".to_vec();
		let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(std::io::Cursor::new(data.clone()));
		let result = driver.upload(&policy, "/local/hello.txt", reader, Some(data.len() as u64)).await.unwrap();
		assert_eq!(result.size, data.len() as u64);
		assert!(driver.is_exist(&policy, &result.source).await.unwrap());

		driver.delete(&policy, &[result.source.clone()]).await.unwrap();
		assert!(!driver.is_exist(&policy, &result.source).await.unwrap());
	}
}
