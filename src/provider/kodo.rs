//! Qiniu Kodo driver. Presigned upload returns an upload *token*, not a PUT
//! URL — the client POSTs multipart with `token` and `key` fields. Public
//! URLs require `settings.cdn_domain`; private URLs carry a deadline-signed
//! query string.

use super::{Driver, DownloadUrlOptions, DriverError, DriverResult, ListedEntry, PresignedUpload, UploadResult};
use crate::domain::storage_policy::StoragePolicy;
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use opendal::{services::Qiniu, Operator};
use sha2::Sha256;
use tokio::io::{AsyncRead, AsyncReadExt};

pub struct KodoDriver;

impl KodoDriver {
	pub fn new() -> Self {
		Self
	}

	fn operator(&self, policy: &StoragePolicy) -> DriverResult<Operator> {
		let bucket = policy.bucket_name.as_deref().ok_or(DriverError::InvalidConfiguration(policy.id))?;
		let access_key = policy.access_key.as_deref().ok_or(DriverError::InvalidConfiguration(policy.id))?;
		let secret_key = policy.secret_key.as_deref().ok_or(DriverError::InvalidConfiguration(policy.id))?;
		let mut builder = Qiniu::default().bucket(bucket).access_key(access_key).secret_key(secret_key);
		if let Some(server) = &policy.server {
			builder = builder.endpoint(server);
		}
		Ok(Operator::new(builder)?.finish())
	}

	fn upload_token(access_key: &str, secret_key: &str, bucket: &str, key: &str, deadline: i64) -> String {
		let policy = serde_json::json!({"scope": format!("{bucket}:{key}"), "deadline": deadline});
		let encoded_policy = base64::engine::general_purpose::URL_SAFE.encode(policy.to_string());
		let mut mac = Hmac::<Sha256>::new_from_slice(secret_key.as_bytes()).expect("HMAC accepts any key length");
		mac.update(encoded_policy.as_bytes());
		let sign = base64::engine::general_purpose::URL_SAFE.encode(mac.finalize().into_bytes());
		format!("{access_key}:{sign}:{encoded_policy}")
	}

	fn private_url(secret_key: &str, cdn_domain: &str, key: &str, deadline: i64) -> String {
		let base = format!("https://{}/{}?e={}", cdn_domain.trim_end_matches('/'), key.trim_start_matches('/'), deadline);
		let mut mac = Hmac::<Sha256>::new_from_slice(secret_key.as_bytes()).expect("HMAC accepts any key length");
		mac.update(base.as_bytes());
		let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
		format!("{base}&token={token}")
	}
}

impl Default for KodoDriver {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Driver for KodoDriver {
	async fn upload(
		&self,
		policy: &StoragePolicy,
		virtual_path: &str,
		mut reader: Box<dyn AsyncRead + Send + Unpin>,
		_size_hint: Option<u64>,
	) -> DriverResult<UploadResult> {
		let op = self.operator(policy)?;
		let key = super::object_key_for_virtual_path(policy, virtual_path);
		let mut buf = Vec::new();
		reader.read_to_end(&mut buf).await?;
		let size = buf.len() as u64;
		op.write(&key, buf).await?;
		Ok(UploadResult { source: key, size, mime_type: None, dimension: None })
	}

	async fn get(&self, policy: &StoragePolicy, source: &str) -> DriverResult<Box<dyn AsyncRead + Send + Unpin>> {
		let bytes = self.stream_bytes(policy, source).await?;
		Ok(Box::new(std::io::Cursor::new(bytes.to_vec())))
	}

	async fn stream_bytes(&self, policy: &StoragePolicy, source: &str) -> DriverResult<Bytes> {
		let op = self.operator(policy)?;
		let buf = op.read(source).await.map_err(|e| {
			if e.kind() == opendal::ErrorKind::NotFound {
				DriverError::NotFound(source.to_string())
			} else {
				DriverError::Opendal(e)
			}
		})?;
		Ok(buf.to_bytes())
	}

	async fn get_download_url(&self, policy: &StoragePolicy, source: &str, opts: &DownloadUrlOptions) -> DriverResult<String> {
		let cdn_domain = policy
			.settings
			.cdn_domain
			.as_deref()
			.ok_or_else(|| DriverError::Backend("qiniu_kodo requires settings.cdn_domain".into()))?;
		let ttl = opts.ttl_seconds.unwrap_or(3600);
		let deadline = Utc::now().timestamp() + ttl;
		if policy.is_private && !policy.settings.source_auth {
			let secret_key = policy.secret_key.as_deref().ok_or(DriverError::InvalidConfiguration(policy.id))?;
			return Ok(super::append_query(&Self::private_url(secret_key, cdn_domain, source, deadline), &opts.query_params));
		}
		let base = format!("https://{}/{}", cdn_domain.trim_end_matches('/'), source.trim_start_matches('/'));
		Ok(super::append_query(&base, &opts.query_params))
	}

	async fn is_exist(&self, policy: &StoragePolicy, source: &str) -> DriverResult<bool> {
		let op = self.operator(policy)?;
		Ok(op.exists(source).await?)
	}

	async fn list(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<Vec<ListedEntry>> {
		let op = self.operator(policy)?;
		let key = super::object_key_for_virtual_path(policy, virtual_path);
		let prefix = if key.is_empty() { String::new() } else { format!("{}/", key.trim_end_matches('/')) };
		let mut entries = Vec::new();
		let mut lister = op.lister(&prefix).await?;
		use futures::StreamExt;
		while let Some(entry) = lister.next().await {
			let entry = entry?;
			let name = entry.name().trim_end_matches('/').to_string();
			if name.is_empty() || name.starts_with('.') {
				continue;
			}
			let meta = op.stat(entry.path()).await?;
			let mtime: DateTime<Utc> = meta.last_modified().unwrap_or_else(Utc::now);
			entries.push(ListedEntry { name, size: meta.content_length(), mtime, is_dir: meta.is_dir() });
		}
		Ok(entries)
	}

	async fn create_directory(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<()> {
		let op = self.operator(policy)?;
		let key = super::object_key_for_virtual_path(policy, virtual_path);
		op.create_dir(&format!("{}/", key.trim_end_matches('/'))).await?;
		Ok(())
	}

	async fn delete_directory(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<()> {
		let op = self.operator(policy)?;
		let key = super::object_key_for_virtual_path(policy, virtual_path);
		op.remove_all(&format!("{}/", key.trim_end_matches('/'))).await?;
		Ok(())
	}

	async fn delete(&self, policy: &StoragePolicy, sources: &[String]) -> DriverResult<()> {
		let op = self.operator(policy)?;
		for source in sources {
			op.delete(source).await?;
		}
		Ok(())
	}

	async fn rename(&self, policy: &StoragePolicy, old_virtual_path: &str, new_virtual_path: &str) -> DriverResult<()> {
		let op = self.operator(policy)?;
		let old_key = super::object_key_for_virtual_path(policy, old_virtual_path);
		let new_key = super::object_key_for_virtual_path(policy, new_virtual_path);
		op.rename(&old_key, &new_key).await?;
		Ok(())
	}

	async fn create_presigned_upload_url(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<PresignedUpload> {
		let bucket = policy.bucket_name.as_deref().ok_or(DriverError::InvalidConfiguration(policy.id))?;
		let access_key = policy.access_key.as_deref().ok_or(DriverError::InvalidConfiguration(policy.id))?;
		let secret_key = policy.secret_key.as_deref().ok_or(DriverError::InvalidConfiguration(policy.id))?;
		let key = super::object_key_for_virtual_path(policy, virtual_path);
		let deadline = Utc::now().timestamp() + 3600;
		let token = Self::upload_token(access_key, secret_key, bucket, &key, deadline);
		Ok(PresignedUpload { url: token, expires_at: Utc::now() + ChronoDuration::seconds(3600), required_content_type: None })
	}
}
