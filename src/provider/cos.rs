//! Tencent COS driver. Thumbnails use `imageMogr2/thumbnail/WxH`; average
//! hue probing (`imageAve`) is exposed the same way as a thumbnail request
//! with a different query suffix.

use super::{Driver, DownloadUrlOptions, DriverError, DriverResult, ListedEntry, PresignedUpload, UploadResult};
use crate::domain::storage_policy::StoragePolicy;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use opendal::{services::Cos, Operator};
use tokio::io::{AsyncRead, AsyncReadExt};

pub struct CosDriver;

impl CosDriver {
	pub fn new() -> Self {
		Self
	}

	fn operator(&self, policy: &StoragePolicy) -> DriverResult<Operator> {
		let server = policy.server.as_deref().ok_or(DriverError::InvalidConfiguration(policy.id))?;
		let bucket = policy.bucket_name.as_deref().ok_or(DriverError::InvalidConfiguration(policy.id))?;
		let access_key = policy.access_key.as_deref().ok_or(DriverError::InvalidConfiguration(policy.id))?;
		let secret_key = policy.secret_key.as_deref().ok_or(DriverError::InvalidConfiguration(policy.id))?;
		let builder = Cos::default().bucket(bucket).endpoint(server).secret_id(access_key).secret_key(secret_key);
		Ok(Operator::new(builder)?.finish())
	}

	fn thumbnail_query(size_tag: &str) -> String {
		let (w, h) = size_tag.split_once('x').unwrap_or(("200", "200"));
		format!("imageMogr2/thumbnail/{w}x{h}")
	}

	pub fn average_hue_query() -> &'static str {
		"imageAve"
	}
}

impl Default for CosDriver {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Driver for CosDriver {
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
		if policy.is_private && !policy.settings.source_auth {
			let op = self.operator(policy)?;
			let ttl = opts.ttl_seconds.unwrap_or(3600);
			let presigned = op.presign_read(source, std::time::Duration::from_secs(ttl as u64)).await?;
			return Ok(super::append_query(presigned.uri().to_string().as_str(), &opts.query_params));
		}
		let base = match &policy.settings.cdn_domain {
			Some(domain) => format!("https://{}/{}", domain.trim_end_matches('/'), source.trim_start_matches('/')),
			None => format!("https://{}/{}", policy.server.as_deref().unwrap_or_default(), source.trim_start_matches('/')),
		};
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

	async fn get_thumbnail(&self, policy: &StoragePolicy, source: &str, size_tag: &str) -> DriverResult<(Bytes, String)> {
		let bytes = self.stream_bytes(policy, &format!("{source}?{}", Self::thumbnail_query(size_tag))).await?;
		Ok((bytes, "image/jpeg".to_string()))
	}

	async fn create_presigned_upload_url(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<PresignedUpload> {
		let op = self.operator(policy)?;
		let key = super::object_key_for_virtual_path(policy, virtual_path);
		let presigned = op.presign_write(&key, std::time::Duration::from_secs(900)).await?;
		Ok(PresignedUpload {
			url: presigned.uri().to_string(),
			expires_at: Utc::now() + ChronoDuration::seconds(900),
			required_content_type: None,
		})
	}
}
