//! OneDrive / Graph API driver.
//!
//! Small uploads (< 4 MiB) go through `PUT .../content`; larger files open
//! a resumable upload session. Every Graph call for a policy is throttled
//! through that policy's rate-limiter bucket before it goes out.

use super::ratelimit::OnedriveRateLimiters;
use super::{Driver, DownloadUrlOptions, DriverError, DriverResult, ListedEntry, PresignedUpload, UploadResult};
use crate::domain::storage_policy::StoragePolicy;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use tokio::io::{AsyncRead, AsyncReadExt};

const SMALL_UPLOAD_LIMIT: u64 = 4 * 1024 * 1024;
const GRAPH_GLOBAL: &str = "https://graph.microsoft.com/v1.0";
const GRAPH_CHINA: &str = "https://microsoftgraph.chinacloudapi.cn/v1.0";

pub struct OnedriveDriver {
	client: Client,
	rate_limiters: OnedriveRateLimiters,
}

impl OnedriveDriver {
	pub fn new() -> Self {
		Self { client: Client::new(), rate_limiters: OnedriveRateLimiters::new() }
	}

	fn graph_root(policy: &StoragePolicy) -> &'static str {
		match policy.server.as_deref() {
			Some("cn") | Some("china") => GRAPH_CHINA,
			_ => GRAPH_GLOBAL,
		}
	}

	async fn throttle(&self, policy: &StoragePolicy) {
		let rps = policy.settings.requests_per_second.unwrap_or(0);
		let burst = policy.settings.burst_size.unwrap_or(rps);
		self.rate_limiters.acquire(policy.id, rps, burst).await;
	}

	fn bearer(&self, policy: &StoragePolicy) -> DriverResult<String> {
		// Access tokens are refreshed out-of-band and cached by the caller;
		// `secret_key` carries the current bearer token for this policy.
		policy.secret_key.clone().ok_or(DriverError::InvalidConfiguration(policy.id))
	}

	fn item_path_url(policy: &StoragePolicy, source: &str) -> String {
		format!("{}/me/drive/root:/{}", Self::graph_root(policy), source.trim_start_matches('/'))
	}
}

impl Default for OnedriveDriver {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Driver for OnedriveDriver {
	async fn upload(
		&self,
		policy: &StoragePolicy,
		virtual_path: &str,
		mut reader: Box<dyn AsyncRead + Send + Unpin>,
		size_hint: Option<u64>,
	) -> DriverResult<UploadResult> {
		let key = super::object_key_for_virtual_path(policy, virtual_path);
		let mut buf = Vec::new();
		reader.read_to_end(&mut buf).await?;
		let size = buf.len() as u64;
		let token = self.bearer(policy)?;
		self.throttle(policy).await;

		if size_hint.unwrap_or(size) < SMALL_UPLOAD_LIMIT {
			let url = format!("{}:/content", Self::item_path_url(policy, &key));
			let resp = self
				.client
				.put(&url)
				.bearer_auth(&token)
				.body(buf)
				.send()
				.await
				.map_err(|e| DriverError::Backend(e.to_string()))?;
			if !resp.status().is_success() {
				return Err(DriverError::Backend(format!("onedrive upload failed: {}", resp.status())));
			}
		} else {
			let session_url = format!("{}:/createUploadSession", Self::item_path_url(policy, &key));
			let resp = self
				.client
				.post(&session_url)
				.bearer_auth(&token)
				.send()
				.await
				.map_err(|e| DriverError::Backend(e.to_string()))?;
			if !resp.status().is_success() {
				return Err(DriverError::Backend(format!("onedrive session create failed: {}", resp.status())));
			}
			let session: serde_json::Value = resp.json().await.map_err(|e| DriverError::Backend(e.to_string()))?;
			let upload_url = session["uploadUrl"].as_str().ok_or_else(|| DriverError::Backend("missing uploadUrl".into()))?;
			let resp = self
				.client
				.put(upload_url)
				.header("Content-Range", format!("bytes 0-{}/{}", size.saturating_sub(1), size))
				.body(buf)
				.send()
				.await
				.map_err(|e| DriverError::Backend(e.to_string()))?;
			if !resp.status().is_success() {
				return Err(DriverError::Backend(format!("onedrive chunked upload failed: {}", resp.status())));
			}
		}

		Ok(UploadResult { source: key, size, mime_type: None, dimension: None })
	}

	async fn get(&self, policy: &StoragePolicy, source: &str) -> DriverResult<Box<dyn AsyncRead + Send + Unpin>> {
		let bytes = self.stream_bytes(policy, source).await?;
		Ok(Box::new(std::io::Cursor::new(bytes.to_vec())))
	}

	async fn stream_bytes(&self, policy: &StoragePolicy, source: &str) -> DriverResult<Bytes> {
		let token = self.bearer(policy)?;
		self.throttle(policy).await;
		let url = format!("{}:/content", Self::item_path_url(policy, source));
		let resp = self.client.get(&url).bearer_auth(&token).send().await.map_err(|e| DriverError::Backend(e.to_string()))?;
		if resp.status() == reqwest::StatusCode::NOT_FOUND {
			return Err(DriverError::NotFound(source.to_string()));
		}
		resp.bytes().await.map_err(|e| DriverError::Backend(e.to_string()))
	}

	async fn get_download_url(&self, policy: &StoragePolicy, source: &str, opts: &DownloadUrlOptions) -> DriverResult<String> {
		let token = self.bearer(policy)?;
		self.throttle(policy).await;
		let url = Self::item_path_url(policy, source);
		let resp = self.client.get(&url).bearer_auth(&token).send().await.map_err(|e| DriverError::Backend(e.to_string()))?;
		let item: serde_json::Value = resp.json().await.map_err(|e| DriverError::Backend(e.to_string()))?;
		let download_url = item["@microsoft.graph.downloadUrl"]
			.as_str()
			.ok_or_else(|| DriverError::Backend("no download url in response".into()))?;
		Ok(super::append_query(download_url, &opts.query_params))
	}

	async fn is_exist(&self, policy: &StoragePolicy, source: &str) -> DriverResult<bool> {
		let token = self.bearer(policy)?;
		self.throttle(policy).await;
		let url = Self::item_path_url(policy, source);
		let resp = self.client.get(&url).bearer_auth(&token).send().await.map_err(|e| DriverError::Backend(e.to_string()))?;
		Ok(resp.status().is_success())
	}

	async fn list(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<Vec<ListedEntry>> {
		let token = self.bearer(policy)?;
		self.throttle(policy).await;
		let key = super::object_key_for_virtual_path(policy, virtual_path);
		let url = format!("{}:/children", Self::item_path_url(policy, &key));
		let resp = self.client.get(&url).bearer_auth(&token).send().await.map_err(|e| DriverError::Backend(e.to_string()))?;
		if resp.status() == reqwest::StatusCode::NOT_FOUND {
			return Ok(Vec::new());
		}
		let body: serde_json::Value = resp.json().await.map_err(|e| DriverError::Backend(e.to_string()))?;
		let mut entries = Vec::new();
		for item in body["value"].as_array().cloned().unwrap_or_default() {
			let name = item["name"].as_str().unwrap_or_default().to_string();
			if name.starts_with('.') {
				continue;
			}
			let size = item["size"].as_u64().unwrap_or(0);
			let is_dir = item.get("folder").is_some();
			let mtime = item["lastModifiedDateTime"]
				.as_str()
				.and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
				.map(|dt| dt.with_timezone(&chrono::Utc))
				.unwrap_or_else(chrono::Utc::now);
			entries.push(ListedEntry { name, size, mtime, is_dir });
		}
		Ok(entries)
	}

	async fn create_directory(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<()> {
		let token = self.bearer(policy)?;
		self.throttle(policy).await;
		let key = super::object_key_for_virtual_path(policy, virtual_path);
		let (parent, name) = key.rsplit_once('/').unwrap_or(("", &key));
		let url = format!("{}/me/drive/root:/{}:/children", Self::graph_root(policy), parent.trim_start_matches('/'));
		let body = serde_json::json!({
			"name": name,
			"folder": {},
			"@microsoft.graph.conflictBehavior": "fail",
		});
		let resp = self
			.client
			.post(&url)
			.bearer_auth(&token)
			.json(&body)
			.send()
			.await
			.map_err(|e| DriverError::Backend(e.to_string()))?;
		// nameAlreadyExists is treated as success: CreateDirectory is idempotent.
		if resp.status().is_success() || resp.status() == reqwest::StatusCode::CONFLICT {
			Ok(())
		} else {
			Err(DriverError::Backend(format!("onedrive create_directory failed: {}", resp.status())))
		}
	}

	async fn delete_directory(&self, policy: &StoragePolicy, virtual_path: &str) -> DriverResult<()> {
		let key = super::object_key_for_virtual_path(policy, virtual_path);
		self.delete(policy, &[key]).await
	}

	async fn delete(&self, policy: &StoragePolicy, sources: &[String]) -> DriverResult<()> {
		let token = self.bearer(policy)?;
		for source in sources {
			self.throttle(policy).await;
			let url = Self::item_path_url(policy, source);
			let resp = self.client.delete(&url).bearer_auth(&token).send().await.map_err(|e| DriverError::Backend(e.to_string()))?;
			if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
				return Err(DriverError::Backend(format!("onedrive delete failed: {}", resp.status())));
			}
		}
		Ok(())
	}

	async fn rename(&self, policy: &StoragePolicy, old_virtual_path: &str, new_virtual_path: &str) -> DriverResult<()> {
		let token = self.bearer(policy)?;
		self.throttle(policy).await;
		let old_key = super::object_key_for_virtual_path(policy, old_virtual_path);
		let new_key = super::object_key_for_virtual_path(policy, new_virtual_path);
		let (new_parent, new_name) = new_key.rsplit_once('/').unwrap_or(("", &new_key));
		let url = Self::item_path_url(policy, &old_key);
		let body = serde_json::json!({
			"name": new_name,
			"parentReference": { "path": format!("/drive/root:/{}", new_parent.trim_start_matches('/')) },
		});
		let resp = self
			.client
			.patch(&url)
			.bearer_auth(&token)
			.json(&body)
			.send()
			.await
			.map_err(|e| DriverError::Backend(e.to_string()))?;
		if resp.status().is_success() {
			Ok(())
		} else {
			Err(DriverError::Backend(format!("onedrive rename failed: {}", resp.status())))
		}
	}

	async fn get_thumbnail(&self, policy: &StoragePolicy, source: &str, _size_tag: &str) -> DriverResult<(Bytes, String)> {
		let token = self.bearer(policy)?;
		self.throttle(policy).await;
		let url = format!("{}:/thumbnails", Self::item_path_url(policy, source));
		let resp = self.client.get(&url).bearer_auth(&token).send().await.map_err(|e| DriverError::Backend(e.to_string()))?;
		if resp.status() == reqwest::StatusCode::NOT_FOUND {
			return Err(DriverError::FeatureNotSupported);
		}
		let body: serde_json::Value = resp.json().await.map_err(|e| DriverError::Backend(e.to_string()))?;
		let Some(url) = body["value"][0]["large"]["url"].as_str() else {
			return Err(DriverError::FeatureNotSupported);
		};
		let thumb = self.client.get(url).send().await.map_err(|e| DriverError::Backend(e.to_string()))?;
		let bytes = thumb.bytes().await.map_err(|e| DriverError::Backend(e.to_string()))?;
		Ok((bytes, "image/jpeg".to_string()))
	}

	async fn create_presigned_upload_url(&self, _policy: &StoragePolicy, _virtual_path: &str) -> DriverResult<PresignedUpload> {
		// OneDrive supports client-direct uploads via its own resumable
		// session, handed out through `upload` once the server creates it;
		// there is no separate presign step distinct from that session.
		Ok(PresignedUpload { url: String::new(), expires_at: Utc::now() + ChronoDuration::seconds(3600), required_content_type: None })
	}
}
