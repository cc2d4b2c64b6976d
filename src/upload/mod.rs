//! Upload engine: session lifecycle, chunk persistence, merge, finalize.
//!
//! Two upload methods branch at session creation. **Server-staged**
//! (default) stores chunks under `upload_temp_dir` and merges them on the
//! last chunk. **Client-direct** (OneDrive, and object stores configured
//! for it) hands the caller a presigned URL and persists no session at
//! all; the caller reports back once its own PUT succeeds.

pub mod gc;

use crate::domain::storage_policy::{StoragePolicy, UploadMethod};
use crate::domain::upload_session::{UploadSession, DEFAULT_CHUNK_SIZE, SESSION_TTL_HOURS};
use crate::error::{AppError, Result};
use crate::file_type;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::database::entities::{file, file_storage_entity};
use crate::infrastructure::database::repository::{entity_repo, file_repo, version_repo, TransactionManager};
use crate::infrastructure::events::{Event, EventBus};
use crate::policy::PolicyRegistry;
use crate::provider::registry::DriverRegistry;
use chrono::{Duration as ChronoDuration, Utc};
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UploadError {
	#[error("extension {0:?} is not on the upload allowlist")]
	ExtensionNotAllowed(String),

	#[error("file size {size} exceeds policy limit {max}")]
	FileTooLarge { size: u64, max: u64 },

	#[error("{0:?} already exists at destination")]
	AlreadyExists(String),

	#[error("upload session not found")]
	SessionNotFound,

	#[error("upload session expired")]
	SessionExpired,

	#[error("chunk index {index} out of range (expected < {total})")]
	InvalidChunkIndex { index: u32, total: u32 },

	#[error("object {0:?} not found at destination after client-direct upload")]
	ObjectNotFound(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

pub struct CreateSessionRequest {
	pub owner_id: i64,
	pub policy_id: i64,
	pub virtual_path: String,
	pub file_size: u64,
	pub overwrite: bool,
}

pub enum CreateSessionResult {
	Server { session_id: Uuid, chunk_size: u64, expires_at: chrono::DateTime<Utc> },
	Client { expires_at: chrono::DateTime<Utc>, upload_url: String, content_type: Option<String> },
}

pub enum ChunkUploadOutcome {
	Pending,
	Finalized { file_id: i64 },
}

pub struct SessionStatus {
	pub session_id: Uuid,
	pub chunk_size: u64,
	pub total_chunks: u32,
	pub uploaded_chunks: Vec<u32>,
	pub expires_at: chrono::DateTime<Utc>,
	pub is_valid: bool,
}

pub struct UploadEngine {
	txm: Arc<TransactionManager>,
	drivers: Arc<DriverRegistry>,
	policies: Arc<PolicyRegistry>,
	cache: Arc<dyn Cache>,
	events: Arc<EventBus>,
	upload_temp_dir: PathBuf,
	allowed_extensions: Vec<String>,
}

impl UploadEngine {
	pub fn new(
		txm: Arc<TransactionManager>,
		drivers: Arc<DriverRegistry>,
		policies: Arc<PolicyRegistry>,
		cache: Arc<dyn Cache>,
		events: Arc<EventBus>,
		upload_temp_dir: PathBuf,
		allowed_extensions: Vec<String>,
	) -> Self {
		Self { txm, drivers, policies, cache, events, upload_temp_dir, allowed_extensions }
	}

	fn is_extension_allowed(&self, ext: &str) -> bool {
		self.allowed_extensions.is_empty() || self.allowed_extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
	}

	pub async fn create_session(&self, req: CreateSessionRequest) -> Result<CreateSessionResult> {
		let (parent_vpath, leaf_name) = split_leaf(&req.virtual_path);
		let ext = extension_of(&leaf_name);
		if !self.is_extension_allowed(&ext) {
			return Err(UploadError::ExtensionNotAllowed(ext).into());
		}

		let policy = self.policies.get_by_id(req.policy_id).await?;
		if policy.max_size != 0 && req.file_size > policy.max_size {
			return Err(UploadError::FileTooLarge { size: req.file_size, max: policy.max_size }.into());
		}

		if policy.settings.upload_method == UploadMethod::Client {
			{
				let policy = policy.clone();
				let parent_vpath = parent_vpath.clone();
				let leaf_name = leaf_name.clone();
				let owner_id = req.owner_id;
				let overwrite = req.overwrite;
				self.txm
					.with_transaction(move |txn| {
						Box::pin(async move {
							let parent = find_or_create_parent(txn, owner_id, &policy, &parent_vpath).await?;
							if !overwrite && file_repo::find_by_parent_and_name(txn, Some(parent.id), &leaf_name, owner_id).await?.is_some() {
								return Err(AppError::from(UploadError::AlreadyExists(leaf_name)));
							}
							Ok::<_, AppError>(())
						})
					})
					.await?;
			}
			let driver = self.drivers.get(policy.policy_type)?;
			let presigned = driver.create_presigned_upload_url(&policy, &req.virtual_path).await?;
			return Ok(CreateSessionResult::Client {
				expires_at: presigned.expires_at,
				upload_url: presigned.url,
				content_type: presigned.required_content_type,
			});
		}

		let chunk_size = policy.settings.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
		let session_id = Uuid::new_v4();
		let temp_entity_id = {
			let owner_id = req.owner_id;
			let policy_for_txn = policy.clone();
			let parent_vpath = parent_vpath.clone();
			let leaf_name = leaf_name.clone();
			let overwrite = req.overwrite;
			let file_size = req.file_size;
			self.txm
				.with_transaction(move |txn| {
					Box::pin(async move {
						let parent = find_or_create_parent(txn, owner_id, &policy_for_txn, &parent_vpath).await?;
						if !overwrite && file_repo::find_by_parent_and_name(txn, Some(parent.id), &leaf_name, owner_id).await?.is_some() {
							return Err(AppError::from(UploadError::AlreadyExists(leaf_name)));
						}
						let now = Utc::now();
						let entity_active = file_storage_entity::ActiveModel {
							id: sea_orm::ActiveValue::NotSet,
							policy_id: Set(policy_for_txn.id),
							source: Set(String::new()),
							size: Set(file_size as i64),
							mime_type: Set(None),
							dimension: Set(None),
							etag: Set(None),
							upload_session_id: Set(Some(session_id)),
							storage_metadata: Set(None),
							created_by: Set(owner_id),
							created_at: Set(now),
							updated_at: Set(now),
						};
						let entity = entity_repo::insert(txn, entity_active).await?;
						Ok::<_, AppError>(entity.id)
					})
				})
				.await?
		};

		let session = UploadSession {
			session_id,
			owner_id: req.owner_id,
			policy_id: policy.id,
			uri: req.virtual_path,
			chunk_size,
			file_size: req.file_size,
			temp_entity_id,
			uploaded_chunks: Default::default(),
			expire_at: Utc::now() + ChronoDuration::hours(SESSION_TTL_HOURS),
		};
		self.save_session(&session).await?;
		Ok(CreateSessionResult::Server { session_id, chunk_size, expires_at: session.expire_at })
	}

	/// Writes one chunk to disk and, if this completes the session,
	/// finalizes it inline.
	pub async fn upload_chunk(&self, session_id: Uuid, index: u32, mut reader: impl AsyncRead + Unpin) -> Result<ChunkUploadOutcome> {
		let mut session = self.load_session(session_id).await?;
		if session.is_expired(Utc::now()) {
			return Err(UploadError::SessionExpired.into());
		}
		if !session.is_index_valid(index) {
			return Err(UploadError::InvalidChunkIndex { index, total: session.total_chunks() }.into());
		}

		let dir = self.upload_temp_dir.join(session_id.to_string());
		tokio::fs::create_dir_all(&dir).await.map_err(UploadError::Io)?;
		let mut buf = Vec::new();
		reader.read_to_end(&mut buf).await.map_err(UploadError::Io)?;
		tokio::fs::write(dir.join(index.to_string()), &buf).await.map_err(UploadError::Io)?;

		session.uploaded_chunks.insert(index);
		self.save_session(&session).await?;

		if session.is_complete() {
			match self.finalize_server_staged(&session).await {
				Ok(file_id) => Ok(ChunkUploadOutcome::Finalized { file_id }),
				Err(e) => {
					let _ = tokio::fs::remove_dir_all(&dir).await;
					Err(e)
				}
			}
		} else {
			Ok(ChunkUploadOutcome::Pending)
		}
	}

	async fn finalize_server_staged(&self, session: &UploadSession) -> Result<i64> {
		let policy = self.policies.get_by_id(session.policy_id).await?;
		let dir = self.upload_temp_dir.join(session.session_id.to_string());
		let merged = concatenate_chunks(&dir, session.total_chunks()).await?;

		let driver = self.drivers.get(policy.policy_type)?;
		let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(std::io::Cursor::new(merged));
		let result = driver.upload(&policy, &session.uri, reader, Some(session.file_size)).await?;

		let (parent_vpath, leaf_name) = split_leaf(&session.uri);
		let owner_id = session.owner_id;
		let temp_entity_id = session.temp_entity_id;
		let file_id = {
			let policy = policy.clone();
			let result = result.clone();
			let leaf_name = leaf_name.clone();
			self.txm
				.with_transaction(move |txn| {
					Box::pin(async move {
						entity_repo::finalize(txn, temp_entity_id, result.source, result.size as i64, result.mime_type, result.dimension, None).await?;
						let parent = find_or_create_parent(txn, owner_id, &policy, &parent_vpath).await?;
						let existing = file_repo::find_by_parent_and_name(txn, Some(parent.id), &leaf_name, owner_id).await?;
						let is_new = existing.is_none();
						let file = upsert_file(txn, parent.id, owner_id, &leaf_name, temp_entity_id, result.size as i64).await?;
						if is_new {
							file_repo::adjust_children_count(txn, parent.id, 1).await?;
						}
						version_repo::set_current(txn, file.id, temp_entity_id, owner_id).await?;
						Ok::<_, AppError>(file.id)
					})
				})
				.await?
		};

		tokio::fs::remove_dir_all(&dir).await.ok();
		self.delete_session(session.session_id).await;
		if file_type::is_thumbnailable(&leaf_name) {
			self.events.publish(Event::FileCreated { file_id, owner_id });
		}
		Ok(file_id)
	}

	/// Called once the caller's own PUT/POST to a presigned URL succeeds.
	pub async fn finalize_client_direct(&self, owner_id: i64, policy_id: i64, virtual_path: &str, size: u64) -> Result<i64> {
		let policy = self.policies.get_by_id(policy_id).await?;
		let driver = self.drivers.get(policy.policy_type)?;
		let source = crate::provider::object_key_for_virtual_path(&policy, virtual_path);
		if !driver.is_exist(&policy, &source).await? {
			return Err(UploadError::ObjectNotFound(source).into());
		}

		let (parent_vpath, leaf_name) = split_leaf(virtual_path);
		let file_id = {
			let policy = policy.clone();
			let source = source.clone();
			let leaf_name = leaf_name.clone();
			self.txm
				.with_transaction(move |txn| {
					Box::pin(async move {
						let now = Utc::now();
						let entity_active = file_storage_entity::ActiveModel {
							id: sea_orm::ActiveValue::NotSet,
							policy_id: Set(policy.id),
							source: Set(source),
							size: Set(size as i64),
							mime_type: Set(None),
							dimension: Set(None),
							etag: Set(None),
							upload_session_id: Set(None),
							storage_metadata: Set(None),
							created_by: Set(owner_id),
							created_at: Set(now),
							updated_at: Set(now),
						};
						let entity = entity_repo::insert(txn, entity_active).await?;
						let parent = find_or_create_parent(txn, owner_id, &policy, &parent_vpath).await?;
						let existing = file_repo::find_by_parent_and_name(txn, Some(parent.id), &leaf_name, owner_id).await?;
						let is_new = existing.is_none();
						let file = upsert_file(txn, parent.id, owner_id, &leaf_name, entity.id, size as i64).await?;
						if is_new {
							file_repo::adjust_children_count(txn, parent.id, 1).await?;
						}
						version_repo::set_current(txn, file.id, entity.id, owner_id).await?;
						Ok::<_, AppError>(file.id)
					})
				})
				.await?
		};

		if file_type::is_thumbnailable(&leaf_name) {
			self.events.publish(Event::FileCreated { file_id, owner_id });
		}
		Ok(file_id)
	}

	pub async fn cancel_session(&self, owner_id: i64, session_id: Uuid) -> Result<()> {
		let session = self.load_session(session_id).await?;
		if session.owner_id != owner_id {
			return Err(AppError::Forbidden(format!("upload session {session_id} not owned by {owner_id}")));
		}
		let dir = self.upload_temp_dir.join(session_id.to_string());
		let _ = tokio::fs::remove_dir_all(&dir).await;
		entity_repo::hard_delete(self.txm.conn(), session.temp_entity_id).await?;
		self.delete_session(session_id).await;
		Ok(())
	}

	pub async fn session_status(&self, session_id: Uuid) -> Result<SessionStatus> {
		let session = self.load_session(session_id).await?;
		Ok(SessionStatus {
			session_id,
			chunk_size: session.chunk_size,
			total_chunks: session.total_chunks(),
			uploaded_chunks: session.uploaded_chunks.iter().copied().collect(),
			expires_at: session.expire_at,
			is_valid: !session.is_expired(Utc::now()),
		})
	}

	async fn load_session(&self, session_id: Uuid) -> Result<UploadSession> {
		let raw = self
			.cache
			.get(&UploadSession::cache_key(session_id))
			.await
			.ok_or(UploadError::SessionNotFound)?;
		serde_json::from_str(&raw).map_err(|e| AppError::from(anyhow::Error::from(e)))
	}

	async fn save_session(&self, session: &UploadSession) -> Result<()> {
		let json = serde_json::to_string(session).map_err(|e| AppError::from(anyhow::Error::from(e)))?;
		let ttl = std::time::Duration::from_secs(SESSION_TTL_HOURS as u64 * 3600);
		self.cache.set(&UploadSession::cache_key(session.session_id), json, ttl).await;
		Ok(())
	}

	async fn delete_session(&self, session_id: Uuid) {
		self.cache.delete(&UploadSession::cache_key(session_id)).await;
	}
}

async fn upsert_file<C: ConnectionTrait>(txn: &C, parent_id: i64, owner_id: i64, name: &str, entity_id: i64, size: i64) -> Result<file::Model> {
	let now = Utc::now();
	let file = file_repo::create_or_update(
		txn,
		Some(parent_id),
		owner_id,
		name,
		|| file::ActiveModel {
			id: sea_orm::ActiveValue::NotSet,
			owner_id: Set(owner_id),
			parent_id: Set(Some(parent_id)),
			name: Set(name.to_string()),
			file_type: Set(0),
			size: Set(size),
			primary_entity_id: Set(Some(entity_id)),
			children_count: Set(0),
			view_config: Set(None),
			created_at: Set(now),
			updated_at: Set(now),
			deleted_at: Set(None),
		},
		|existing| {
			let mut active: file::ActiveModel = existing.into();
			active.primary_entity_id = Set(Some(entity_id));
			active.size = Set(size);
			active.updated_at = Set(now);
			active
		},
	)
	.await?;
	Ok(file)
}

async fn find_or_create_parent<C: ConnectionTrait>(txn: &C, owner_id: i64, policy: &StoragePolicy, virtual_path: &str) -> Result<file::Model> {
	if virtual_path == policy.virtual_path {
		return file_repo::find_by_id(txn, policy.node_id)
			.await?
			.ok_or_else(|| AppError::NotFound(format!("mount directory {}", policy.node_id)));
	}
	let relative = crate::path::strip_prefix(virtual_path, &policy.virtual_path);
	let mut current = file_repo::find_by_id(txn, policy.node_id)
		.await?
		.ok_or_else(|| AppError::NotFound(format!("mount directory {}", policy.node_id)))?;
	for segment in relative.split('/').filter(|s| !s.is_empty()) {
		current = crate::policy::ensure_child_dir(txn, current.id, owner_id, segment).await?;
	}
	Ok(current)
}

async fn concatenate_chunks(dir: &std::path::Path, total: u32) -> Result<Vec<u8>> {
	let mut merged = Vec::new();
	for index in 0..total {
		let chunk_path = dir.join(index.to_string());
		let mut file = tokio::fs::File::open(&chunk_path).await.map_err(UploadError::Io)?;
		file.read_to_end(&mut merged).await.map_err(UploadError::Io)?;
	}
	Ok(merged)
}

fn split_leaf(path: &str) -> (String, String) {
	match path.rsplit_once('/') {
		Some((parent, leaf)) if parent.is_empty() => ("/".to_string(), leaf.to_string()),
		Some((parent, leaf)) => (parent.to_string(), leaf.to_string()),
		None => ("/".to_string(), path.to_string()),
	}
}

fn extension_of(name: &str) -> String {
	match name.rsplit_once('.') {
		Some((_, ext)) if ext != name => ext.to_ascii_lowercase(),
		_ => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn split_leaf_handles_first_level_and_nested() {
		assert_eq!(split_leaf("/local/a.txt"), ("/local".to_string(), "a.txt".to_string()));
		assert_eq!(split_leaf("/local/sub/a.txt"), ("/local/sub".to_string(), "a.txt".to_string()));
	}

	#[test]
	fn extension_of_lowercases_and_handles_missing() {
		assert_eq!(extension_of("photo.JPG"), "jpg");
		assert_eq!(extension_of("noext"), "");
	}
}
