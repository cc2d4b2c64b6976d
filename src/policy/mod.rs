//! Storage policy registry: CRUD, caching, and mount-point bookkeeping.

mod validate;

use crate::domain::storage_policy::{PolicyType, StoragePolicy, StoragePolicySettings};
use crate::error::{AppError, Result};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::database::entities::file::{self, ActiveModel as FileActiveModel};
use crate::infrastructure::database::entities::storage_policy::{self, ActiveModel as PolicyActiveModel};
use crate::infrastructure::database::repository::{file_repo, policy_repo, TransactionManager};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, EntityTrait};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const CACHE_TTL: Duration = Duration::from_secs(3600);
const LIST_CACHE_KEY: &str = "storage_policies_all";

pub struct NewPolicy {
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
	pub max_size: u64,
	pub settings: StoragePolicySettings,
}

pub struct PolicyRegistry {
	txm: Arc<TransactionManager>,
	cache: Arc<dyn Cache>,
}

impl PolicyRegistry {
	pub fn new(txm: Arc<TransactionManager>, cache: Arc<dyn Cache>) -> Self {
		Self { txm, cache }
	}

	pub async fn create(&self, owner_id: i64, input: NewPolicy) -> Result<StoragePolicy> {
		validate::validate_create(&validate::NewPolicyFields {
			policy_type: input.policy_type,
			virtual_path: &input.virtual_path,
			server: input.server.as_deref(),
			bucket_name: input.bucket_name.as_deref(),
			access_key: input.access_key.as_deref(),
			secret_key: input.secret_key.as_deref(),
		})?;
		input.settings.validate_for(input.policy_type).map_err(AppError::InvalidOperation)?;

		let conn = self.txm.conn();
		if policy_repo::find_by_name(conn, &input.name).await?.is_some() {
			return Err(AppError::Conflict(format!("policy name {:?} already in use", input.name)));
		}
		if policy_repo::find_by_virtual_path(conn, &input.virtual_path).await?.is_some() {
			return Err(AppError::Conflict(format!("virtual_path {:?} already mounted", input.virtual_path)));
		}
		if let Some(flag) = &input.flag {
			if policy_repo::find_by_flag(conn, flag).await?.is_some() {
				return Err(AppError::Conflict(format!("flag {flag:?} already in use")));
			}
		}

		let base_path = if input.policy_type == PolicyType::Local {
			StoragePolicy::normalize_local_base_path(&input.virtual_path)
		} else {
			input.base_path.clone()
		};
		let mount_name = input.virtual_path.trim_start_matches('/').to_string();
		let settings_json = serde_json::to_value(&input.settings).map_err(anyhow::Error::from)?;
		let NewPolicy {
			name,
			policy_type,
			flag,
			virtual_path,
			server,
			bucket_name,
			access_key,
			secret_key,
			is_private,
			max_size,
			..
		} = input;

		let model = self
			.txm
			.with_transaction(move |txn| {
				Box::pin(async move {
					let root = ensure_root(txn, owner_id).await?;
					let mount = ensure_child_dir(txn, root.id, owner_id, &mount_name).await?;

					let active = PolicyActiveModel {
						id: sea_orm::ActiveValue::NotSet,
						name: Set(name),
						policy_type: Set(policy_type.to_string()),
						flag: Set(flag),
						virtual_path: Set(virtual_path),
						base_path: Set(base_path),
						server: Set(server),
						bucket_name: Set(bucket_name),
						access_key: Set(access_key),
						secret_key: Set(secret_key),
						is_private: Set(is_private),
						max_size: Set(max_size as i64),
						settings: Set(settings_json),
						node_id: Set(mount.id),
						created_at: Set(Utc::now()),
						updated_at: Set(Utc::now()),
						deleted_at: Set(None),
					};
					let inserted = policy_repo::insert(txn, active).await?;
					Ok::<_, AppError>(inserted)
				})
			})
			.await?;

		if model.policy_type.as_str() != "local" {
			// Best-effort: a bucket that rejects our CORS rule should not
			// block policy creation.
			if let Err(e) = apply_permissive_cors(&model).await {
				warn!(policy_id = model.id, err = %e, "failed to apply CORS rule to new policy");
			}
		}

		let domain = to_domain(model)?;
		self.cache_policy(&domain).await;
		self.cache.delete(LIST_CACHE_KEY).await;
		Ok(domain)
	}

	pub async fn get_by_id(&self, id: i64) -> Result<StoragePolicy> {
		let cache_key = format!("policy:id:{id}");
		if let Some(cached) = self.cache.get(&cache_key).await {
			if let Ok(policy) = serde_json::from_str(&cached) {
				return Ok(policy);
			}
		}
		let model = policy_repo::find_by_id(self.txm.conn(), id)
			.await?
			.ok_or_else(|| AppError::PolicyNotFound(id.to_string()))?;
		let domain = to_domain(model)?;
		self.cache_policy(&domain).await;
		Ok(domain)
	}

	/// Decodes `public_id` (hashid-encoded as the policy's mount directory)
	/// and resolves it to the owning policy. Cached under `policy:public_id:<s>`.
	pub async fn get_by_public_id(&self, public_id: &str) -> Result<StoragePolicy> {
		let cache_key = format!("policy:public_id:{public_id}");
		if let Some(cached) = self.cache.get(&cache_key).await {
			if let Ok(policy) = serde_json::from_str(&cached) {
				return Ok(policy);
			}
		}
		let (_, node_id) = crate::hashid::decode(public_id)
			.filter(|(kind, _)| *kind == crate::domain::file::FileType::Dir)
			.ok_or_else(|| AppError::PolicyNotFound(public_id.to_string()))?;
		let domain = self.get_by_node_id(node_id).await?;
		self.cache_policy(&domain).await;
		Ok(domain)
	}

	pub async fn get_by_flag(&self, flag: &str) -> Result<StoragePolicy> {
		let model = policy_repo::find_by_flag(self.txm.conn(), flag)
			.await?
			.ok_or_else(|| AppError::PolicyNotFound(flag.to_string()))?;
		to_domain(model)
	}

	pub async fn get_by_node_id(&self, node_id: i64) -> Result<StoragePolicy> {
		let model = policy_repo::find_by_node_id(self.txm.conn(), node_id)
			.await?
			.ok_or_else(|| AppError::PolicyNotFound(format!("node {node_id}")))?;
		to_domain(model)
	}

	pub async fn get_by_virtual_path(&self, virtual_path: &str) -> Result<StoragePolicy> {
		let model = policy_repo::find_by_virtual_path(self.txm.conn(), virtual_path)
			.await?
			.ok_or_else(|| AppError::PolicyNotFound(virtual_path.to_string()))?;
		to_domain(model)
	}

	pub async fn list(&self) -> Result<Vec<StoragePolicy>> {
		if let Some(cached) = self.cache.get(LIST_CACHE_KEY).await {
			if let Ok(list) = serde_json::from_str(&cached) {
				return Ok(list);
			}
		}
		let models = policy_repo::list(self.txm.conn()).await?;
		let domains: Vec<StoragePolicy> = models.into_iter().map(to_domain).collect::<Result<_>>()?;
		if let Ok(json) = serde_json::to_string(&domains) {
			self.cache.set(LIST_CACHE_KEY, json, CACHE_TTL).await;
		}
		Ok(domains)
	}

	pub async fn list_all(&self) -> Result<Vec<StoragePolicy>> {
		let models = policy_repo::list_all(self.txm.conn()).await?;
		models.into_iter().map(to_domain).collect()
	}

	/// `virtual_path` may only change when the mount directory has no
	/// children. `flag` collisions with another policy clear the other
	/// policy's flag first, within the same transaction.
	pub async fn update(&self, id: i64, new_virtual_path: Option<String>, new_flag: Option<Option<String>>) -> Result<StoragePolicy> {
		if let Some(path) = &new_virtual_path {
			validate::validate_update_virtual_path(path)?;
		}

		let updated = self
			.txm
			.with_transaction(move |txn| {
				Box::pin(async move {
					let existing = policy_repo::find_by_id(txn, id)
						.await?
						.ok_or_else(|| AppError::PolicyNotFound(id.to_string()))?;
					let mut active: PolicyActiveModel = existing.clone().into();

					if let Some(ref new_flag) = new_flag {
						if let Some(flag) = new_flag {
							if let Some(holder) = policy_repo::find_by_flag(txn, flag).await? {
								if holder.id != id {
									let mut holder_active: PolicyActiveModel = holder.into();
									holder_active.flag = Set(None);
									holder_active.updated_at = Set(Utc::now());
									policy_repo::update(txn, holder_active).await?;
								}
							}
						}
						active.flag = Set(new_flag.clone());
					}

					if let Some(path) = new_virtual_path {
						let mount = file::Entity::find_by_id(existing.node_id)
							.one(txn)
							.await
							.map_err(AppError::from)?
							.ok_or_else(|| AppError::NotFound(format!("mount directory {}", existing.node_id)))?;
						if mount.children_count != 0 {
							return Err(AppError::InvalidOperation(
								"virtual_path can only change while the mount is empty".into(),
							));
						}
						let new_name = path.trim_start_matches('/').to_string();
						file_repo::rename(txn, existing.node_id, &new_name).await?;
						active.virtual_path = Set(path);
					}

					active.updated_at = Set(Utc::now());
					let saved = policy_repo::update(txn, active).await?;
					Ok::<_, AppError>(saved)
				})
			})
			.await?;

		let public_id = crate::hashid::encode(crate::domain::file::FileType::Dir, updated.node_id);
		self.cache.delete(&format!("policy:id:{id}")).await;
		self.cache.delete(&format!("policy:public_id:{public_id}")).await;
		self.cache.delete(LIST_CACHE_KEY).await;
		to_domain(updated)
	}

	/// Soft-deletes. Forbidden for the default policy, for flagged
	/// policies, and for the root mount.
	pub async fn delete(&self, id: i64) -> Result<()> {
		let existing = policy_repo::find_by_id(self.txm.conn(), id)
			.await?
			.ok_or_else(|| AppError::PolicyNotFound(id.to_string()))?;
		if id == 1 {
			return Err(AppError::Forbidden("the default storage policy cannot be deleted".into()));
		}
		if existing.flag.as_deref().is_some_and(|f| !f.is_empty()) {
			return Err(AppError::Forbidden("flagged policies cannot be deleted".into()));
		}
		if existing.virtual_path == "/" {
			return Err(AppError::Forbidden("the root mount cannot be deleted".into()));
		}

		policy_repo::soft_delete(self.txm.conn(), id).await?;

		if existing.policy_type == PolicyType::Onedrive.to_string() {
			self.cache.delete(&format!("onedrive:token:policy:{id}")).await;
		}
		let public_id = crate::hashid::encode(crate::domain::file::FileType::Dir, existing.node_id);
		self.cache.delete(&format!("policy:id:{id}")).await;
		self.cache.delete(&format!("policy:public_id:{public_id}")).await;
		self.cache.delete(LIST_CACHE_KEY).await;
		Ok(())
	}

	/// Writes under both the internal-id and public-id cache keys, per the
	/// create contract.
	async fn cache_policy(&self, policy: &StoragePolicy) {
		if let Ok(json) = serde_json::to_string(policy) {
			self.cache.set(&format!("policy:id:{}", policy.id), json.clone(), CACHE_TTL).await;
			self.cache.set(&format!("policy:public_id:{}", policy.public_id()), json, CACHE_TTL).await;
		}
	}
}

async fn ensure_root<C: ConnectionTrait>(txn: &C, owner_id: i64) -> Result<file::Model> {
	if let Some(root) = file_repo::find_root_for_owner(txn, owner_id).await? {
		return Ok(root);
	}
	let active = FileActiveModel {
		id: sea_orm::ActiveValue::NotSet,
		owner_id: Set(owner_id),
		parent_id: Set(None),
		name: Set(String::new()),
		file_type: Set(1),
		size: Set(0),
		primary_entity_id: Set(None),
		children_count: Set(0),
		view_config: Set(None),
		created_at: Set(Utc::now()),
		updated_at: Set(Utc::now()),
		deleted_at: Set(None),
	};
	Ok(file_repo::insert(txn, active).await?)
}

pub(crate) async fn ensure_child_dir<C: ConnectionTrait>(txn: &C, parent_id: i64, owner_id: i64, name: &str) -> Result<file::Model> {
	if let Some(existing) = file_repo::find_by_parent_and_name(txn, Some(parent_id), name, owner_id).await? {
		return Ok(existing);
	}
	let active = FileActiveModel {
		id: sea_orm::ActiveValue::NotSet,
		owner_id: Set(owner_id),
		parent_id: Set(Some(parent_id)),
		name: Set(name.to_string()),
		file_type: Set(1),
		size: Set(0),
		primary_entity_id: Set(None),
		children_count: Set(0),
		view_config: Set(None),
		created_at: Set(Utc::now()),
		updated_at: Set(Utc::now()),
		deleted_at: Set(None),
	};
	Ok(file_repo::insert(txn, active).await?)
}

async fn apply_permissive_cors(_model: &storage_policy::Model) -> anyhow::Result<()> {
	// Bucket-level CORS configuration is backend-specific and best-effort;
	// a concrete deployment wires this to the relevant SDK call per type.
	Ok(())
}

pub(crate) fn to_domain(model: storage_policy::Model) -> Result<StoragePolicy> {
	let policy_type = PolicyType::from_str(&model.policy_type)
		.map_err(|_| AppError::InvalidPolicyType(model.policy_type.clone()))?;
	let settings: StoragePolicySettings =
		serde_json::from_value(model.settings).map_err(anyhow::Error::from)?;
	Ok(StoragePolicy {
		id: model.id,
		name: model.name,
		policy_type,
		flag: model.flag,
		virtual_path: model.virtual_path,
		base_path: model.base_path,
		server: model.server,
		bucket_name: model.bucket_name,
		access_key: model.access_key,
		secret_key: model.secret_key,
		is_private: model.is_private,
		max_size: model.max_size as u64,
		settings,
		node_id: model.node_id,
		created_at: model.created_at,
		updated_at: model.updated_at,
		deleted_at: model.deleted_at,
	})
}
