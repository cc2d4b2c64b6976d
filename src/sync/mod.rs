//! Sync engine: makes the database truthfully reflect a backend's listing
//! of a single directory, idempotently. Deletions always run before
//! insertions within one call; the per-path lock (`lock::PathLocker`)
//! serializes calls for the same virtual path but not across paths.

pub mod batch;

use crate::domain::storage_policy::StoragePolicy;
use crate::error::{AppError, Result};
use crate::file_type;
use crate::infrastructure::database::entities::{file, file_storage_entity};
use crate::infrastructure::database::repository::{file_repo, version_repo, TransactionManager};
use crate::infrastructure::events::{Event, EventBus};
use crate::ops;
use crate::policy::PolicyRegistry;
use crate::provider::registry::DriverRegistry;
use crate::provider::{self, DriverError, ListedEntry};
use batch::calculate_batch_size;
use chrono::Utc;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const CREATED_EVENT_DELAY: Duration = Duration::from_secs(2);

pub struct SyncEngine {
	txm: Arc<TransactionManager>,
	drivers: Arc<DriverRegistry>,
	policies: Arc<PolicyRegistry>,
	events: Arc<EventBus>,
}

impl SyncEngine {
	pub fn new(txm: Arc<TransactionManager>, drivers: Arc<DriverRegistry>, policies: Arc<PolicyRegistry>, events: Arc<EventBus>) -> Self {
		Self { txm, drivers, policies, events }
	}

	pub async fn sync_directory(&self, owner_id: i64, policy: &StoragePolicy, virtual_path: &str) -> Result<()> {
		let virtual_path = crate::path::normalize(virtual_path);
		let driver = self.drivers.get(policy.policy_type)?;

		let listing = match driver.list(policy, &virtual_path).await {
			Ok(l) => l,
			Err(DriverError::NotFound(_)) if virtual_path == policy.virtual_path => {
				if let Err(e) = driver.create_directory(policy, &virtual_path).await {
					warn!(policy_id = policy.id, err = %e, "sync: root recreate failed, skipping");
					return Ok(());
				}
				match driver.list(policy, &virtual_path).await {
					Ok(l) => l,
					Err(e) => {
						warn!(policy_id = policy.id, err = %e, "sync: listing still failing after recreate, skipping");
						return Ok(());
					}
				}
			}
			Err(e) => {
				warn!(policy_id = policy.id, err = %e, "sync: listing failed, skipping");
				return Ok(());
			}
		};

		let physical: HashMap<String, ListedEntry> = listing
			.into_iter()
			.filter(|e| !e.name.starts_with('.'))
			.map(|e| (e.name.clone(), e))
			.collect();

		let all_policies = self.policies.list().await?;
		let (parent, exclusions) = {
			let owner_id = owner_id;
			let policy = policy.clone();
			let virtual_path = virtual_path.clone();
			self.txm
				.with_transaction(move |txn| {
					Box::pin(async move {
						let parent = find_or_create_parent_folder(txn, owner_id, &policy, &virtual_path).await?;
						let mut exclusions = HashSet::new();
						for other in &all_policies {
							if other.id == policy.id {
								continue;
							}
							if parent_virtual_path(&other.virtual_path) == virtual_path {
								let name = other.virtual_path.trim_start_matches('/').to_string();
								find_or_create_dir(txn, parent.id, owner_id, &name).await?;
								exclusions.insert(name);
							}
						}
						Ok::<_, AppError>((parent, exclusions))
					})
				})
				.await?
		};

		let conn = self.txm.conn();
		let db_children = file_repo::find_by_parent_unscoped(conn, parent.id, owner_id).await?;

		for child in &db_children {
			if physical.contains_key(&child.name) || exclusions.contains(&child.name) {
				continue;
			}
			if child.file_type == 0 && child.primary_entity_id.is_none() {
				continue; // empty file, never reaped
			}
			let drivers = self.drivers.clone();
			let node_id = child.id;
			let result = self
				.txm
				.with_transaction(move |txn| Box::pin(async move { ops::delete::hard_delete_recursively(txn, &drivers, owner_id, node_id).await }))
				.await;
			if let Err(e) = result {
				warn!(file_id = node_id, err = %e, "sync: deletion pass failed for one child, continuing");
			}
		}

		let existing_after_deletes: HashSet<String> = file_repo::find_by_parent_unscoped(conn, parent.id, owner_id)
			.await?
			.into_iter()
			.map(|c| c.name)
			.collect();
		let to_create: Vec<ListedEntry> = physical
			.into_values()
			.filter(|entry| !existing_after_deletes.contains(&entry.name))
			.collect();

		let batch_size = calculate_batch_size(to_create.len());
		for batch in to_create.chunks(batch_size) {
			let batch = batch.to_vec();
			let policy = policy.clone();
			let virtual_path = virtual_path.clone();
			let parent_id = parent.id;
			let result = self
				.txm
				.with_transaction(move |txn| {
					Box::pin(async move {
						let mut created = Vec::new();
						for entry in &batch {
							let child_vpath = join_virtual(&virtual_path, &entry.name);
							if entry.is_dir {
								find_or_create_dir(txn, parent_id, owner_id, &entry.name).await?;
							} else {
								let file_id = create_file_from_listing(txn, owner_id, &policy, parent_id, entry, &child_vpath).await?;
								if file_type::is_thumbnailable(&entry.name) {
									created.push(file_id);
								}
							}
						}
						Ok::<_, AppError>(created)
					})
				})
				.await;
			match result {
				Ok(created_ids) => {
					for file_id in created_ids {
						self.events.publish_delayed(Event::FileCreated { file_id, owner_id }, CREATED_EVENT_DELAY);
					}
				}
				Err(e) => warn!(policy_id = policy.id, err = %e, "sync: creation batch failed, continuing with next batch"),
			}
		}

		Ok(())
	}
}

fn join_virtual(dir: &str, name: &str) -> String {
	if dir == "/" {
		format!("/{name}")
	} else {
		format!("{dir}/{name}")
	}
}

fn parent_virtual_path(p: &str) -> String {
	let trimmed = p.trim_end_matches('/');
	match trimmed.rsplit_once('/') {
		Some((parent, _)) if parent.is_empty() => "/".to_string(),
		Some((parent, _)) => parent.to_string(),
		None => "/".to_string(),
	}
}

async fn find_or_create_parent_folder<C: ConnectionTrait>(
	txn: &C,
	owner_id: i64,
	policy: &StoragePolicy,
	virtual_path: &str,
) -> Result<file::Model> {
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
		current = find_or_create_dir(txn, current.id, owner_id, segment).await?;
	}
	Ok(current)
}

async fn find_or_create_dir<C: ConnectionTrait>(txn: &C, parent_id: i64, owner_id: i64, name: &str) -> Result<file::Model> {
	if let Some(existing) = file_repo::find_by_parent_and_name(txn, Some(parent_id), name, owner_id).await? {
		return Ok(existing);
	}
	let now = Utc::now();
	let active = file::ActiveModel {
		id: sea_orm::ActiveValue::NotSet,
		owner_id: Set(owner_id),
		parent_id: Set(Some(parent_id)),
		name: Set(name.to_string()),
		file_type: Set(1),
		size: Set(0),
		primary_entity_id: Set(None),
		children_count: Set(0),
		view_config: Set(None),
		created_at: Set(now),
		updated_at: Set(now),
		deleted_at: Set(None),
	};
	let inserted = file_repo::insert(txn, active).await?;
	file_repo::adjust_children_count(txn, parent_id, 1).await?;
	Ok(inserted)
}

async fn create_file_from_listing<C: ConnectionTrait>(
	txn: &C,
	owner_id: i64,
	policy: &StoragePolicy,
	parent_id: i64,
	entry: &ListedEntry,
	child_vpath: &str,
) -> Result<i64> {
	let source = provider::object_key_for_virtual_path(policy, child_vpath);
	let entity_active = file_storage_entity::ActiveModel {
		id: sea_orm::ActiveValue::NotSet,
		policy_id: Set(policy.id),
		source: Set(source),
		size: Set(entry.size as i64),
		mime_type: Set(None),
		dimension: Set(None),
		etag: Set(None),
		upload_session_id: Set(None),
		storage_metadata: Set(None),
		created_by: Set(owner_id),
		created_at: Set(entry.mtime),
		updated_at: Set(entry.mtime),
	};
	let entity = crate::infrastructure::database::repository::entity_repo::insert(txn, entity_active).await?;

	let file_active = file::ActiveModel {
		id: sea_orm::ActiveValue::NotSet,
		owner_id: Set(owner_id),
		parent_id: Set(Some(parent_id)),
		name: Set(entry.name.clone()),
		file_type: Set(0),
		size: Set(entry.size as i64),
		primary_entity_id: Set(Some(entity.id)),
		children_count: Set(0),
		view_config: Set(None),
		created_at: Set(entry.mtime),
		updated_at: Set(entry.mtime),
		deleted_at: Set(None),
	};
	let file = file_repo::insert(txn, file_active).await?;
	version_repo::set_current(txn, file.id, entity.id, owner_id).await?;
	file_repo::adjust_children_count(txn, parent_id, 1).await?;
	Ok(file.id)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn join_virtual_handles_root() {
		assert_eq!(join_virtual("/", "a.txt"), "/a.txt");
		assert_eq!(join_virtual("/local/sub", "a.txt"), "/local/sub/a.txt");
	}

	#[test]
	fn parent_virtual_path_of_first_level_mount_is_root() {
		assert_eq!(parent_virtual_path("/local"), "/");
		assert_eq!(parent_virtual_path("/local/sub"), "/local");
	}
}
