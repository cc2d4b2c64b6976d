//! Move and rename. Both are a `parent_id`/`name` update on one File row;
//! a rename is just a move with an unchanged parent.

use crate::domain::storage_policy::StoragePolicy;
use crate::error::{AppError, Result};
use crate::infrastructure::database::repository::{entity_repo, file_repo, policy_repo};
use crate::provider::registry::DriverRegistry;
use crate::vfs::VfsResolver;
use sea_orm::ConnectionTrait;

/// Moves `source_id` to be a child of `dest_parent_id`. Same-destination is
/// a silent no-op; cross-policy moves are rejected; moving into one's own
/// subtree is rejected.
pub async fn move_file<C: ConnectionTrait>(
	txn: &C,
	drivers: &DriverRegistry,
	resolver: &VfsResolver<'_>,
	owner_id: i64,
	source_id: i64,
	dest_parent_id: i64,
	source_virtual_path: &str,
	dest_parent_virtual_path: &str,
) -> Result<()> {
	let source = file_repo::find_by_id(txn, source_id)
		.await?
		.ok_or_else(|| AppError::NotFound(format!("file {source_id}")))?;
	if source.owner_id != owner_id {
		return Err(AppError::Forbidden(format!("file {source_id} not owned by {owner_id}")));
	}
	if source.parent_id.is_none() {
		return Err(AppError::Forbidden("the root directory cannot be moved".into()));
	}
	if source.parent_id == Some(dest_parent_id) {
		return Ok(());
	}
	if source_id == dest_parent_id || file_repo::is_descendant(txn, source_id, dest_parent_id).await? {
		return Err(AppError::InvalidOperation("cannot move a directory into itself or a descendant".into()));
	}
	if file_repo::find_by_parent_and_name(txn, Some(dest_parent_id), &source.name, owner_id)
		.await?
		.is_some()
	{
		return Err(AppError::Conflict(format!("{:?} already exists at destination", source.name)));
	}

	resolver.require_same_policy(source_virtual_path, dest_parent_virtual_path).await?;

	if let Some(entity_id) = source.primary_entity_id {
		rename_physical(txn, drivers, entity_id, source_virtual_path, dest_parent_virtual_path, &source.name).await?;
	}

	file_repo::update_parent(txn, source_id, dest_parent_id).await?;
	file_repo::adjust_children_count(txn, dest_parent_id, 1).await?;
	if let Some(old_parent_id) = source.parent_id {
		file_repo::adjust_children_count(txn, old_parent_id, -1).await?;
	}
	Ok(())
}

/// Renames the leaf of `source_id` to `new_name`. Disallows `/`; no-op if
/// unchanged.
pub async fn rename_file<C: ConnectionTrait>(
	txn: &C,
	drivers: &DriverRegistry,
	owner_id: i64,
	source_id: i64,
	source_virtual_path: &str,
	new_name: &str,
) -> Result<()> {
	if new_name.contains('/') {
		return Err(AppError::InvalidOperation("new name may not contain '/'".into()));
	}
	let source = file_repo::find_by_id(txn, source_id)
		.await?
		.ok_or_else(|| AppError::NotFound(format!("file {source_id}")))?;
	if source.owner_id != owner_id {
		return Err(AppError::Forbidden(format!("file {source_id} not owned by {owner_id}")));
	}
	if source.name == new_name {
		return Ok(());
	}
	if file_repo::find_by_parent_and_name(txn, source.parent_id, new_name, owner_id).await?.is_some() {
		return Err(AppError::Conflict(format!("{new_name:?} already exists")));
	}

	if let Some(entity_id) = source.primary_entity_id {
		let parent_vpath = match source_virtual_path.rsplit_once('/') {
			Some((parent, _)) if parent.is_empty() => "/".to_string(),
			Some((parent, _)) => parent.to_string(),
			None => "/".to_string(),
		};
		rename_physical(txn, drivers, entity_id, source_virtual_path, &parent_vpath, new_name).await?;
	}

	file_repo::rename(txn, source_id, new_name).await?;
	Ok(())
}

async fn rename_physical<C: ConnectionTrait>(
	txn: &C,
	drivers: &DriverRegistry,
	entity_id: i64,
	old_virtual_path: &str,
	new_parent_virtual_path: &str,
	new_name: &str,
) -> Result<()> {
	let entity = entity_repo::find_by_id(txn, entity_id)
		.await?
		.ok_or_else(|| AppError::NotFound(format!("entity {entity_id}")))?;
	let policy_model = policy_repo::find_by_id(txn, entity.policy_id)
		.await?
		.ok_or_else(|| AppError::PolicyNotFound(entity.policy_id.to_string()))?;
	let policy: StoragePolicy = crate::policy::to_domain(policy_model)?;
	let driver = drivers.get(policy.policy_type)?;

	let new_virtual_path = if new_parent_virtual_path == "/" {
		format!("/{new_name}")
	} else {
		format!("{new_parent_virtual_path}/{new_name}")
	};
	driver.rename(&policy, old_virtual_path, &new_virtual_path).await?;

	let new_source = crate::provider::object_key_for_virtual_path(&policy, &new_virtual_path);
	entity_repo::finalize(
		txn,
		entity_id,
		new_source,
		entity.size,
		entity.mime_type.clone(),
		entity.dimension.clone(),
		entity.etag.clone(),
	)
	.await?;
	Ok(())
}
