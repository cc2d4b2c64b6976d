//! Recursive hard-delete. Depth-first: a Dir's children go before the Dir
//! itself, so a crash mid-delete never leaves an orphaned child pointing at
//! a parent that no longer exists.

use crate::error::{AppError, Result};
use crate::infrastructure::database::repository::{direct_link_repo, entity_repo, file_repo, metadata_repo, policy_repo, version_repo};
use crate::provider::registry::DriverRegistry;
use futures::future::BoxFuture;
use sea_orm::ConnectionTrait;
use tracing::warn;

/// Deletes `node_id` and, if it is a Dir, everything under it. Ownership
/// and mount-point protection are the caller's responsibility — this is
/// the primitive both the sync engine's deletion pass and the user-facing
/// delete operation share.
pub fn hard_delete_recursively<'a, C: ConnectionTrait + Sync>(
	txn: &'a C,
	drivers: &'a DriverRegistry,
	owner_id: i64,
	node_id: i64,
) -> BoxFuture<'a, Result<()>> {
	Box::pin(async move {
		let Some(node) = file_repo::find_by_id(txn, node_id).await? else {
			return Ok(());
		};

		if node.file_type == 1 {
			let children = file_repo::find_by_parent_unscoped(txn, node.id, owner_id).await?;
			for child in children {
				hard_delete_recursively(txn, drivers, owner_id, child.id).await?;
			}
		} else if let Some(entity_id) = node.primary_entity_id {
			delete_physical_entity(txn, drivers, entity_id).await?;
		}

		metadata_repo::delete_by_file_id(txn, node.id).await?;
		direct_link_repo::delete_by_file_id(txn, node.id).await?;
		version_repo::delete_by_file_id(txn, node.id).await?;
		file_repo::hard_delete(txn, node.id).await?;
		if let Some(parent_id) = node.parent_id {
			file_repo::adjust_children_count(txn, parent_id, -1).await?;
		}
		Ok(())
	})
}

/// Physical-delete errors are logged but never abort the transaction: a
/// cloud object that is already gone must not block cleaning up our own
/// bookkeeping for it.
async fn delete_physical_entity<C: ConnectionTrait>(txn: &C, drivers: &DriverRegistry, entity_id: i64) -> Result<()> {
	let Some(entity) = entity_repo::find_by_id(txn, entity_id).await? else {
		return Ok(());
	};
	if let Some(policy_model) = policy_repo::find_by_id(txn, entity.policy_id).await? {
		match crate::policy::to_domain(policy_model) {
			Ok(policy) => match drivers.get(policy.policy_type) {
				Ok(driver) => {
					if let Err(e) = driver.delete(&policy, std::slice::from_ref(&entity.source)).await {
						warn!(entity_id, err = %e, "hard delete: physical delete failed, continuing");
					}
				}
				Err(e) => warn!(entity_id, err = %e, "hard delete: no driver for entity's policy, continuing"),
			},
			Err(e) => warn!(entity_id, err = %e, "hard delete: policy row unreadable, continuing"),
		}
	}
	entity_repo::hard_delete(txn, entity_id).await?;
	Ok(())
}

/// Top-level, user-initiated delete: rejects mount-points belonging to a
/// flagged policy instead of silently skipping them the way the sync
/// engine's internal exclusion set does.
pub async fn delete_paths<C: ConnectionTrait + Sync>(
	txn: &C,
	drivers: &DriverRegistry,
	owner_id: i64,
	node_ids: &[i64],
) -> Result<()> {
	for &node_id in node_ids {
		let Some(node) = file_repo::find_by_id(txn, node_id).await? else {
			continue;
		};
		if node.owner_id != owner_id {
			return Err(AppError::Forbidden(format!("file {node_id} not owned by {owner_id}")));
		}
		if node.parent_id.is_none() {
			return Err(AppError::Forbidden("the root directory cannot be deleted".into()));
		}
		if node.file_type == 1 {
			if let Some(policy_model) = policy_repo::find_by_node_id(txn, node.id).await? {
				if policy_model.flag.as_deref().is_some_and(|f| !f.is_empty()) {
					return Err(AppError::Forbidden(format!("{:?} is a flagged mount point and cannot be deleted", node.name)));
				}
			}
		}
		hard_delete_recursively(txn, drivers, owner_id, node_id).await?;
	}
	Ok(())
}
