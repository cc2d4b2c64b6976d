//! Recursive copy. Metadata is duplicated except `thumb_`-prefixed keys,
//! which are regenerated at the destination rather than carried over.

use crate::domain::storage_policy::StoragePolicy;
use crate::error::{AppError, Result};
use crate::file_type;
use crate::infrastructure::database::entities::{file, file_storage_entity, metadata};
use crate::infrastructure::database::repository::{entity_repo, file_repo, metadata_repo, policy_repo, version_repo};
use crate::infrastructure::events::{Event, EventBus};
use crate::provider::registry::DriverRegistry;
use chrono::Utc;
use futures::future::BoxFuture;
use sea_orm::{ActiveValue::Set, ConnectionTrait};

/// Copies `source_id` as a new child of `dest_parent_id`, recursing into
/// directories. `dest_parent_virtual_path` is `dest_parent_id`'s virtual
/// path, needed to compute where each copied physical entity actually
/// lands. Returns the id of the new top-level copy.
pub fn copy_recursively<'a, C: ConnectionTrait + Sync>(
	txn: &'a C,
	drivers: &'a DriverRegistry,
	events: &'a EventBus,
	owner_id: i64,
	source_id: i64,
	dest_parent_id: i64,
	dest_parent_virtual_path: &'a str,
) -> BoxFuture<'a, Result<i64>> {
	Box::pin(async move {
		let source = file_repo::find_by_id(txn, source_id)
			.await?
			.ok_or_else(|| AppError::NotFound(format!("file {source_id}")))?;
		if source.owner_id != owner_id {
			return Err(AppError::Forbidden(format!("file {source_id} not owned by {owner_id}")));
		}
		if file_repo::find_by_parent_and_name(txn, Some(dest_parent_id), &source.name, owner_id)
			.await?
			.is_some()
		{
			return Err(AppError::Conflict(format!("{:?} already exists at destination", source.name)));
		}

		let dest_virtual_path = join_virtual(dest_parent_virtual_path, &source.name);
		let now = Utc::now();
		let new_primary_entity_id = if source.file_type == 0 {
			match source.primary_entity_id {
				Some(entity_id) => Some(copy_physical_entity(txn, drivers, owner_id, entity_id, &dest_virtual_path).await?),
				None => None,
			}
		} else {
			None
		};

		let new_file = file::ActiveModel {
			id: sea_orm::ActiveValue::NotSet,
			owner_id: Set(owner_id),
			parent_id: Set(Some(dest_parent_id)),
			name: Set(source.name.clone()),
			file_type: Set(source.file_type),
			size: Set(source.size),
			primary_entity_id: Set(new_primary_entity_id),
			children_count: Set(0),
			view_config: Set(source.view_config.clone()),
			created_at: Set(now),
			updated_at: Set(now),
			deleted_at: Set(None),
		};
		let new_file = file_repo::insert(txn, new_file).await?;
		file_repo::adjust_children_count(txn, dest_parent_id, 1).await?;

		if let Some(entity_id) = new_primary_entity_id {
			version_repo::set_current(txn, new_file.id, entity_id, owner_id).await?;
		}

		for row in metadata_repo::find_by_file_id(txn, source.id).await? {
			if !metadata::is_copyable_key(&row.key) {
				continue;
			}
			metadata_repo::insert(txn, new_file.id, row.key, row.value).await?;
		}

		if source.file_type == 0 {
			if file_type::is_thumbnailable(&source.name) {
				events.publish_delayed(Event::FileCreated { file_id: new_file.id, owner_id }, std::time::Duration::from_secs(2));
			}
		} else {
			let children = file_repo::find_by_parent_scoped(txn, Some(source.id), owner_id).await?;
			for child in children {
				copy_recursively(txn, drivers, events, owner_id, child.id, new_file.id, &dest_virtual_path).await?;
			}
		}

		Ok(new_file.id)
	})
}

fn join_virtual(dir: &str, name: &str) -> String {
	if dir == "/" {
		format!("/{name}")
	} else {
		format!("{dir}/{name}")
	}
}

/// Reads the source entity's bytes through its driver and re-uploads them
/// to `dest_virtual_path`, producing an independent physical copy that
/// mirrors the new File's location rather than a throwaway object a later
/// `SyncDirectory` of the destination wouldn't recognize.
async fn copy_physical_entity<C: ConnectionTrait>(
	txn: &C,
	drivers: &DriverRegistry,
	owner_id: i64,
	entity_id: i64,
	dest_virtual_path: &str,
) -> Result<i64> {
	let entity = entity_repo::find_by_id(txn, entity_id)
		.await?
		.ok_or_else(|| AppError::NotFound(format!("entity {entity_id}")))?;
	let policy_model = policy_repo::find_by_id(txn, entity.policy_id)
		.await?
		.ok_or_else(|| AppError::PolicyNotFound(entity.policy_id.to_string()))?;
	let policy: StoragePolicy = crate::policy::to_domain(policy_model)?;
	let driver = drivers.get(policy.policy_type)?;

	let bytes = driver.stream_bytes(&policy, &entity.source).await?;
	let reader: Box<dyn tokio::io::AsyncRead + Send + Unpin> = Box::new(std::io::Cursor::new(bytes.to_vec()));
	let result = driver.upload(&policy, dest_virtual_path, reader, Some(bytes.len() as u64)).await?;

	let now = Utc::now();
	let new_entity = file_storage_entity::ActiveModel {
		id: sea_orm::ActiveValue::NotSet,
		policy_id: Set(entity.policy_id),
		source: Set(result.source),
		size: Set(result.size as i64),
		mime_type: Set(result.mime_type),
		dimension: Set(result.dimension),
		etag: Set(None),
		upload_session_id: Set(None),
		storage_metadata: Set(None),
		created_by: Set(owner_id),
		created_at: Set(now),
		updated_at: Set(now),
	};
	let new_entity = entity_repo::insert(txn, new_entity).await?;
	Ok(new_entity.id)
}
