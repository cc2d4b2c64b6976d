//! File repository — the logical-namespace table.

use crate::infrastructure::database::entities::file::{ActiveModel, Column, Entity, Model};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
	Entity::find_by_id(id).one(db).await
}

/// Scoped: excludes soft-deleted rows. Used by the listing path.
pub async fn find_by_parent_scoped<C: ConnectionTrait>(
	db: &C,
	parent_id: Option<i64>,
	owner_id: i64,
) -> Result<Vec<Model>, DbErr> {
	let mut q = Entity::find()
		.filter(Column::OwnerId.eq(owner_id))
		.filter(Column::DeletedAt.is_null());
	q = match parent_id {
		Some(p) => q.filter(Column::ParentId.eq(p)),
		None => q.filter(Column::ParentId.is_null()),
	};
	q.all(db).await
}

/// Unscoped: includes soft-deleted rows. Used by the sync engine's
/// deletion pass, which must see everything the DB currently believes
/// exists under a directory.
pub async fn find_by_parent_unscoped<C: ConnectionTrait>(
	db: &C,
	parent_id: i64,
	owner_id: i64,
) -> Result<Vec<Model>, DbErr> {
	Entity::find()
		.filter(Column::OwnerId.eq(owner_id))
		.filter(Column::ParentId.eq(parent_id))
		.all(db)
		.await
}

pub async fn find_by_parent_and_name<C: ConnectionTrait>(
	db: &C,
	parent_id: Option<i64>,
	name: &str,
	owner_id: i64,
) -> Result<Option<Model>, DbErr> {
	let mut q = Entity::find()
		.filter(Column::OwnerId.eq(owner_id))
		.filter(Column::Name.eq(name))
		.filter(Column::DeletedAt.is_null());
	q = match parent_id {
		Some(p) => q.filter(Column::ParentId.eq(p)),
		None => q.filter(Column::ParentId.is_null()),
	};
	q.one(db).await
}

pub async fn find_root_for_owner<C: ConnectionTrait>(db: &C, owner_id: i64) -> Result<Option<Model>, DbErr> {
	Entity::find()
		.filter(Column::OwnerId.eq(owner_id))
		.filter(Column::ParentId.is_null())
		.one(db)
		.await
}

pub async fn insert<C: ConnectionTrait>(db: &C, active: ActiveModel) -> Result<Model, DbErr> {
	active.insert(db).await
}

/// Upsert keyed by `(parent_id, name, owner_id)`.
pub async fn create_or_update<C: ConnectionTrait>(
	db: &C,
	parent_id: Option<i64>,
	owner_id: i64,
	name: &str,
	build: impl FnOnce() -> ActiveModel,
	update: impl FnOnce(Model) -> ActiveModel,
) -> Result<Model, DbErr> {
	match find_by_parent_and_name(db, parent_id, name, owner_id).await? {
		Some(existing) => update(existing).update(db).await,
		None => build().insert(db).await,
	}
}

pub async fn update_parent<C: ConnectionTrait>(db: &C, id: i64, new_parent_id: i64) -> Result<Model, DbErr> {
	let existing = Entity::find_by_id(id)
		.one(db)
		.await?
		.ok_or_else(|| DbErr::RecordNotFound(format!("file {id}")))?;
	let mut active: ActiveModel = existing.into();
	active.parent_id = Set(Some(new_parent_id));
	active.updated_at = Set(Utc::now());
	active.update(db).await
}

pub async fn rename<C: ConnectionTrait>(db: &C, id: i64, new_name: &str) -> Result<Model, DbErr> {
	let existing = Entity::find_by_id(id)
		.one(db)
		.await?
		.ok_or_else(|| DbErr::RecordNotFound(format!("file {id}")))?;
	let mut active: ActiveModel = existing.into();
	active.name = Set(new_name.to_string());
	active.updated_at = Set(Utc::now());
	active.update(db).await
}

/// Adds `delta` (negative to shrink) to a Dir's materialized child count.
/// Missing rows are ignored: a parent that vanished mid-batch is not worth
/// failing an otherwise-successful sync or delete pass over.
pub async fn adjust_children_count<C: ConnectionTrait>(db: &C, id: i64, delta: i64) -> Result<(), DbErr> {
	let Some(existing) = Entity::find_by_id(id).one(db).await? else {
		return Ok(());
	};
	let mut active: ActiveModel = existing.clone().into();
	active.children_count = Set((existing.children_count + delta).max(0));
	active.update(db).await?;
	Ok(())
}

pub async fn hard_delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), DbErr> {
	Entity::delete_by_id(id).exec(db).await?;
	Ok(())
}

/// Walks up the `parent_id` chain from `node_id` looking for `ancestor_id`.
/// Moves and renames call this first to reject turning a node into its own
/// descendant's child.
pub async fn is_descendant<C: ConnectionTrait>(db: &C, ancestor_id: i64, node_id: i64) -> Result<bool, DbErr> {
	let mut current = node_id;
	loop {
		let Some(row) = Entity::find_by_id(current).one(db).await? else {
			return Ok(false);
		};
		match row.parent_id {
			Some(parent_id) if parent_id == ancestor_id => return Ok(true),
			Some(parent_id) => current = parent_id,
			None => return Ok(false),
		}
	}
}
