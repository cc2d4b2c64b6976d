//! StoragePolicy repository — raw persistence for mount definitions.

use crate::infrastructure::database::entities::storage_policy::{ActiveModel, Column, Entity, Model};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
	Entity::find_by_id(id).one(db).await
}

pub async fn find_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<Model>, DbErr> {
	Entity::find().filter(Column::Name.eq(name)).one(db).await
}

pub async fn find_by_flag<C: ConnectionTrait>(db: &C, flag: &str) -> Result<Option<Model>, DbErr> {
	Entity::find().filter(Column::Flag.eq(flag)).one(db).await
}

pub async fn find_by_virtual_path<C: ConnectionTrait>(db: &C, virtual_path: &str) -> Result<Option<Model>, DbErr> {
	Entity::find()
		.filter(Column::VirtualPath.eq(virtual_path))
		.filter(Column::DeletedAt.is_null())
		.one(db)
		.await
}

pub async fn find_by_node_id<C: ConnectionTrait>(db: &C, node_id: i64) -> Result<Option<Model>, DbErr> {
	Entity::find().filter(Column::NodeId.eq(node_id)).one(db).await
}

/// Excludes soft-deleted mounts. Used by the path resolver and the sync engine.
pub async fn list<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, DbErr> {
	Entity::find().filter(Column::DeletedAt.is_null()).all(db).await
}

/// Includes soft-deleted mounts. Used by admin listing surfaces.
pub async fn list_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, DbErr> {
	Entity::find().all(db).await
}

pub async fn insert<C: ConnectionTrait>(db: &C, active: ActiveModel) -> Result<Model, DbErr> {
	active.insert(db).await
}

pub async fn update<C: ConnectionTrait>(db: &C, active: ActiveModel) -> Result<Model, DbErr> {
	active.update(db).await
}

pub async fn soft_delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<Model, DbErr> {
	let existing = Entity::find_by_id(id)
		.one(db)
		.await?
		.ok_or_else(|| DbErr::RecordNotFound(format!("storage policy {id}")))?;
	let mut active: ActiveModel = existing.into();
	active.deleted_at = Set(Some(Utc::now()));
	active.updated_at = Set(Utc::now());
	active.update(db).await
}
