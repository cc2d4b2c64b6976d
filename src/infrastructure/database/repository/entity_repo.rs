//! FileStorageEntity repository — physical backend objects.

use crate::infrastructure::database::entities::file_storage_entity::{ActiveModel, Column, Entity, Model};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
	Entity::find_by_id(id).one(db).await
}

pub async fn insert<C: ConnectionTrait>(db: &C, active: ActiveModel) -> Result<Model, DbErr> {
	active.insert(db).await
}

/// Clears `upload_session_id` and fills in the fields the driver returned
/// from `Upload`, promoting the entity from tentative to committed.
pub async fn finalize<C: ConnectionTrait>(
	db: &C,
	id: i64,
	source: String,
	size: i64,
	mime_type: Option<String>,
	dimension: Option<String>,
	etag: Option<String>,
) -> Result<Model, DbErr> {
	let existing = Entity::find_by_id(id)
		.one(db)
		.await?
		.ok_or_else(|| DbErr::RecordNotFound(format!("entity {id}")))?;
	let mut active: ActiveModel = existing.into();
	active.source = Set(source);
	active.size = Set(size);
	active.mime_type = Set(mime_type);
	active.dimension = Set(dimension);
	active.etag = Set(etag);
	active.upload_session_id = Set(None);
	active.updated_at = Set(Utc::now());
	active.update(db).await
}

pub async fn find_tentative_older_than<C: ConnectionTrait>(
	db: &C,
	cutoff: DateTime<Utc>,
) -> Result<Vec<Model>, DbErr> {
	Entity::find()
		.filter(Column::UploadSessionId.is_not_null())
		.filter(Column::UpdatedAt.lt(cutoff))
		.all(db)
		.await
}

pub async fn hard_delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), DbErr> {
	Entity::delete_by_id(id).exec(db).await?;
	Ok(())
}
