//! FileStorageVersion repository — at most one `is_current` per file.

use crate::infrastructure::database::entities::file_storage_version::{ActiveModel, Column, Entity, Model};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

pub async fn find_current_for_file<C: ConnectionTrait>(db: &C, file_id: i64) -> Result<Option<Model>, DbErr> {
	Entity::find()
		.filter(Column::FileId.eq(file_id))
		.filter(Column::IsCurrent.eq(true))
		.one(db)
		.await
}

/// Unsets any existing current version for `file_id`, then inserts a new
/// current link pointing at `entity_id`. Callers run this inside a
/// transaction so the invariant "at most one current per file" never
/// observably breaks.
pub async fn set_current<C: ConnectionTrait>(
	db: &C,
	file_id: i64,
	entity_id: i64,
	uploaded_by_user_id: i64,
) -> Result<Model, DbErr> {
	let existing = Entity::find()
		.filter(Column::FileId.eq(file_id))
		.filter(Column::IsCurrent.eq(true))
		.all(db)
		.await?;
	for row in existing {
		let mut active: ActiveModel = row.into();
		active.is_current = Set(false);
		active.update(db).await?;
	}

	let active = ActiveModel {
		id: sea_orm::ActiveValue::NotSet,
		file_id: Set(file_id),
		entity_id: Set(entity_id),
		is_current: Set(true),
		uploaded_by_user_id: Set(uploaded_by_user_id),
	};
	active.insert(db).await
}

pub async fn delete_by_file_id<C: ConnectionTrait>(db: &C, file_id: i64) -> Result<(), DbErr> {
	Entity::delete_many().filter(Column::FileId.eq(file_id)).exec(db).await?;
	Ok(())
}
