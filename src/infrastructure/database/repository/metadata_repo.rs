//! Metadata repository — descriptive `(file_id, key, value)` rows.

use crate::infrastructure::database::entities::metadata::{ActiveModel, Column, Entity, Model};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

pub async fn find_by_file_id<C: ConnectionTrait>(db: &C, file_id: i64) -> Result<Vec<Model>, DbErr> {
	Entity::find().filter(Column::FileId.eq(file_id)).all(db).await
}

pub async fn insert<C: ConnectionTrait>(db: &C, file_id: i64, key: String, value: String) -> Result<Model, DbErr> {
	let active = ActiveModel {
		id: sea_orm::ActiveValue::NotSet,
		file_id: sea_orm::ActiveValue::Set(file_id),
		key: sea_orm::ActiveValue::Set(key),
		value: sea_orm::ActiveValue::Set(value),
	};
	active.insert(db).await
}

pub async fn delete_by_file_id<C: ConnectionTrait>(db: &C, file_id: i64) -> Result<(), DbErr> {
	Entity::delete_many().filter(Column::FileId.eq(file_id)).exec(db).await?;
	Ok(())
}
