//! DirectLink repository — share-code rows pointing at a File.

use crate::infrastructure::database::entities::direct_link::{ActiveModel, Column, Entity, Model};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

pub async fn find_by_file_id<C: ConnectionTrait>(db: &C, file_id: i64) -> Result<Vec<Model>, DbErr> {
	Entity::find().filter(Column::FileId.eq(file_id)).all(db).await
}

pub async fn insert<C: ConnectionTrait>(db: &C, file_id: i64, created_by: i64) -> Result<Model, DbErr> {
	let active = ActiveModel {
		id: sea_orm::ActiveValue::NotSet,
		file_id: sea_orm::ActiveValue::Set(file_id),
		created_by: sea_orm::ActiveValue::Set(created_by),
		created_at: sea_orm::ActiveValue::Set(Utc::now()),
	};
	active.insert(db).await
}

pub async fn delete_by_file_id<C: ConnectionTrait>(db: &C, file_id: i64) -> Result<(), DbErr> {
	Entity::delete_many().filter(Column::FileId.eq(file_id)).exec(db).await?;
	Ok(())
}
