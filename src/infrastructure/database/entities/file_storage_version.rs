//! FileStorageVersion sea-orm entity — the File <-> Entity link.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_storage_versions")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i64,
	pub file_id: i64,
	pub entity_id: i64,
	pub is_current: bool,
	pub uploaded_by_user_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::file::Entity",
		from = "Column::FileId",
		to = "super::file::Column::Id",
		on_delete = "Cascade"
	)]
	File,
	#[sea_orm(
		belongs_to = "super::file_storage_entity::Entity",
		from = "Column::EntityId",
		to = "super::file_storage_entity::Column::Id",
		on_delete = "Cascade"
	)]
	Entity_,
}

impl Related<super::file::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::File.def()
	}
}

impl Related<super::file_storage_entity::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Entity_.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
