//! File sea-orm entity — the logical namespace node.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i64,
	pub owner_id: i64,
	pub parent_id: Option<i64>,
	pub name: String,
	/// 0 = File, 1 = Dir.
	pub file_type: i32,
	pub size: i64,
	pub primary_entity_id: Option<i64>,
	pub children_count: i64,
	pub view_config: Option<Json>,
	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
	pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::file_storage_entity::Entity",
		from = "Column::PrimaryEntityId",
		to = "super::file_storage_entity::Column::Id"
	)]
	PrimaryEntity,
}

impl Related<super::file_storage_entity::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::PrimaryEntity.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
