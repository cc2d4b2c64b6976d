//! StoragePolicy sea-orm entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "storage_policies")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i64,
	#[sea_orm(unique)]
	pub name: String,
	pub policy_type: String,
	#[sea_orm(unique)]
	pub flag: Option<String>,
	pub virtual_path: String,
	pub base_path: String,
	pub server: Option<String>,
	pub bucket_name: Option<String>,
	pub access_key: Option<String>,
	pub secret_key: Option<String>,
	pub is_private: bool,
	pub max_size: i64,
	pub settings: Json,
	pub node_id: i64,
	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
	pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::file::Entity",
		from = "Column::NodeId",
		to = "super::file::Column::Id"
	)]
	MountPoint,
}

impl Related<super::file::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::MountPoint.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
