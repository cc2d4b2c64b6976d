//! Metadata entity — descriptive `(file_id, key, value)` rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "metadata")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i64,
	pub file_id: i64,
	pub key: String,
	pub value: String,
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
}

impl Related<super::file::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::File.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

/// Thumbnail cache keys are regenerated at the destination, never copied.
pub fn is_copyable_key(key: &str) -> bool {
	!key.starts_with("thumb_")
}
