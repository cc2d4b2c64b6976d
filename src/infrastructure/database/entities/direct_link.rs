//! DirectLink entity — a short-code share pointing at a File.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "direct_links")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i64,
	pub file_id: i64,
	pub created_by: i64,
	pub created_at: DateTimeUtc,
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
