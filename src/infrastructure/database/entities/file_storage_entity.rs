//! FileStorageEntity sea-orm entity — a physical backend object.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_storage_entities")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i64,
	pub policy_id: i64,
	pub source: String,
	pub size: i64,
	pub mime_type: Option<String>,
	pub dimension: Option<String>,
	pub etag: Option<String>,
	pub upload_session_id: Option<Uuid>,
	pub storage_metadata: Option<Json>,
	pub created_by: i64,
	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::storage_policy::Entity",
		from = "Column::PolicyId",
		to = "super::storage_policy::Column::Id"
	)]
	Policy,
}

impl Related<super::storage_policy::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Policy.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
