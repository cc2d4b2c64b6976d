//! Adds descriptive metadata and direct-link sharing tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.create_table(
				Table::create()
					.table(Metadata::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Metadata::Id)
							.big_integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Metadata::FileId).big_integer().not_null())
					.col(ColumnDef::new(Metadata::Key).string().not_null())
					.col(ColumnDef::new(Metadata::Value).text().not_null())
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(DirectLinks::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(DirectLinks::Id)
							.big_integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(DirectLinks::FileId).big_integer().not_null())
					.col(ColumnDef::new(DirectLinks::CreatedBy).big_integer().not_null())
					.col(ColumnDef::new(DirectLinks::CreatedAt).timestamp_with_time_zone().not_null())
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager.drop_table(Table::drop().table(DirectLinks::Table).to_owned()).await?;
		manager.drop_table(Table::drop().table(Metadata::Table).to_owned()).await?;
		Ok(())
	}
}

#[derive(DeriveIden)]
enum Metadata {
	Table,
	Id,
	FileId,
	Key,
	Value,
}

#[derive(DeriveIden)]
enum DirectLinks {
	Table,
	Id,
	FileId,
	CreatedBy,
	CreatedAt,
}
