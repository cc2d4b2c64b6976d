//! Initial migration: storage policies, files, physical entities, versions.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.create_table(
				Table::create()
					.table(Files::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Files::Id)
							.big_integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Files::OwnerId).big_integer().not_null())
					.col(ColumnDef::new(Files::ParentId).big_integer())
					.col(ColumnDef::new(Files::Name).string().not_null())
					.col(ColumnDef::new(Files::FileType).integer().not_null())
					.col(ColumnDef::new(Files::Size).big_integer().not_null().default(0))
					.col(ColumnDef::new(Files::PrimaryEntityId).big_integer())
					.col(ColumnDef::new(Files::ChildrenCount).big_integer().not_null().default(0))
					.col(ColumnDef::new(Files::ViewConfig).json())
					.col(ColumnDef::new(Files::CreatedAt).timestamp_with_time_zone().not_null())
					.col(ColumnDef::new(Files::UpdatedAt).timestamp_with_time_zone().not_null())
					.col(ColumnDef::new(Files::DeletedAt).timestamp_with_time_zone())
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_files_parent_name_owner")
					.table(Files::Table)
					.col(Files::ParentId)
					.col(Files::Name)
					.col(Files::OwnerId)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(StoragePolicies::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(StoragePolicies::Id)
							.big_integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(StoragePolicies::Name).string().not_null().unique_key())
					.col(ColumnDef::new(StoragePolicies::PolicyType).string().not_null())
					.col(ColumnDef::new(StoragePolicies::Flag).string().unique_key())
					.col(ColumnDef::new(StoragePolicies::VirtualPath).string().not_null())
					.col(ColumnDef::new(StoragePolicies::BasePath).string().not_null())
					.col(ColumnDef::new(StoragePolicies::Server).string())
					.col(ColumnDef::new(StoragePolicies::BucketName).string())
					.col(ColumnDef::new(StoragePolicies::AccessKey).string())
					.col(ColumnDef::new(StoragePolicies::SecretKey).string())
					.col(ColumnDef::new(StoragePolicies::IsPrivate).boolean().not_null().default(false))
					.col(ColumnDef::new(StoragePolicies::MaxSize).big_integer().not_null().default(0))
					.col(ColumnDef::new(StoragePolicies::Settings).json().not_null())
					.col(ColumnDef::new(StoragePolicies::NodeId).big_integer().not_null())
					.col(ColumnDef::new(StoragePolicies::CreatedAt).timestamp_with_time_zone().not_null())
					.col(ColumnDef::new(StoragePolicies::UpdatedAt).timestamp_with_time_zone().not_null())
					.col(ColumnDef::new(StoragePolicies::DeletedAt).timestamp_with_time_zone())
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(FileStorageEntities::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(FileStorageEntities::Id)
							.big_integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(FileStorageEntities::PolicyId).big_integer().not_null())
					.col(ColumnDef::new(FileStorageEntities::Source).string().not_null())
					.col(ColumnDef::new(FileStorageEntities::Size).big_integer().not_null())
					.col(ColumnDef::new(FileStorageEntities::MimeType).string())
					.col(ColumnDef::new(FileStorageEntities::Dimension).string())
					.col(ColumnDef::new(FileStorageEntities::Etag).string())
					.col(ColumnDef::new(FileStorageEntities::UploadSessionId).uuid())
					.col(ColumnDef::new(FileStorageEntities::StorageMetadata).json())
					.col(ColumnDef::new(FileStorageEntities::CreatedBy).big_integer().not_null())
					.col(ColumnDef::new(FileStorageEntities::CreatedAt).timestamp_with_time_zone().not_null())
					.col(ColumnDef::new(FileStorageEntities::UpdatedAt).timestamp_with_time_zone().not_null())
					.foreign_key(
						ForeignKey::create()
							.from(FileStorageEntities::Table, FileStorageEntities::PolicyId)
							.to(StoragePolicies::Table, StoragePolicies::Id),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(FileStorageVersions::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(FileStorageVersions::Id)
							.big_integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(FileStorageVersions::FileId).big_integer().not_null())
					.col(ColumnDef::new(FileStorageVersions::EntityId).big_integer().not_null())
					.col(ColumnDef::new(FileStorageVersions::IsCurrent).boolean().not_null().default(false))
					.col(ColumnDef::new(FileStorageVersions::UploadedByUserId).big_integer().not_null())
					.foreign_key(
						ForeignKey::create()
							.from(FileStorageVersions::Table, FileStorageVersions::FileId)
							.to(Files::Table, Files::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.foreign_key(
						ForeignKey::create()
							.from(FileStorageVersions::Table, FileStorageVersions::EntityId)
							.to(FileStorageEntities::Table, FileStorageEntities::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager.drop_table(Table::drop().table(FileStorageVersions::Table).to_owned()).await?;
		manager.drop_table(Table::drop().table(FileStorageEntities::Table).to_owned()).await?;
		manager.drop_table(Table::drop().table(StoragePolicies::Table).to_owned()).await?;
		manager.drop_table(Table::drop().table(Files::Table).to_owned()).await?;
		Ok(())
	}
}

#[derive(DeriveIden)]
enum Files {
	Table,
	Id,
	OwnerId,
	ParentId,
	Name,
	FileType,
	Size,
	PrimaryEntityId,
	ChildrenCount,
	ViewConfig,
	CreatedAt,
	UpdatedAt,
	DeletedAt,
}

#[derive(DeriveIden)]
enum StoragePolicies {
	Table,
	Id,
	Name,
	PolicyType,
	Flag,
	VirtualPath,
	BasePath,
	Server,
	BucketName,
	AccessKey,
	SecretKey,
	IsPrivate,
	MaxSize,
	Settings,
	NodeId,
	CreatedAt,
	UpdatedAt,
	DeletedAt,
}

#[derive(DeriveIden)]
enum FileStorageEntities {
	Table,
	Id,
	PolicyId,
	Source,
	Size,
	MimeType,
	Dimension,
	Etag,
	UploadSessionId,
	StorageMetadata,
	CreatedBy,
	CreatedAt,
	UpdatedAt,
}

#[derive(DeriveIden)]
enum FileStorageVersions {
	Table,
	Id,
	FileId,
	EntityId,
	IsCurrent,
	UploadedByUserId,
}
