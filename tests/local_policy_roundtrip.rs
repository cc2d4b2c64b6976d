//! End-to-end exercise of the local driver through `CoreContext`: create a
//! policy, let an externally-dropped file get picked up by sync, then move,
//! copy, and delete it through the operation layer.

use anheyu_vfs::config::AppConfig;
use anheyu_vfs::context::CoreContext;
use anheyu_vfs::domain::storage_policy::{PolicyType, StoragePolicySettings};
use anheyu_vfs::infrastructure::cache::MemoryCache;
use anheyu_vfs::infrastructure::database::Database;
use anheyu_vfs::infrastructure::database::repository::file_repo;
use anheyu_vfs::ops;
use anheyu_vfs::policy::NewPolicy;
use anheyu_vfs::vfs::VfsResolver;
use std::sync::Arc;

const OWNER_ID: i64 = 1;

async fn bootstrap() -> (CoreContext, tempfile::TempDir) {
	let tmp = tempfile::tempdir().unwrap();
	let config = AppConfig::default_with_dir(tmp.path().to_path_buf());
	config.ensure_directories().unwrap();

	let db = Database::connect_in_memory().await.unwrap();
	db.migrate().await.unwrap();

	let ctx = CoreContext::with_connection(config, db.conn().clone(), Arc::new(MemoryCache::new())).unwrap();
	(ctx, tmp)
}

async fn create_local_policy(ctx: &CoreContext) -> anheyu_vfs::domain::storage_policy::StoragePolicy {
	ctx.policies
		.create(
			OWNER_ID,
			NewPolicy {
				name: "local".into(),
				policy_type: PolicyType::Local,
				flag: None,
				virtual_path: "/local".into(),
				base_path: String::new(),
				server: None,
				bucket_name: None,
				access_key: None,
				secret_key: None,
				is_private: false,
				max_size: 0,
				settings: StoragePolicySettings::default(),
			},
		)
		.await
		.unwrap()
}

#[tokio::test]
async fn sync_picks_up_externally_dropped_file() {
	let (ctx, _tmp) = bootstrap().await;
	let policy = create_local_policy(&ctx).await;

	let object_dir = std::path::Path::new(&policy.base_path);
	tokio::fs::create_dir_all(object_dir).await.unwrap();
	tokio::fs::write(object_dir.join("hello.txt"), b"hello world").await.unwrap();

	ctx.sync_engine.sync_directory(OWNER_ID, &policy, "/local").await.unwrap();

	let children = file_repo::find_by_parent_scoped(ctx.txm.conn(), Some(policy.node_id), OWNER_ID).await.unwrap();
	assert_eq!(children.len(), 1);
	assert_eq!(children[0].name, "hello.txt");
	assert_eq!(children[0].size, 11);
}

#[tokio::test]
async fn sync_removes_rows_whose_physical_file_is_gone() {
	let (ctx, _tmp) = bootstrap().await;
	let policy = create_local_policy(&ctx).await;

	let object_dir = std::path::Path::new(&policy.base_path);
	tokio::fs::create_dir_all(object_dir).await.unwrap();
	tokio::fs::write(object_dir.join("a.txt"), b"a").await.unwrap();
	ctx.sync_engine.sync_directory(OWNER_ID, &policy, "/local").await.unwrap();

	tokio::fs::remove_file(object_dir.join("a.txt")).await.unwrap();
	ctx.sync_engine.sync_directory(OWNER_ID, &policy, "/local").await.unwrap();

	let children = file_repo::find_by_parent_scoped(ctx.txm.conn(), Some(policy.node_id), OWNER_ID).await.unwrap();
	assert!(children.is_empty());
}

#[tokio::test]
async fn sync_creates_nested_directories_and_preserves_placeholder_files() {
	let (ctx, _tmp) = bootstrap().await;
	let policy = create_local_policy(&ctx).await;

	let nested = std::path::Path::new(&policy.base_path).join("sub");
	tokio::fs::create_dir_all(&nested).await.unwrap();
	tokio::fs::write(nested.join("b.txt"), b"nested").await.unwrap();
	ctx.sync_engine.sync_directory(OWNER_ID, &policy, "/local").await.unwrap();
	ctx.sync_engine.sync_directory(OWNER_ID, &policy, "/local/sub").await.unwrap();

	let top = file_repo::find_by_parent_scoped(ctx.txm.conn(), Some(policy.node_id), OWNER_ID).await.unwrap();
	assert_eq!(top.len(), 1);
	assert_eq!(top[0].file_type, 1, "sub must be materialized as a directory");

	let nested_children = file_repo::find_by_parent_scoped(ctx.txm.conn(), Some(top[0].id), OWNER_ID).await.unwrap();
	assert_eq!(nested_children.len(), 1);
	assert_eq!(nested_children[0].name, "b.txt");
}

#[tokio::test]
async fn copy_then_move_then_delete_round_trip() {
	let (ctx, _tmp) = bootstrap().await;
	let policy = create_local_policy(&ctx).await;

	let object_dir = std::path::Path::new(&policy.base_path);
	tokio::fs::create_dir_all(object_dir).await.unwrap();
	tokio::fs::write(object_dir.join("doc.txt"), b"contents").await.unwrap();
	ctx.sync_engine.sync_directory(OWNER_ID, &policy, "/local").await.unwrap();

	let doc = file_repo::find_by_parent_and_name(ctx.txm.conn(), Some(policy.node_id), "doc.txt", OWNER_ID)
		.await
		.unwrap()
		.unwrap();

	let copy_id = ops::copy::copy_recursively(
		ctx.txm.conn(),
		&ctx.drivers,
		&ctx.events,
		OWNER_ID,
		doc.id,
		policy.node_id,
		&policy.virtual_path,
	)
	.await
	.unwrap();
	assert_ne!(copy_id, doc.id);

	let copy_row = file_repo::find_by_id(ctx.txm.conn(), copy_id).await.unwrap().unwrap();
	assert_eq!(copy_row.name, "doc.txt");
	assert_ne!(copy_row.primary_entity_id, doc.primary_entity_id, "copy must own an independent physical entity");

	let resolver = VfsResolver::new(&ctx.policies);
	ops::mv::rename_file(ctx.txm.conn(), &ctx.drivers, OWNER_ID, copy_id, "/local/doc.txt", "renamed.txt")
		.await
		.unwrap();
	let renamed = file_repo::find_by_id(ctx.txm.conn(), copy_id).await.unwrap().unwrap();
	assert_eq!(renamed.name, "renamed.txt");
	let _ = &resolver;

	ops::delete::delete_paths(ctx.txm.conn(), &ctx.drivers, OWNER_ID, &[copy_id]).await.unwrap();
	assert!(file_repo::find_by_id(ctx.txm.conn(), copy_id).await.unwrap().is_none());

	let remaining = file_repo::find_by_parent_scoped(ctx.txm.conn(), Some(policy.node_id), OWNER_ID).await.unwrap();
	assert_eq!(remaining.len(), 1);
	assert_eq!(remaining[0].id, doc.id);
}

#[tokio::test]
async fn move_rejects_cross_policy_destination() {
	let (ctx, _tmp) = bootstrap().await;
	let policy_a = create_local_policy(&ctx).await;
	let policy_b = ctx
		.policies
		.create(
			OWNER_ID,
			NewPolicy {
				name: "second".into(),
				policy_type: PolicyType::Local,
				flag: None,
				virtual_path: "/second".into(),
				base_path: String::new(),
				server: None,
				bucket_name: None,
				access_key: None,
				secret_key: None,
				is_private: false,
				max_size: 0,
				settings: StoragePolicySettings::default(),
			},
		)
		.await
		.unwrap();

	let object_dir = std::path::Path::new(&policy_a.base_path);
	tokio::fs::create_dir_all(object_dir).await.unwrap();
	tokio::fs::write(object_dir.join("x.txt"), b"x").await.unwrap();
	ctx.sync_engine.sync_directory(OWNER_ID, &policy_a, "/local").await.unwrap();

	let file = file_repo::find_by_parent_and_name(ctx.txm.conn(), Some(policy_a.node_id), "x.txt", OWNER_ID)
		.await
		.unwrap()
		.unwrap();

	let resolver = VfsResolver::new(&ctx.policies);
	let err = ops::mv::move_file(
		ctx.txm.conn(),
		&ctx.drivers,
		&resolver,
		OWNER_ID,
		file.id,
		policy_b.node_id,
		"/local/x.txt",
		"/second",
	)
	.await
	.unwrap_err();
	assert!(matches!(err, anheyu_vfs::AppError::InvalidOperation(_) | anheyu_vfs::AppError::Conflict(_) | anheyu_vfs::AppError::Forbidden(_)));
}

#[tokio::test]
async fn delete_rejects_flagged_mount_point() {
	let (ctx, _tmp) = bootstrap().await;
	let policy = ctx
		.policies
		.create(
			OWNER_ID,
			NewPolicy {
				name: "protected".into(),
				policy_type: PolicyType::Local,
				flag: Some("protected".into()),
				virtual_path: "/protected".into(),
				base_path: String::new(),
				server: None,
				bucket_name: None,
				access_key: None,
				secret_key: None,
				is_private: false,
				max_size: 0,
				settings: StoragePolicySettings::default(),
			},
		)
		.await
		.unwrap();

	let result = ops::delete::delete_paths(ctx.txm.conn(), &ctx.drivers, OWNER_ID, &[policy.node_id]).await;
	assert!(result.is_err());
}

#[tokio::test]
async fn sibling_gallery_orders_by_name_and_locates_initial_index() {
	let (ctx, _tmp) = bootstrap().await;
	let policy = create_local_policy(&ctx).await;

	let object_dir = std::path::Path::new(&policy.base_path);
	tokio::fs::create_dir_all(object_dir).await.unwrap();
	for name in ["b.png", "a.jpg", "c.gif"] {
		tokio::fs::write(object_dir.join(name), b"pixels").await.unwrap();
	}
	tokio::fs::write(object_dir.join("notes.txt"), b"not an image").await.unwrap();
	ctx.sync_engine.sync_directory(OWNER_ID, &policy, "/local").await.unwrap();

	let b = file_repo::find_by_parent_and_name(ctx.txm.conn(), Some(policy.node_id), "b.png", OWNER_ID)
		.await
		.unwrap()
		.unwrap();

	let gallery = ops::signed_url::sibling_gallery(ctx.txm.conn(), "secret", OWNER_ID, b.id, 3600).await.unwrap();
	assert_eq!(gallery.signed_tokens.len(), 3, "notes.txt must not count as a sibling image");
	assert_eq!(gallery.initial_index, 1, "a.jpg, b.png, c.gif sorted by name puts b.png at index 1");
}

#[tokio::test]
async fn sibling_gallery_rejects_non_image_file() {
	let (ctx, _tmp) = bootstrap().await;
	let policy = create_local_policy(&ctx).await;

	let object_dir = std::path::Path::new(&policy.base_path);
	tokio::fs::create_dir_all(object_dir).await.unwrap();
	tokio::fs::write(object_dir.join("doc.txt"), b"contents").await.unwrap();
	ctx.sync_engine.sync_directory(OWNER_ID, &policy, "/local").await.unwrap();

	let doc = file_repo::find_by_parent_and_name(ctx.txm.conn(), Some(policy.node_id), "doc.txt", OWNER_ID)
		.await
		.unwrap()
		.unwrap();

	let result = ops::signed_url::sibling_gallery(ctx.txm.conn(), "secret", OWNER_ID, doc.id, 3600).await;
	assert!(result.is_err());
}
