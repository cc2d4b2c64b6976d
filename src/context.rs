//! Process-wide shared state: the handful of singletons every request-level
//! operation needs a handle to. Built once at startup and cloned cheaply
//! (everything here is an `Arc`) into whatever serves requests.

use crate::config::AppConfig;
use crate::infrastructure::cache::{Cache, MemoryCache};
use crate::infrastructure::database::repository::TransactionManager;
use crate::infrastructure::database::Database;
use crate::infrastructure::events::EventBus;
use crate::lock::PathLocker;
use crate::policy::PolicyRegistry;
use crate::provider::registry::DriverRegistry;
use crate::sync::SyncEngine;
use crate::upload::UploadEngine;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub struct CoreContext {
	pub config: Arc<AppConfig>,
	pub txm: Arc<TransactionManager>,
	pub cache: Arc<dyn Cache>,
	pub drivers: Arc<DriverRegistry>,
	pub policies: Arc<PolicyRegistry>,
	pub events: Arc<EventBus>,
	pub locks: Arc<PathLocker>,
	pub sync_engine: Arc<SyncEngine>,
	pub upload_engine: Arc<UploadEngine>,
}

impl CoreContext {
	/// Connects to `config.data_dir`'s sqlite database, creating directories
	/// as needed, and wires every component together. A cache backend
	/// beyond the in-memory fallback is the caller's choice — pass one in
	/// via `with_cache` before components that read it are built, if so.
	pub async fn bootstrap(config: AppConfig) -> anyhow::Result<Self> {
		config.ensure_directories()?;
		let db_path = config.data_dir.join("anheyu-vfs.sqlite");
		let db = Database::connect_sqlite_file(&db_path).await?;
		db.migrate().await?;
		Self::with_connection(config, db.conn().clone(), Arc::new(MemoryCache::new()))
	}

	pub fn with_connection(config: AppConfig, conn: DatabaseConnection, cache: Arc<dyn Cache>) -> anyhow::Result<Self> {
		let config = Arc::new(config);
		let txm = Arc::new(TransactionManager::new(conn));
		let drivers = Arc::new(DriverRegistry::with_defaults(config.storage_root()));
		let policies = Arc::new(PolicyRegistry::new(txm.clone(), cache.clone()));
		let events = Arc::new(EventBus::new());
		let locks = Arc::new(PathLocker::new());

		let sync_engine = Arc::new(SyncEngine::new(txm.clone(), drivers.clone(), policies.clone(), events.clone()));
		let upload_engine = Arc::new(UploadEngine::new(
			txm.clone(),
			drivers.clone(),
			policies.clone(),
			cache.clone(),
			events.clone(),
			config.upload_temp_dir.clone(),
			config.upload_allowed_extensions.clone(),
		));

		Ok(Self { config, txm, cache, drivers, policies, events, locks, sync_engine, upload_engine })
	}
}
