//! Database infrastructure using sea-orm.
//!
//! A sqlite connection opened with WAL pragmas for write throughput, plus
//! a `migrate()` entry point driven by `sea_orm_migration`.

pub mod entities;
pub mod migration;
pub mod repository;

use sea_orm::{ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub struct Database {
	conn: DatabaseConnection,
}

impl Database {
	pub async fn connect_sqlite_file(path: &Path) -> Result<Self, DbErr> {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)
				.map_err(|e| DbErr::Custom(format!("failed to create db directory: {e}")))?;
		}
		let db_url = format!("sqlite://{}?mode=rwc", path.display());
		Self::connect(db_url).await
	}

	pub async fn connect_in_memory() -> Result<Self, DbErr> {
		Self::connect("sqlite::memory:".to_string()).await
	}

	async fn connect(db_url: String) -> Result<Self, DbErr> {
		let mut opt = ConnectOptions::new(db_url);
		opt.max_connections(10)
			.min_connections(1)
			.connect_timeout(Duration::from_secs(8))
			.sqlx_logging(false);

		let conn = SeaDatabase::connect(opt).await?;
		for pragma in [
			"PRAGMA journal_mode=WAL",
			"PRAGMA synchronous=NORMAL",
			"PRAGMA foreign_keys=ON",
		] {
			let _ = conn
				.execute(Statement::from_string(sea_orm::DatabaseBackend::Sqlite, pragma))
				.await;
		}
		Ok(Self { conn })
	}

	pub async fn migrate(&self) -> Result<(), DbErr> {
		migration::Migrator::up(&self.conn, None).await?;
		info!("database migrations completed");
		Ok(())
	}

	pub fn conn(&self) -> &DatabaseConnection {
		&self.conn
	}
}
