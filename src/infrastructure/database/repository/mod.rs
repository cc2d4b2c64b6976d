//! Repositories wrapped by a `TransactionManager`.
//!
//! Repo functions take any `C: ConnectionTrait` so the exact same code runs
//! against a bare `DatabaseConnection` or against a `DatabaseTransaction`.
//! Nested `.transaction()` calls on a `DatabaseTransaction` create a
//! savepoint, so repos never need to know which they got.

pub mod direct_link_repo;
pub mod entity_repo;
pub mod file_repo;
pub mod metadata_repo;
pub mod policy_repo;
pub mod version_repo;

use futures::future::BoxFuture;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};

pub struct TransactionManager {
	conn: DatabaseConnection,
}

impl TransactionManager {
	pub fn new(conn: DatabaseConnection) -> Self {
		Self { conn }
	}

	pub fn conn(&self) -> &DatabaseConnection {
		&self.conn
	}

	/// Runs `f` inside one transaction; on `Ok` the transaction commits, on
	/// `Err` it rolls back.
	pub async fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
	where
		T: Send + 'static,
		E: std::error::Error + From<DbErr> + Send + 'static,
		F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, E>> + Send + 'static,
	{
		self.conn
			.transaction::<_, T, E>(|txn| f(txn))
			.await
			.map_err(|e| match e {
				sea_orm::TransactionError::Connection(db_err) => E::from(db_err),
				sea_orm::TransactionError::Transaction(e) => e,
			})
	}
}
