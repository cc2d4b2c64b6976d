//! Crate-wide error type.
//!
//! Every public, fallible entry point returns `Result<T, AppError>`. Module
//! errors (`policy::PolicyError`, `provider::DriverError`, ...) convert into
//! this via `#[from]` so callers at the edge (an HTTP handler, a CLI command)
//! only need to match one enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
	#[error("not found: {0}")]
	NotFound(String),

	#[error("forbidden: {0}")]
	Forbidden(String),

	#[error("conflict: {0}")]
	Conflict(String),

	#[error("invalid operation: {0}")]
	InvalidOperation(String),

	#[error("signature invalid")]
	SignatureInvalid,

	#[error("link expired")]
	LinkExpired,

	#[error("invalid policy type: {0}")]
	InvalidPolicyType(String),

	#[error("policy not found: {0}")]
	PolicyNotFound(String),

	#[error("policy does not support this operation: {0}")]
	PolicyNotSupportAuth(String),

	#[error("feature not supported: {0}")]
	FeatureNotSupported(String),

	#[error("database error: {0}")]
	Database(#[from] sea_orm::DbErr),

	#[error(transparent)]
	Driver(#[from] crate::provider::DriverError),

	#[error(transparent)]
	Upload(#[from] crate::upload::UploadError),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
