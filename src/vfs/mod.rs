//! VFS resolver: given a virtual path, find the live policy that owns it.

use crate::domain::storage_policy::StoragePolicy;
use crate::error::{AppError, Result};
use crate::path::longest_mount_prefix;
use crate::policy::PolicyRegistry;

pub struct VfsResolver<'a> {
	registry: &'a PolicyRegistry,
}

impl<'a> VfsResolver<'a> {
	pub fn new(registry: &'a PolicyRegistry) -> Self {
		Self { registry }
	}

	pub async fn find_policy_for_path(&self, path: &str) -> Result<StoragePolicy> {
		let policies = self.registry.list().await?;
		longest_mount_prefix(path, &policies)
			.cloned()
			.ok_or_else(|| AppError::PolicyNotFound(format!("no mount owns {path:?}")))
	}

	/// Resolves both paths and fails with `InvalidOperation` if they belong
	/// to different policies. Used by move/rename to reject cross-policy
	/// operations before any physical work happens.
	pub async fn require_same_policy(&self, path_a: &str, path_b: &str) -> Result<StoragePolicy> {
		let policy_a = self.find_policy_for_path(path_a).await?;
		let policy_b = self.find_policy_for_path(path_b).await?;
		if policy_a.id != policy_b.id {
			return Err(AppError::InvalidOperation("cross-policy not supported".into()));
		}
		Ok(policy_a)
	}
}
