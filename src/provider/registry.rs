//! Maps a policy type to its driver instance. Dynamic dispatch is
//! deliberate here: the set of backends is an open, runtime-chosen set
//! rather than something that benefits from monomorphization.

use super::{cos::CosDriver, kodo::KodoDriver, local::LocalDriver, onedrive::OnedriveDriver, oss::OssDriver, s3::S3Driver, Driver};
use crate::domain::storage_policy::PolicyType;
use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct DriverRegistry {
	drivers: HashMap<PolicyType, Arc<dyn Driver>>,
}

impl DriverRegistry {
	pub fn new() -> Self {
		Self { drivers: HashMap::new() }
	}

	/// Wires up the default driver for every backend. Local needs a
	/// filesystem root; object stores are constructed lazily per-policy
	/// since each one carries its own endpoint/credentials, so what's
	/// registered here is a stateless dispatcher, not a pre-built client.
	pub fn with_defaults(storage_root: std::path::PathBuf) -> Self {
		let mut registry = Self::new();
		registry.register(PolicyType::Local, Arc::new(LocalDriver::new(storage_root)));
		registry.register(PolicyType::AwsS3, Arc::new(S3Driver::new()));
		registry.register(PolicyType::AliyunOss, Arc::new(OssDriver::new()));
		registry.register(PolicyType::TencentCos, Arc::new(CosDriver::new()));
		registry.register(PolicyType::QiniuKodo, Arc::new(KodoDriver::new()));
		registry.register(PolicyType::Onedrive, Arc::new(OnedriveDriver::new()));
		registry
	}

	pub fn register(&mut self, policy_type: PolicyType, driver: Arc<dyn Driver>) {
		self.drivers.insert(policy_type, driver);
	}

	pub fn get(&self, policy_type: PolicyType) -> Result<Arc<dyn Driver>> {
		self.drivers
			.get(&policy_type)
			.cloned()
			.ok_or_else(|| AppError::PolicyNotSupportAuth(format!("no driver registered for {policy_type}")))
	}
}
