//! Pure validation helpers for the policy create/update contracts. Nothing
//! here touches the database; conflict checks and mount-point bookkeeping
//! live in `policy::PolicyRegistry`.

use crate::domain::storage_policy::PolicyType;
use crate::error::AppError;

pub struct NewPolicyFields<'a> {
	pub policy_type: PolicyType,
	pub virtual_path: &'a str,
	pub server: Option<&'a str>,
	pub bucket_name: Option<&'a str>,
	pub access_key: Option<&'a str>,
	pub secret_key: Option<&'a str>,
}

/// A virtual path must be exactly one segment deep: `/<name>`, never `/`.
pub fn is_single_segment_path(path: &str) -> bool {
	if path == "/" || !path.starts_with('/') {
		return false;
	}
	!path[1..].contains('/') && path.len() > 1
}

pub fn validate_create(fields: &NewPolicyFields<'_>) -> Result<(), AppError> {
	if !is_single_segment_path(fields.virtual_path) {
		return Err(AppError::InvalidOperation(format!(
			"virtual_path must be a single absolute segment, not {:?}",
			fields.virtual_path
		)));
	}
	if fields.policy_type.is_object_store() {
		let missing: Vec<&str> = [
			("server", fields.server),
			("bucket_name", fields.bucket_name),
			("access_key", fields.access_key),
			("secret_key", fields.secret_key),
		]
		.into_iter()
		.filter(|(_, v)| v.map(str::is_empty).unwrap_or(true))
		.map(|(name, _)| name)
		.collect();
		if !missing.is_empty() {
			return Err(AppError::InvalidOperation(format!(
				"{} policies require: {}",
				fields.policy_type, missing.join(", ")
			)));
		}
	}
	Ok(())
}

/// An update may never relocate the mount to root.
pub fn validate_update_virtual_path(new_path: &str) -> Result<(), AppError> {
	if new_path == "/" {
		return Err(AppError::InvalidOperation("virtual_path cannot be changed to /".into()));
	}
	if !is_single_segment_path(new_path) {
		return Err(AppError::InvalidOperation(format!(
			"virtual_path must be a single absolute segment, not {new_path:?}"
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn root_is_not_single_segment() {
		assert!(!is_single_segment_path("/"));
	}

	#[test]
	fn one_level_path_is_single_segment() {
		assert!(is_single_segment_path("/local"));
	}

	#[test]
	fn nested_path_is_rejected() {
		assert!(!is_single_segment_path("/local/sub"));
	}

	#[test]
	fn object_store_without_credentials_fails() {
		let fields = NewPolicyFields {
			policy_type: PolicyType::AwsS3,
			virtual_path: "/s3",
			server: None,
			bucket_name: Some("b"),
			access_key: Some("a"),
			secret_key: Some("s"),
		};
		assert!(validate_create(&fields).is_err());
	}

	#[test]
	fn local_policy_needs_no_credentials() {
		let fields = NewPolicyFields {
			policy_type: PolicyType::Local,
			virtual_path: "/local",
			server: None,
			bucket_name: None,
			access_key: None,
			secret_key: None,
		};
		assert!(validate_create(&fields).is_ok());
	}
}
