//! Process-wide configuration.
//!
//! A load-or-create JSON file under a data directory, versioned for forward
//! migration, scoped to the settings this crate's components actually read:
//! where uploads stage, which extensions are accepted, and the HMAC secret
//! used for signed local download links.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

mod migration;
pub use migration::Migrate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
	pub version: u32,

	/// Root directory for on-disk state (local storage policies live under
	/// `data_dir/storage/<policy_name>`, chunk staging under `upload_temp_dir`).
	pub data_dir: PathBuf,

	/// Directory resumable-upload chunks are staged in before merge.
	pub upload_temp_dir: PathBuf,

	pub log_level: String,

	/// HMAC-SHA256 key for local signed-download URLs and signed content URLs.
	pub local_file_signing_secret: String,

	/// Extensions (without leading dot, lowercase) accepted by the upload
	/// engine's `create_session` validation.
	pub upload_allowed_extensions: Vec<String>,
}

impl AppConfig {
	pub fn load_or_create(data_dir: PathBuf) -> anyhow::Result<Self> {
		let config_path = data_dir.join("anheyu-vfs.json");
		if config_path.exists() {
			info!(path = %config_path.display(), "loading config");
			let json = fs::read_to_string(&config_path)?;
			let mut config: AppConfig = serde_json::from_str(&json)?;
			if config.version < Self::target_version() {
				info!(from = config.version, to = Self::target_version(), "migrating config");
				config.migrate()?;
				config.save()?;
			}
			Ok(config)
		} else {
			warn!(path = %config_path.display(), "no config found, creating default");
			let config = Self::default_with_dir(data_dir);
			config.save()?;
			Ok(config)
		}
	}

	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: Self::target_version(),
			upload_temp_dir: data_dir.join("temp").join("uploads"),
			data_dir,
			log_level: "info".into(),
			local_file_signing_secret: random_secret(),
			upload_allowed_extensions: default_allowed_extensions(),
		}
	}

	pub fn save(&self) -> anyhow::Result<()> {
		fs::create_dir_all(&self.data_dir)?;
		let config_path = self.data_dir.join("anheyu-vfs.json");
		fs::write(&config_path, serde_json::to_string_pretty(self)?)?;
		Ok(())
	}

	pub fn storage_root(&self) -> PathBuf {
		self.data_dir.join("storage")
	}

	pub fn ensure_directories(&self) -> anyhow::Result<()> {
		fs::create_dir_all(&self.data_dir)?;
		fs::create_dir_all(&self.upload_temp_dir)?;
		fs::create_dir_all(self.storage_root())?;
		Ok(())
	}

	pub fn is_extension_allowed(&self, ext: &str) -> bool {
		if self.upload_allowed_extensions.is_empty() {
			return true;
		}
		self.upload_allowed_extensions
			.iter()
			.any(|e| e.eq_ignore_ascii_case(ext))
	}
}

impl Migrate for AppConfig {
	fn current_version(&self) -> u32 {
		self.version
	}

	fn target_version() -> u32 {
		1
	}

	fn migrate(&mut self) -> anyhow::Result<()> {
		match self.version {
			0 => {
				self.version = 1;
				Ok(())
			}
			1 => Ok(()),
			v => Err(anyhow::anyhow!("unknown config version: {v}")),
		}
	}
}

fn random_secret() -> String {
	use rand::RngCore;
	let mut bytes = [0u8; 32];
	rand::thread_rng().fill_bytes(&mut bytes);
	hex::encode(bytes)
}

fn default_allowed_extensions() -> Vec<String> {
	Vec::new() // empty = unrestricted
}
