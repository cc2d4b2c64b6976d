//! Versioned configuration migration.

pub trait Migrate {
	fn current_version(&self) -> u32;
	fn target_version() -> u32
	where
		Self: Sized;
	fn migrate(&mut self) -> anyhow::Result<()>;
}
