//! Abandoned-upload collection. A plain async function — this crate does
//! not embed a cron runtime; a caller wires this to whatever scheduler it
//! already has (a `tokio::time::interval` loop, a cron crate, ...).

use crate::domain::upload_session::UploadSession;
use crate::error::Result;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::database::repository::{entity_repo, TransactionManager};
use chrono::{Duration, Utc};
use std::path::Path;

/// Entities with `upload_session_id != NULL` and untouched past
/// `threshold_hours` are considered abandoned: their staging chunks and
/// cached session state are reclaimed, and the tentative entity row is
/// removed.
pub async fn collect_abandoned(
	txm: &TransactionManager,
	cache: &dyn Cache,
	upload_temp_dir: &Path,
	threshold_hours: i64,
) -> Result<usize> {
	let cutoff = Utc::now() - Duration::hours(threshold_hours);
	let tentative = entity_repo::find_tentative_older_than(txm.conn(), cutoff).await?;
	let mut collected = 0usize;
	for entity in tentative {
		if let Some(session_id) = entity.upload_session_id {
			let dir = upload_temp_dir.join(session_id.to_string());
			let _ = tokio::fs::remove_dir_all(&dir).await;
			cache.delete(&UploadSession::cache_key(session_id)).await;
		}
		entity_repo::hard_delete(txm.conn(), entity.id).await?;
		collected += 1;
	}
	Ok(collected)
}
