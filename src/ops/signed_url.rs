//! Signed content URL: `base64url(payload).base64url(HMAC-SHA256(secret,
//! payload))` where payload is `{"f": public_id, "e": expires_unix}`. Used
//! by preview endpoints that must not require a session cookie.

use crate::domain::file::FileType;
use crate::error::{AppError, Result};
use crate::infrastructure::database::repository::file_repo;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

#[derive(Debug, Serialize, Deserialize)]
struct Payload {
	f: String,
	e: i64,
}

/// Signed URLs for every previewable image sharing `file_id`'s parent
/// directory, in name order, plus `file_id`'s position among them — the
/// companion a gallery viewer calls once instead of resolving siblings one
/// signed request at a time.
#[derive(Debug, Serialize)]
pub struct SiblingGallery {
	pub signed_tokens: Vec<String>,
	pub initial_index: usize,
}

pub async fn sibling_gallery<C: ConnectionTrait>(
	txn: &C,
	secret: &str,
	owner_id: i64,
	file_id: i64,
	ttl_seconds: i64,
) -> Result<SiblingGallery> {
	let file = file_repo::find_by_id(txn, file_id)
		.await?
		.ok_or_else(|| AppError::NotFound(format!("file {file_id}")))?;
	if file.owner_id != owner_id {
		return Err(AppError::Forbidden(format!("file {file_id} not owned by {owner_id}")));
	}
	if file.file_type != 0 || !crate::file_type::is_previewable_image(&file.name) {
		return Err(AppError::InvalidOperation(format!("file {file_id} is not a previewable image")));
	}

	let mut siblings: Vec<_> = file_repo::find_by_parent_scoped(txn, file.parent_id, owner_id)
		.await?
		.into_iter()
		.filter(|f| f.file_type == 0 && crate::file_type::is_previewable_image(&f.name))
		.collect();
	siblings.sort_by(|a, b| a.name.cmp(&b.name));

	let initial_index = siblings
		.iter()
		.position(|f| f.id == file_id)
		.ok_or_else(|| AppError::NotFound(format!("file {file_id}")))?;

	let signed_tokens = siblings
		.iter()
		.map(|f| sign_content_url(secret, &crate::hashid::encode(FileType::File, f.id), ttl_seconds))
		.collect();

	Ok(SiblingGallery { signed_tokens, initial_index })
}

pub fn sign_content_url(secret: &str, public_id: &str, ttl_seconds: i64) -> String {
	let payload = Payload { f: public_id.to_string(), e: Utc::now().timestamp() + ttl_seconds };
	let payload_json = serde_json::to_vec(&payload).expect("Payload always serializes");
	let payload_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&payload_json);

	let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
	mac.update(payload_b64.as_bytes());
	let sig_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

	format!("{payload_b64}.{sig_b64}")
}

/// Returns the signed public id on success. Fails on a malformed token, a
/// signature mismatch, or an expired payload.
pub fn verify_content_url(secret: &str, token: &str) -> Option<String> {
	let (payload_b64, sig_b64) = token.split_once('.')?;

	let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
	mac.update(payload_b64.as_bytes());
	let expected_sig = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
	if !constant_time_eq(expected_sig.as_bytes(), sig_b64.as_bytes()) {
		return None;
	}

	let payload_json = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
	let payload: Payload = serde_json::from_slice(&payload_json).ok()?;
	if Utc::now().timestamp() >= payload.e {
		return None;
	}
	Some(payload.f)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	if a.len() != b.len() {
		return false;
	}
	let mut diff = 0u8;
	for (x, y) in a.iter().zip(b.iter()) {
		diff |= x ^ y;
	}
	diff == 0
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_a_valid_token() {
		let token = sign_content_url("secret", "abc123", 3600);
		assert_eq!(verify_content_url("secret", &token), Some("abc123".to_string()));
	}

	#[test]
	fn rejects_tampered_token() {
		let token = sign_content_url("secret", "abc123", 3600);
		let mut tampered = token.clone();
		tampered.push('x');
		assert_eq!(verify_content_url("secret", &tampered), None);
	}

	#[test]
	fn rejects_expired_token() {
		let token = sign_content_url("secret", "abc123", -10);
		assert_eq!(verify_content_url("secret", &token), None);
	}

	#[test]
	fn rejects_wrong_secret() {
		let token = sign_content_url("secret", "abc123", 3600);
		assert_eq!(verify_content_url("other", &token), None);
	}
}
