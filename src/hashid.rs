//! Reversible public-id encoding. Wraps a numeric row id and its entity
//! kind (`File` or `Dir`) into one opaque, non-sequential string so
//! anything handed to a client — a File's id, a policy's mount
//! directory id — doesn't leak row counts or require two id spaces.
//!
//! Not a security boundary: the mask below de-sequentializes ids, it does
//! not keep them secret. Access control still happens at the DB-id layer.

use crate::domain::file::FileType;
use base64::Engine;

const MASK: u64 = 0x5A5A_5A5A_5A5A_5A5A;

fn tag(kind: FileType) -> u8 {
	match kind {
		FileType::File => 0,
		FileType::Dir => 1,
	}
}

fn from_tag(tag: u8) -> Option<FileType> {
	match tag {
		0 => Some(FileType::File),
		1 => Some(FileType::Dir),
		_ => None,
	}
}

/// Encodes `id` as a public id tagged with `kind`.
pub fn encode(kind: FileType, id: i64) -> String {
	let scrambled = (id as u64) ^ MASK;
	let mut bytes = Vec::with_capacity(9);
	bytes.push(tag(kind));
	bytes.extend_from_slice(&scrambled.to_be_bytes());
	base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes a public id back into its entity kind and original row id.
/// Returns `None` for anything that isn't a well-formed id this scheme
/// produced — garbage input, truncation, or an unrecognized tag byte.
pub fn decode(public_id: &str) -> Option<(FileType, i64)> {
	let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(public_id).ok()?;
	let tag_byte = *bytes.first()?;
	let kind = from_tag(tag_byte)?;
	let id_bytes: [u8; 8] = bytes.get(1..9)?.try_into().ok()?;
	let scrambled = u64::from_be_bytes(id_bytes);
	Some((kind, (scrambled ^ MASK) as i64))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_file_id() {
		let public_id = encode(FileType::File, 42);
		assert_eq!(decode(&public_id), Some((FileType::File, 42)));
	}

	#[test]
	fn round_trips_dir_id_and_distinguishes_kind() {
		let file_id = encode(FileType::File, 7);
		let dir_id = encode(FileType::Dir, 7);
		assert_ne!(file_id, dir_id);
		assert_eq!(decode(&dir_id), Some((FileType::Dir, 7)));
	}

	#[test]
	fn rejects_garbage_input() {
		assert_eq!(decode("not valid base64!!"), None);
		assert_eq!(decode(""), None);
	}

	#[test]
	fn rejects_well_formed_but_too_short_input() {
		let truncated = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode([0u8; 3]);
		assert_eq!(decode(&truncated), None);
	}
}
