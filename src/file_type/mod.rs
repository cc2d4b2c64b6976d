//! Thumbnailable-extension allowlist used to decide whether a newly created
//! File is worth a `FileCreated` event publication.

const IMAGE: &[&str] = &["jpg", "jpeg", "png", "webp", "heic", "heif", "tiff", "tif", "gif", "bmp"];
const VIDEO: &[&str] = &["mp4", "mov", "webm", "mkv", "avi"];
const AUDIO: &[&str] = &["mp3", "flac", "ogg", "wav", "m4a"];
const DOCUMENT: &[&str] = &["pdf"];
const RAW: &[&str] = &["cr2", "nef", "arw", "dng", "raf", "orf", "rw2"];

pub fn is_thumbnailable(name: &str) -> bool {
	let Some(ext) = name.rsplit('.').next() else {
		return false;
	};
	if ext == name {
		return false;
	}
	let ext = ext.to_ascii_lowercase();
	[IMAGE, VIDEO, AUDIO, DOCUMENT, RAW].iter().any(|group| group.contains(&ext.as_str()))
}

/// Directly browser-displayable, as opposed to [`is_thumbnailable`]'s wider
/// net which also covers video/audio/document/raw previews.
pub fn is_previewable_image(name: &str) -> bool {
	let Some(ext) = name.rsplit('.').next() else {
		return false;
	};
	if ext == name {
		return false;
	}
	IMAGE.contains(&ext.to_ascii_lowercase().as_str())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn recognizes_each_group() {
		assert!(is_thumbnailable("photo.JPG"));
		assert!(is_thumbnailable("clip.mp4"));
		assert!(is_thumbnailable("song.flac"));
		assert!(is_thumbnailable("scan.pdf"));
		assert!(is_thumbnailable("raw.CR2"));
	}

	#[test]
	fn rejects_unknown_or_missing_extension() {
		assert!(!is_thumbnailable("archive.zip"));
		assert!(!is_thumbnailable("noextension"));
	}

	#[test]
	fn previewable_image_excludes_raw_and_video() {
		assert!(is_previewable_image("photo.PNG"));
		assert!(!is_previewable_image("raw.CR2"));
		assert!(!is_previewable_image("clip.mp4"));
	}
}
