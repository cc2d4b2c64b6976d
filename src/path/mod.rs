//! Path & URI model: a virtual path carries a notion of the addressable
//! mount it resolves against.

mod uri;
mod vpath;

pub use uri::AnzhiyuUri;
pub use vpath::{longest_mount_prefix, split_mount, Mountable};

/// Normalize a virtual path: must start with `/`; trailing `/` stripped
/// unless the path is exactly `/`.
pub fn normalize(path: &str) -> String {
	let mut p = if path.starts_with('/') {
		path.to_string()
	} else {
		format!("/{path}")
	};
	while p.len() > 1 && p.ends_with('/') {
		p.pop();
	}
	p
}

/// Strip `prefix` from `path` as whole path segments, then trim any leading
/// slash from the remainder. `prefix` must already be a segment-prefix of
/// `path` (checked by the caller, typically `longest_mount_prefix`).
pub fn strip_prefix(path: &str, prefix: &str) -> String {
	let rest = path.strip_prefix(prefix).unwrap_or(path);
	rest.trim_start_matches('/').to_string()
}

/// Join a backend-side base path with a relative path, trimming slashes so
/// the result never doubles up a leading `/` and never recomputes a prefix
/// that was already baked into a stored `source`.
pub fn join_object_key(base_path: &str, relative: &str) -> String {
	let base = base_path.trim_matches('/');
	let rel = relative.trim_start_matches('/');
	if base.is_empty() {
		rel.to_string()
	} else if rel.is_empty() {
		base.to_string()
	} else {
		format!("{base}/{rel}")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalize_strips_trailing_slash() {
		assert_eq!(normalize("/local/a/"), "/local/a");
		assert_eq!(normalize("/"), "/");
		assert_eq!(normalize("local/a"), "/local/a");
	}

	#[test]
	fn join_object_key_never_double_slashes() {
		assert_eq!(join_object_key("data/storage/local", "a/b.txt"), "data/storage/local/a/b.txt");
		assert_eq!(join_object_key("/prefix/", "/a.txt"), "prefix/a.txt");
		assert_eq!(join_object_key("", "a.txt"), "a.txt");
	}
}
