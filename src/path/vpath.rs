//! Splitting an absolute virtual path into `(mount_prefix, relative)` by
//! longest whole-segment prefix match against a set of mount points.

/// Anything that can be asked "what is your mount's virtual path". Kept
/// generic so this module doesn't depend on `policy::StoragePolicy`.
pub trait Mountable {
	fn virtual_path(&self) -> &str;
}

/// Returns true when `prefix` is a whole-segment prefix of `path`, i.e.
/// `path == prefix` or `path` continues with `/` right after `prefix`.
fn is_segment_prefix(path: &str, prefix: &str) -> bool {
	if prefix == "/" {
		return true;
	}
	path == prefix || path.starts_with(&format!("{prefix}/"))
}

/// Finds the mount whose `virtual_path` is the longest whole-segment prefix
/// of `path`, among `candidates`.
pub fn longest_mount_prefix<'a, T: Mountable>(path: &str, candidates: &'a [T]) -> Option<&'a T> {
	candidates
		.iter()
		.filter(|c| is_segment_prefix(path, c.virtual_path()))
		.max_by_key(|c| c.virtual_path().len())
}

/// Splits `path` into `(mount_prefix, relative)` given a known mount virtual
/// path. `relative` has its leading slash trimmed.
pub fn split_mount(path: &str, mount_virtual_path: &str) -> (String, String) {
	let relative = crate::path::strip_prefix(path, mount_virtual_path);
	(mount_virtual_path.to_string(), relative)
}

#[cfg(test)]
mod tests {
	use super::*;

	struct M(&'static str);
	impl Mountable for M {
		fn virtual_path(&self) -> &str {
			self.0
		}
	}

	#[test]
	fn picks_longest_whole_segment_match() {
		let mounts = [M("/local"), M("/local/nested"), M("/cos")];
		let found = longest_mount_prefix("/local/nested/a.txt", &mounts).unwrap();
		assert_eq!(found.virtual_path(), "/local/nested");
	}

	#[test]
	fn does_not_match_partial_segment() {
		// "/local" must not match "/localfoo"
		let mounts = [M("/local")];
		assert!(longest_mount_prefix("/localfoo/a", &mounts).is_none());
	}

	#[test]
	fn split_mount_trims_leading_slash() {
		let (mount, rel) = split_mount("/local/a/b.txt", "/local");
		assert_eq!(mount, "/local");
		assert_eq!(rel, "a/b.txt");
	}
}
