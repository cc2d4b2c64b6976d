//! `anzhiyu://<fs_type>@<fs_id>[:<password>]/<path>?<query>` virtual URIs.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnzhiyuUri {
	pub fs_type: String,
	pub fs_id: String,
	pub password: Option<String>,
	pub path: String,
	pub query: HashMap<String, String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UriError {
	#[error("uri must start with anzhiyu://")]
	MissingScheme,
	#[error("uri missing fs_id (anzhiyu://<fs_type>@<fs_id>/...)")]
	MissingAuthority,
}

const SCHEME: &str = "anzhiyu://";

impl AnzhiyuUri {
	pub fn parse(raw: &str) -> Result<Self, UriError> {
		let rest = raw.strip_prefix(SCHEME).ok_or(UriError::MissingScheme)?;

		let (authority_and_path, query_str) = match rest.split_once('?') {
			Some((a, q)) => (a, Some(q)),
			None => (rest, None),
		};

		let (authority, path_part) = match authority_and_path.split_once('/') {
			Some((a, p)) => (a, format!("/{p}")),
			None => (authority_and_path, "/".to_string()),
		};

		let (fs_type, id_and_pw) = authority.split_once('@').ok_or(UriError::MissingAuthority)?;
		if id_and_pw.is_empty() {
			return Err(UriError::MissingAuthority);
		}
		let (fs_id, password) = match id_and_pw.split_once(':') {
			Some((id, pw)) => (id.to_string(), Some(pw.to_string())),
			None => (id_and_pw.to_string(), None),
		};

		let query = query_str
			.map(parse_query)
			.unwrap_or_default();

		Ok(Self {
			fs_type: fs_type.to_string(),
			fs_id,
			password,
			path: crate::path::normalize(&path_part),
			query,
		})
	}

	pub fn build(fs_type: &str, fs_id: &str, path: &str) -> String {
		format!("{SCHEME}{fs_type}@{fs_id}{}", crate::path::normalize(path))
	}
}

fn parse_query(q: &str) -> HashMap<String, String> {
	q.split('&')
		.filter(|kv| !kv.is_empty())
		.map(|kv| match kv.split_once('=') {
			Some((k, v)) => (k.to_string(), v.to_string()),
			None => (kv.to_string(), String::new()),
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_minimal_uri() {
		let u = AnzhiyuUri::parse("anzhiyu://my@user123/docs/a.txt").unwrap();
		assert_eq!(u.fs_type, "my");
		assert_eq!(u.fs_id, "user123");
		assert_eq!(u.password, None);
		assert_eq!(u.path, "/docs/a.txt");
	}

	#[test]
	fn parses_password_and_query() {
		let u = AnzhiyuUri::parse("anzhiyu://my@user123:secret/docs?next_token=abc").unwrap();
		assert_eq!(u.password.as_deref(), Some("secret"));
		assert_eq!(u.query.get("next_token").unwrap(), "abc");
	}

	#[test]
	fn round_trips_through_build_and_parse() {
		let built = AnzhiyuUri::build("my", "user123", "/a/b");
		let parsed = AnzhiyuUri::parse(&built).unwrap();
		assert_eq!(parsed.fs_id, "user123");
		assert_eq!(parsed.path, "/a/b");
	}

	#[test]
	fn rejects_missing_scheme() {
		assert_eq!(AnzhiyuUri::parse("my@user123/a"), Err(UriError::MissingScheme));
	}
}
