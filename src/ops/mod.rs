//! Operation layer: copy, move, rename, recursive delete, signed content
//! links. Each request-level operation runs inside one transaction; the
//! functions here are the per-item primitives that transaction wraps.

pub mod copy;
pub mod delete;
pub mod mv;
pub mod signed_url;
