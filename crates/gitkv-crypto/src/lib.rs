//! Content hashing for gitkv.
//!
//! Object IDs are git-compatible: the SHA-1 digest of the loose-object header
//! (`"<kind> <len>\0"`) followed by the payload. Objects written through gitkv
//! therefore carry the same IDs git itself would assign.
//!
//! Hashing uses the `sha1` crate; there is no custom cryptography.

pub mod hasher;

pub use hasher::{ContentHasher, HasherError};
