//! Foundation types for gitkv.
//!
//! Every other gitkv crate depends on `gitkv-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- 20-byte content-addressed identifier (SHA-1 digest)
//! - [`ObjectType`] -- object kind, stored on disk as a one-byte tag

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{ObjectId, ObjectType, OID_RAWSZ};
