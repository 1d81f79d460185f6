use gitkv_types::{ObjectId, ObjectType, OID_RAWSZ};
use sha1::{Digest, Sha1};

/// Git-style loose-object hasher.
///
/// The digest covers `"<kind> <len>\0"` followed by the payload, so the same
/// bytes stored as a blob and as a tree produce different IDs.
pub struct ContentHasher;

impl ContentHasher {
    /// Build the loose-object header for a payload of `len` bytes.
    pub fn header(object_type: ObjectType, len: usize) -> String {
        format!("{} {}\0", object_type.name(), len)
    }

    /// Hash a payload as an object of the given kind.
    ///
    /// Only loose kinds have a header; delta kinds are rejected.
    pub fn hash(object_type: ObjectType, data: &[u8]) -> Result<ObjectId, HasherError> {
        if !object_type.is_loose() {
            return Err(HasherError::NotLoose(object_type));
        }
        let mut hasher = Sha1::new();
        hasher.update(Self::header(object_type, data.len()).as_bytes());
        hasher.update(data);
        Ok(ObjectId::from_hash(hasher.finalize().into()))
    }

    /// Verify that a payload hashes to the expected ID.
    pub fn verify(object_type: ObjectType, data: &[u8], expected: &ObjectId) -> bool {
        Self::hash(object_type, data).is_ok_and(|id| id == *expected)
    }

    /// Raw SHA-1 digest without the object header (for low-level use).
    pub fn raw_hash(data: &[u8]) -> [u8; OID_RAWSZ] {
        Sha1::digest(data).into()
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("object type {0} cannot be hashed as a standalone object")]
    NotLoose(ObjectType),
}
