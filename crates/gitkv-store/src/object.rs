use gitkv_crypto::ContentHasher;
use gitkv_types::{ObjectId, ObjectType};

use crate::error::StoreResult;

/// An object as returned by a read: kind tag plus an owned copy of the payload.
///
/// The store never interprets the payload; it is opaque bytes keyed by content
/// hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawObject {
    /// The type of this object.
    pub object_type: ObjectType,
    /// The payload, excluding the tag byte.
    pub data: Vec<u8>,
}

impl RawObject {
    /// Create a new raw object from kind and data.
    pub fn new(object_type: ObjectType, data: Vec<u8>) -> Self {
        Self { object_type, data }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size and kind, without the payload.
    pub fn header(&self) -> ObjectHeader {
        ObjectHeader {
            len: self.data.len(),
            object_type: self.object_type,
        }
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> StoreResult<ObjectId> {
        Ok(ContentHasher::hash(self.object_type, &self.data)?)
    }
}

/// Size and kind of a stored object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Payload length in bytes (tag excluded).
    pub len: usize,
    /// The type of the object.
    pub object_type: ObjectType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn header_reports_payload_len() {
        let obj = RawObject::new(ObjectType::Blob, b"hello".to_vec());
        assert_eq!(
            obj.header(),
            ObjectHeader {
                len: 5,
                object_type: ObjectType::Blob
            }
        );
        assert_eq!(obj.len(), 5);
        assert!(!obj.is_empty());
    }

    #[test]
    fn compute_id_matches_hasher() {
        let obj = RawObject::new(ObjectType::Blob, b"hello".to_vec());
        assert_eq!(
            obj.compute_id().unwrap().to_hex(),
            "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0"
        );
    }

    #[test]
    fn compute_id_rejects_delta_kinds() {
        let obj = RawObject::new(ObjectType::RefDelta, vec![1, 2, 3]);
        assert!(matches!(
            obj.compute_id(),
            Err(StoreError::InvalidObjectType(ObjectType::RefDelta))
        ));
    }
}
