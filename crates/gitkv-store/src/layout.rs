//! On-disk value layout.
//!
//! Each value is the payload plus one type-tag byte. Which end the tag sits
//! on is fixed per backend variant and recorded in the environment's meta
//! table, so a file written by one variant is never misread by the other.
//!
//! ```text
//! TagPrefix: [1 byte: tag][N bytes: payload]   (transactional backend)
//! TagSuffix: [N bytes: payload][1 byte: tag]   (plain backend)
//! ```

use gitkv_types::ObjectType;

use crate::object::ObjectHeader;

/// Position of the type tag inside a stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueLayout {
    TagPrefix,
    TagSuffix,
}

/// A stored value that does not follow its layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("value is empty; expected at least a tag byte")]
    Empty,

    #[error("unknown type tag {0:#04x}")]
    UnknownTag(u8),
}

impl ValueLayout {
    /// Code persisted in the meta table.
    pub const fn code(self) -> u8 {
        match self {
            Self::TagPrefix => 1,
            Self::TagSuffix => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::TagPrefix),
            2 => Some(Self::TagSuffix),
            _ => None,
        }
    }

    /// Size of the stored value for a payload of `payload_len` bytes.
    pub const fn encoded_len(payload_len: usize) -> usize {
        payload_len + 1
    }

    /// Fill a reserved slot of exactly `encoded_len(payload.len())` bytes.
    ///
    /// Panics if the slot has the wrong size.
    pub fn encode_into(self, slot: &mut [u8], object_type: ObjectType, payload: &[u8]) {
        match self {
            Self::TagPrefix => {
                let (tag, body) = slot.split_at_mut(1);
                tag[0] = object_type.tag();
                body.copy_from_slice(payload);
            }
            Self::TagSuffix => {
                let (body, tag) = slot.split_at_mut(payload.len());
                body.copy_from_slice(payload);
                tag.copy_from_slice(&[object_type.tag()]);
            }
        }
    }

    /// Encode into a fresh buffer.
    pub fn encode(self, object_type: ObjectType, payload: &[u8]) -> Vec<u8> {
        let mut value = vec![0u8; Self::encoded_len(payload.len())];
        self.encode_into(&mut value, object_type, payload);
        value
    }

    /// Split a stored value into its kind and a borrowed payload.
    pub fn decode(self, value: &[u8]) -> Result<(ObjectType, &[u8]), LayoutError> {
        let (tag, payload) = match self {
            Self::TagPrefix => value.split_first().ok_or(LayoutError::Empty)?,
            Self::TagSuffix => value.split_last().ok_or(LayoutError::Empty)?,
        };
        let object_type = ObjectType::from_tag(*tag).ok_or(LayoutError::UnknownTag(*tag))?;
        Ok((object_type, payload))
    }

    /// Kind and payload length, without touching the payload bytes.
    pub fn decode_header(self, value: &[u8]) -> Result<ObjectHeader, LayoutError> {
        let tag = match self {
            Self::TagPrefix => value.first(),
            Self::TagSuffix => value.last(),
        }
        .ok_or(LayoutError::Empty)?;
        let object_type = ObjectType::from_tag(*tag).ok_or(LayoutError::UnknownTag(*tag))?;
        Ok(ObjectHeader {
            len: value.len() - 1,
            object_type,
        })
    }
}
