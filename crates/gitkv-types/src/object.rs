use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Width of a raw object ID in bytes (SHA-1 digest size).
pub const OID_RAWSZ: usize = 20;

/// Content-addressed identifier for any stored object.
///
/// An `ObjectId` is the SHA-1 digest of an object's git header and payload.
/// Identical content always produces the same `ObjectId`, which is why the
/// store can treat every key as immutable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; OID_RAWSZ]);

impl ObjectId {
    /// Create an `ObjectId` from a pre-computed digest.
    pub const fn from_hash(hash: [u8; OID_RAWSZ]) -> Self {
        Self(hash)
    }

    /// Create an `ObjectId` from a raw key slice, validating its width.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; OID_RAWSZ] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: OID_RAWSZ,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// The null object ID (all zeros). Represents "no object".
    pub const fn null() -> Self {
        Self([0u8; OID_RAWSZ])
    }

    /// Returns `true` if this is the null object ID.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; OID_RAWSZ]
    }

    /// The raw 20-byte digest.
    pub fn as_bytes(&self) -> &[u8; OID_RAWSZ] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a 40-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; OID_RAWSZ]> for ObjectId {
    fn from(bytes: [u8; OID_RAWSZ]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; OID_RAWSZ] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl AsRef<[u8]> for ObjectId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The kind of a stored object.
///
/// The discriminant is the tag byte written next to the payload on disk, and
/// matches git's numeric object type codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectType {
    Commit = 1,
    Tree = 2,
    Blob = 3,
    Tag = 4,
    /// Delta against a base at a pack offset. Internal; never stored loose.
    OfsDelta = 6,
    /// Delta against a base named by ID. Internal; never stored loose.
    RefDelta = 7,
}

impl ObjectType {
    /// All kinds that may be hashed and written as standalone objects.
    pub const LOOSE: [ObjectType; 4] = [Self::Commit, Self::Tree, Self::Blob, Self::Tag];

    /// The on-disk tag byte.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Decode a tag byte. Returns `None` for unassigned codes.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Commit),
            2 => Some(Self::Tree),
            3 => Some(Self::Blob),
            4 => Some(Self::Tag),
            6 => Some(Self::OfsDelta),
            7 => Some(Self::RefDelta),
            _ => None,
        }
    }

    /// Canonical name, as used in the git object header.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
            Self::OfsDelta => "OFS_DELTA",
            Self::RefDelta => "REF_DELTA",
        }
    }

    /// Parse a canonical name.
    pub fn from_name(name: &str) -> Result<Self, TypeError> {
        match name {
            "commit" => Ok(Self::Commit),
            "tree" => Ok(Self::Tree),
            "blob" => Ok(Self::Blob),
            "tag" => Ok(Self::Tag),
            "OFS_DELTA" => Ok(Self::OfsDelta),
            "REF_DELTA" => Ok(Self::RefDelta),
            other => Err(TypeError::UnknownObjectType(other.to_string())),
        }
    }

    /// Returns `true` for kinds that can exist as standalone objects.
    pub const fn is_loose(self) -> bool {
        matches!(self, Self::Commit | Self::Tree | Self::Blob | Self::Tag)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
